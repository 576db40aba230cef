//! Display-refresh frame scheduling.
//!
//! The compositor re-arms itself after every invocation: `request_frame`
//! arms the next tick, `next_frame` waits for it. Once `shutdown` is called
//! no further frame ever fires.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Cooperative frame scheduler driven from the event loop.
#[derive(Debug)]
pub struct FrameScheduler {
    interval: Interval,
    armed: bool,
    stopped: bool,
}

impl FrameScheduler {
    /// Scheduler ticking at `refresh_hz` (at least 1 Hz).
    pub fn new(refresh_hz: u32) -> Self {
        let period = Duration::from_nanos(1_000_000_000 / refresh_hz.max(1) as u64);
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        // A slow frame delays the next one instead of bursting to catch up.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            armed: false,
            stopped: false,
        }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Arm the next frame. Has no effect after shutdown.
    pub fn request_frame(&mut self) {
        if !self.stopped {
            self.armed = true;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Wait for the armed frame and disarm.
    ///
    /// Pending forever when nothing is armed; guard the select branch with
    /// [`Self::is_armed`].
    pub async fn next_frame(&mut self) {
        if !self.armed {
            std::future::pending::<()>().await;
        }
        self.interval.tick().await;
        self.armed = false;
    }

    /// Cancel any armed frame and refuse new ones.
    pub fn shutdown(&mut self) {
        self.armed = false;
        self.stopped = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_armed_frame_fires_after_one_period() {
        let start = Instant::now();
        let mut scheduler = FrameScheduler::new(50);
        assert_eq!(scheduler.period(), Duration::from_millis(20));

        scheduler.request_frame();
        scheduler.next_frame().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(!scheduler.is_armed());
    }

    #[tokio::test]
    async fn test_unarmed_scheduler_never_fires() {
        let mut scheduler = FrameScheduler::new(100);
        let fired = tokio::time::timeout(Duration::from_millis(50), scheduler.next_frame()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_frames() {
        let mut scheduler = FrameScheduler::new(60);
        scheduler.request_frame();
        scheduler.shutdown();
        assert!(!scheduler.is_armed());
        scheduler.request_frame();
        assert!(!scheduler.is_armed());
        assert!(scheduler.is_shut_down());
    }
}
