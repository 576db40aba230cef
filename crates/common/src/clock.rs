//! Clock and timing utilities.
//!
//! - `RecordingClock` anchors a recording to the moment it started
//! - `RateController` throttles a fast loop down to a target rate

use std::time::Instant;

use chrono::{DateTime, Utc};

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment recording started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Utc>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    /// Get nanoseconds elapsed since recording start.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> DateTime<Utc> {
        self.epoch_wall
    }
}

/// Frame rate controller.
///
/// The compositor runs at display refresh; the composed stream only
/// needs a new frame at the capture rate. Ticks follow a fixed schedule
/// and fire up to half an interval early, so a caller polling at an
/// integer multiple of the target rate (60 Hz for 30 fps) hits every
/// slot despite nanosecond rounding.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    next_due_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            next_due_ns: None,
        }
    }

    /// Check if the next scheduled tick is due.
    /// Returns true and advances the schedule if so.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        let interval = self.target_interval_ns;
        match self.next_due_ns {
            None => {
                self.next_due_ns = Some(current_ns + interval);
                true
            }
            Some(due) if current_ns + interval / 2 >= due => {
                let next = due + interval;
                // Fell more than a whole interval behind: re-anchor instead
                // of bursting to catch up.
                self.next_due_ns = Some(if current_ns >= next {
                    current_ns + interval
                } else {
                    next
                });
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}
