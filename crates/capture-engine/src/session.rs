//! Recording state machine.
//!
//! `RecordingController` binds an encoder sink to the composed stream on
//! start, accumulates the sink's data segments while recording, and hands
//! the finished segment list to the exporter on stop.
//!
//! Sinks report segments over a channel the controller owns; the owner
//! calls [`RecordingController::absorb_segments`] from its event loop.
//! Every segment carries the id of the recording it belongs to, so a late
//! delivery from an earlier sink never reaches a later buffer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use convulse_common::clock::RecordingClock;
use convulse_common::config::RecordingDefaults;
use convulse_common::error::ConvulseError;
use convulse_platform_core::{
    ComposedStream, EncoderFactory, EncoderSink, Segment, SegmentSender,
};
use tokio::sync::mpsc;

/// State of the recording controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No sink bound.
    Idle,
    /// A sink is bound and emitting segments.
    Recording,
}

/// Parameters the controller hands to each new sink.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Requested container/codec.
    pub mime_type: String,

    /// Interval between segment notifications.
    pub timeslice: Duration,
}

impl From<&RecordingDefaults> for RecorderConfig {
    fn from(defaults: &RecordingDefaults) -> Self {
        Self {
            mime_type: defaults.mime_type.clone(),
            timeslice: Duration::from_millis(defaults.timeslice_ms.max(1)),
        }
    }
}

/// A stopped recording, ready for export.
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    /// Identifier of the recording the segments belong to.
    pub id: u64,

    /// Container/codec the sink actually produced.
    pub mime_type: String,

    /// Segments in arrival order.
    pub segments: Vec<Vec<u8>>,

    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,

    /// Recording length in seconds.
    pub duration_secs: f64,
}

impl FinishedRecording {
    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Result of a toggle.
#[derive(Debug)]
pub enum ToggleOutcome {
    /// A new recording began.
    Started { recording_id: u64 },
    /// The active recording ended.
    Stopped(FinishedRecording),
    /// The sink could not be bound; the controller stayed idle.
    StartFailed(ConvulseError),
}

struct ActiveRecording {
    id: u64,
    sink: Box<dyn EncoderSink>,
    clock: RecordingClock,
}

/// Two-state recorder over an injected encoder factory.
pub struct RecordingController {
    config: RecorderConfig,
    factory: Arc<dyn EncoderFactory>,
    segments_tx: mpsc::UnboundedSender<Segment>,
    segments_rx: mpsc::UnboundedReceiver<Segment>,
    active: Option<ActiveRecording>,
    segments: Vec<Vec<u8>>,
    last_id: u64,
}

impl RecordingController {
    /// Create an idle controller.
    pub fn new(config: RecorderConfig, factory: Arc<dyn EncoderFactory>) -> Self {
        let (segments_tx, segments_rx) = mpsc::unbounded_channel();
        Self {
            config,
            factory,
            segments_tx,
            segments_rx,
            active: None,
            segments: Vec::new(),
            last_id: 0,
        }
    }

    pub fn state(&self) -> RecordingState {
        if self.active.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Identifier of the active recording.
    pub fn recording_id(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Segments gathered so far in the active recording.
    pub fn buffered_segments(&self) -> usize {
        self.segments.len()
    }

    /// Seconds since the active recording started.
    pub fn elapsed_secs(&self) -> f64 {
        self.active
            .as_ref()
            .map(|a| a.clock.elapsed_secs())
            .unwrap_or(0.0)
    }

    /// Start when idle, stop when recording.
    pub fn toggle(&mut self, stream: &ComposedStream) -> ToggleOutcome {
        match self.stop() {
            Some(finished) => ToggleOutcome::Stopped(finished),
            None => self.start(stream),
        }
    }

    fn start(&mut self, stream: &ComposedStream) -> ToggleOutcome {
        self.segments.clear();

        let mut sink = match self.factory.create(stream, &self.config.mime_type) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(error = %e, mime = %self.config.mime_type, "Failed to create encoder sink");
                return ToggleOutcome::StartFailed(e);
            }
        };

        let id = self.last_id + 1;
        let sender = SegmentSender::new(id, self.segments_tx.clone());
        if let Err(e) = sink.start(self.config.timeslice, sender) {
            tracing::error!(error = %e, "Failed to start encoder sink");
            return ToggleOutcome::StartFailed(e);
        }
        self.last_id = id;

        let clock = RecordingClock::start();
        tracing::info!(
            recording_id = id,
            mime = %sink.mime_type(),
            timeslice_ms = self.config.timeslice.as_millis() as u64,
            epoch_wall = %clock.epoch_wall(),
            "Recording started"
        );

        self.active = Some(ActiveRecording { id, sink, clock });
        ToggleOutcome::Started { recording_id: id }
    }

    /// Stop the active recording, if any.
    ///
    /// Segments the sink reported before stopping are absorbed first and
    /// its final flush is appended last, so the returned recording is
    /// complete and immutable.
    pub fn stop(&mut self) -> Option<FinishedRecording> {
        let flushed = self.active.as_mut()?.sink.stop();
        self.absorb_segments();
        let active = self.active.take()?;

        match flushed {
            Ok(Some(last)) if !last.is_empty() => self.segments.push(last),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    recording_id = active.id,
                    error = %e,
                    "Encoder sink failed to flush; keeping segments gathered so far"
                );
            }
        }

        let finished = FinishedRecording {
            id: active.id,
            mime_type: active.sink.mime_type().to_string(),
            segments: std::mem::take(&mut self.segments),
            started_at: active.clock.epoch_wall(),
            duration_secs: active.clock.elapsed_secs(),
        };

        tracing::info!(
            recording_id = finished.id,
            segments = finished.segments.len(),
            bytes = finished.total_bytes(),
            duration_secs = finished.duration_secs,
            "Recording stopped"
        );

        Some(finished)
    }

    /// Apply every segment the sinks have reported so far.
    /// Returns how many were kept.
    pub fn absorb_segments(&mut self) -> usize {
        let mut kept = 0;
        while let Ok(segment) = self.segments_rx.try_recv() {
            if self.on_segment(segment) {
                kept += 1;
            }
        }
        kept
    }

    /// Accept a segment from a sink.
    ///
    /// Empty payloads, segments arriving while idle, and segments from an
    /// earlier recording are dropped. Returns whether the segment was kept.
    pub fn on_segment(&mut self, segment: Segment) -> bool {
        if segment.payload.is_empty() {
            return false;
        }
        match self.recording_id() {
            Some(id) if id == segment.recording_id => {
                self.segments.push(segment.payload);
                true
            }
            _ => {
                tracing::debug!(
                    recording_id = segment.recording_id,
                    bytes = segment.payload.len(),
                    "Discarding segment outside its recording"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for RecordingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingController")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("recording_id", &self.recording_id())
            .field("segments", &self.segments.len())
            .finish_non_exhaustive()
    }
}
