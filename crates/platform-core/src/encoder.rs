//! Encoder sink capability.

use std::time::Duration;

use convulse_common::error::ConvulseResult;
use tokio::sync::mpsc;

use crate::composed::ComposedStream;

/// One chunk of encoded output, tagged with the recording it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub recording_id: u64,
    pub payload: Vec<u8>,
}

/// Delivers a sink's periodic data notifications to the composer.
#[derive(Debug, Clone)]
pub struct SegmentSender {
    recording_id: u64,
    tx: mpsc::UnboundedSender<Segment>,
}

impl SegmentSender {
    pub fn new(recording_id: u64, tx: mpsc::UnboundedSender<Segment>) -> Self {
        Self { recording_id, tx }
    }

    pub fn recording_id(&self) -> u64 {
        self.recording_id
    }

    /// Emit a data notification. Returns `false` once the receiver is gone.
    pub fn send(&self, payload: Vec<u8>) -> bool {
        self.tx
            .send(Segment {
                recording_id: self.recording_id,
                payload,
            })
            .is_ok()
    }
}

/// An encoder bound to the composed stream.
pub trait EncoderSink: Send {
    /// Negotiated container/codec identifier (e.g. `video/webm`).
    fn mime_type(&self) -> &str;

    /// Begin encoding; buffered output is emitted through `segments`
    /// every `timeslice`.
    fn start(&mut self, timeslice: Duration, segments: SegmentSender) -> ConvulseResult<()>;

    /// Stop encoding and flush. Returns the final pending data, if any.
    /// The sink emits nothing afterwards.
    fn stop(&mut self) -> ConvulseResult<Option<Vec<u8>>>;
}

/// Constructs encoder sinks over the composed stream.
pub trait EncoderFactory: Send + Sync {
    fn create(&self, stream: &ComposedStream, mime_type: &str)
        -> ConvulseResult<Box<dyn EncoderSink>>;
}
