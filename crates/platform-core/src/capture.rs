//! Capture device capability and the streams it yields.

use std::any::Any;
use std::sync::Arc;

use convulse_common::error::ConvulseResult;
use convulse_scene_model::SourceKind;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::frame::VideoFrame;

/// Latest decoded frame of a live stream; `None` until the first frame arrives.
pub type FrameReceiver = watch::Receiver<Option<Arc<VideoFrame>>>;

/// Publishing half of a [`FrameReceiver`].
pub type FrameSender = watch::Sender<Option<Arc<VideoFrame>>>;

/// An audio track delivered alongside a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Human-readable track label.
    pub label: String,

    /// Platform device identifier; the default input when unset.
    pub device: Option<String>,
}

/// A live capture handed back by a [`CaptureDevice`].
///
/// Dropping the stream releases the underlying device.
pub struct CaptureStream {
    kind: SourceKind,
    frames: FrameReceiver,
    audio_tracks: Vec<AudioTrack>,
    _keepalive: Option<Box<dyn Any + Send>>,
}

impl CaptureStream {
    pub fn new(kind: SourceKind, frames: FrameReceiver) -> Self {
        Self {
            kind,
            frames,
            audio_tracks: Vec::new(),
            _keepalive: None,
        }
    }

    /// Attach audio tracks captured together with the video.
    pub fn with_audio_tracks(mut self, tracks: Vec<AudioTrack>) -> Self {
        self.audio_tracks = tracks;
        self
    }

    /// Keep a resource (pipeline, portal session) alive as long as the stream.
    pub fn with_keepalive(mut self, resource: impl Any + Send) -> Self {
        self._keepalive = Some(Box::new(resource));
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    /// Most recent frame, marking it as seen.
    pub fn latest_frame(&mut self) -> Option<Arc<VideoFrame>> {
        self.frames.borrow_and_update().clone()
    }
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream")
            .field("kind", &self.kind)
            .field("audio_tracks", &self.audio_tracks)
            .finish_non_exhaustive()
    }
}

/// Video/audio capture capability.
///
/// A failure carries no retryable detail: callers treat it as permanent
/// for the session.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request a capture for `kind`, optionally with audio.
    async fn request(&self, kind: SourceKind, wants_audio: bool) -> ConvulseResult<CaptureStream>;
}
