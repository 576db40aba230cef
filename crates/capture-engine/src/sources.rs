//! Capture source management.
//!
//! Each of the two visual sources starts `Pending`, and becomes `Live` or
//! `Unavailable` exactly once when its acquisition completes. Completions
//! are applied on the event-loop context through
//! [`CaptureSourceManager::on_acquired`]; nothing else mutates the sources.

use std::sync::Arc;

use convulse_common::error::ConvulseResult;
use convulse_platform_core::{AudioTrack, CaptureDevice, CaptureStream, Notice, Notifier, VideoFrame};
use convulse_scene_model::SourceKind;

/// Notice shown when the first source goes live.
pub const SOURCES_LIVE_TEXT: &str = "Sources live";

/// Acquisition state of one source.
#[derive(Debug)]
pub enum SourceState {
    /// Acquisition requested, no answer yet.
    Pending,
    /// Stream granted and attached.
    Live(CaptureStream),
    /// Acquisition failed; the source is never drawn.
    Unavailable,
}

/// One visual source and the most recent frame it delivered.
#[derive(Debug)]
pub struct VideoSource {
    kind: SourceKind,
    state: SourceState,
    frame: Option<Arc<VideoFrame>>,
}

impl VideoSource {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            state: SourceState::Pending,
            frame: None,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn state(&self) -> &SourceState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SourceState::Pending)
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, SourceState::Live(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.state, SourceState::Unavailable)
    }

    /// Pull the newest frame out of the attached stream, if one arrived.
    pub fn refresh(&mut self) {
        if let SourceState::Live(stream) = &mut self.state {
            if let Some(frame) = stream.latest_frame() {
                self.frame = Some(frame);
            }
        }
    }

    /// Intrinsic dimensions of the last frame, `(0, 0)` before the first one.
    pub fn dimensions(&self) -> (u32, u32) {
        self.frame
            .as_ref()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0))
    }

    /// The current frame, only once it has non-zero width and height.
    pub fn decoded_frame(&self) -> Option<&VideoFrame> {
        self.frame.as_deref().filter(|f| f.is_decoded())
    }

    fn teardown(&mut self) {
        if let SourceState::Live(_) = self.state {
            tracing::debug!(kind = %self.kind, "Releasing capture stream");
        }
        if !self.is_unavailable() {
            self.state = SourceState::Pending;
        }
        self.frame = None;
    }
}

/// What an acquisition completion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// The source went live. `first_live` is set for the first source of
    /// the session only; `audio_tracks` lists what the stream carried.
    Live {
        first_live: bool,
        audio_tracks: Vec<AudioTrack>,
    },
    /// The source is unavailable for the rest of the session.
    Failed,
    /// The completion arrived for a source that was already settled.
    Ignored,
}

/// Owns both visual sources.
#[derive(Debug)]
pub struct CaptureSourceManager {
    webcam: VideoSource,
    desktop: VideoSource,
    audio_tracks: Vec<AudioTrack>,
    any_live: bool,
    torn_down: bool,
}

impl Default for CaptureSourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSourceManager {
    pub fn new() -> Self {
        Self {
            webcam: VideoSource::new(SourceKind::Webcam),
            desktop: VideoSource::new(SourceKind::Desktop),
            audio_tracks: Vec::new(),
            any_live: false,
            torn_down: false,
        }
    }

    pub fn source(&self, kind: SourceKind) -> &VideoSource {
        match kind {
            SourceKind::Webcam => &self.webcam,
            SourceKind::Desktop => &self.desktop,
        }
    }

    fn source_mut(&mut self, kind: SourceKind) -> &mut VideoSource {
        match kind {
            SourceKind::Webcam => &mut self.webcam,
            SourceKind::Desktop => &mut self.desktop,
        }
    }

    /// Refresh both sources' current frame.
    pub fn refresh_frames(&mut self) {
        self.webcam.refresh();
        self.desktop.refresh();
    }

    /// Audio tracks harvested from live captures.
    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    /// Apply the result of an acquisition.
    ///
    /// A failure marks the source unavailable and surfaces a notice; it is
    /// never propagated. The other source is unaffected either way.
    pub fn on_acquired(
        &mut self,
        kind: SourceKind,
        result: ConvulseResult<CaptureStream>,
        notifier: &dyn Notifier,
    ) -> AcquisitionOutcome {
        if self.torn_down {
            tracing::debug!(%kind, "Acquisition completed after teardown, dropping it");
            return AcquisitionOutcome::Ignored;
        }
        if !self.source(kind).is_pending() {
            tracing::warn!(%kind, "Source already settled, ignoring second acquisition");
            return AcquisitionOutcome::Ignored;
        }

        match result {
            Ok(stream) => {
                let audio_tracks = stream.audio_tracks().to_vec();
                tracing::info!(%kind, audio_tracks = audio_tracks.len(), "Capture source live");

                for track in &audio_tracks {
                    if !self.audio_tracks.contains(track) {
                        self.audio_tracks.push(track.clone());
                    }
                }

                let source = self.source_mut(kind);
                source.state = SourceState::Live(stream);
                source.refresh();

                let first_live = !self.any_live;
                self.any_live = true;
                if first_live {
                    notifier.notify(Notice::info(SOURCES_LIVE_TEXT));
                }

                AcquisitionOutcome::Live {
                    first_live,
                    audio_tracks,
                }
            }
            Err(e) => {
                tracing::warn!(%kind, error = %e, "Capture source unavailable");
                self.source_mut(kind).state = SourceState::Unavailable;
                notifier.notify(Notice::warning(failure_text(kind)));
                AcquisitionOutcome::Failed
            }
        }
    }

    /// Release every stream. Later completions are dropped.
    pub fn teardown(&mut self) {
        self.webcam.teardown();
        self.desktop.teardown();
        self.torn_down = true;
    }
}

/// User-facing text for a failed acquisition.
pub fn failure_text(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Webcam => "Couldn't open camera!",
        SourceKind::Desktop => "Couldn't open screen grabber!",
    }
}

/// Ask the capture device for one source.
pub async fn acquire(
    device: Arc<dyn CaptureDevice>,
    kind: SourceKind,
    wants_audio: bool,
) -> ConvulseResult<CaptureStream> {
    tracing::debug!(%kind, wants_audio, "Requesting capture");
    device.request(kind, wants_audio).await
}
