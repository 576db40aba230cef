//! The composer session and its event loop.
//!
//! One `Composer` owns every piece of mutable state: the capture sources,
//! the layout settings, the canvas, the composed stream and the recording
//! controller. All of it is touched from a single cooperative loop; the
//! capture device and the encoder sinks only ever hand results back over
//! channels.

use std::sync::Arc;

use chrono::Utc;
use convulse_capture_engine::{
    acquire, AcquisitionOutcome, CaptureSourceManager, FinishedRecording, RecorderConfig,
    RecordingController, RecordingState, ToggleOutcome,
};
use convulse_common::clock::{RateController, RecordingClock};
use convulse_common::config::AppConfig;
use convulse_common::error::ConvulseResult;
use convulse_platform_core::{
    CaptureDevice, CaptureStream, ComposedStream, EncoderFactory, Notice, Notifier,
    PreferenceStore, SaveTrigger, Segment,
};
use convulse_render_engine::{
    Canvas, Compositor, Exporter, FrameComposition, FrameScheduler, SavedArtifact,
};
use convulse_scene_model::{LayoutSettings, SourceKind};
use tokio::sync::mpsc;

use crate::preferences::{load_layout, persist_position, persist_size};

pub const START_HINT_TEXT: &str = "Press Enter to start and stop recording";
pub const RECORDING_TEXT: &str = "Recording: press Enter to stop";
pub const STOPPED_TEXT: &str = "Stopped";
pub const START_FAILED_TEXT: &str = "Couldn't start recording";
pub const SAVE_FAILED_TEXT: &str = "Couldn't save recording";

/// External collaborators the composer is built over.
#[derive(Clone)]
pub struct Capabilities {
    pub device: Arc<dyn CaptureDevice>,
    pub encoder: Arc<dyn EncoderFactory>,
    pub save: Arc<dyn SaveTrigger>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// User input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start or stop recording.
    ToggleRecording,
    /// Move a source to the next anchor.
    CyclePosition(SourceKind),
    /// Set a source's height fraction.
    SetSize(SourceKind, f64),
    /// Stop everything and return.
    Shutdown,
}

/// A completed capture request.
#[derive(Debug)]
pub struct Acquisition {
    pub kind: SourceKind,
    pub result: ConvulseResult<CaptureStream>,
}

/// What a session produced.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub frames_rendered: u64,
    pub exports: Vec<SavedArtifact>,
    pub failed_exports: usize,
}

/// Live compositor + recorder session.
pub struct Composer {
    config: AppConfig,
    caps: Capabilities,
    enabled: Vec<SourceKind>,
    settings: LayoutSettings,
    sources: CaptureSourceManager,
    compositor: Compositor,
    canvas: Canvas,
    stream: ComposedStream,
    clock: RecordingClock,
    publish_rate: RateController,
    recorder: RecordingController,
    exporter: Exporter,
    summary: SessionSummary,
}

impl Composer {
    pub fn new(config: AppConfig, caps: Capabilities) -> Self {
        let settings = load_layout(caps.preferences.as_ref());
        let canvas_cfg = &config.canvas;
        let canvas = Canvas::new(canvas_cfg.width, canvas_cfg.height);
        let stream = ComposedStream::new(canvas_cfg.width, canvas_cfg.height, canvas_cfg.capture_fps);
        let publish_rate = RateController::new(canvas_cfg.capture_fps);
        let recorder =
            RecordingController::new(RecorderConfig::from(&config.recording), caps.encoder.clone());
        let exporter = Exporter::new(config.recording.file_prefix.clone(), caps.save.clone());

        tracing::info!(
            width = canvas_cfg.width,
            height = canvas_cfg.height,
            refresh_hz = canvas_cfg.refresh_hz,
            capture_fps = canvas_cfg.capture_fps,
            "Composer created"
        );

        Self {
            config,
            caps,
            enabled: SourceKind::DRAW_ORDER.to_vec(),
            settings,
            sources: CaptureSourceManager::new(),
            compositor: Compositor::new(),
            canvas,
            stream,
            clock: RecordingClock::start(),
            publish_rate,
            recorder,
            exporter,
            summary: SessionSummary::default(),
        }
    }

    /// Restrict which sources are requested at startup.
    pub fn with_sources(mut self, kinds: &[SourceKind]) -> Self {
        self.enabled = kinds.to_vec();
        self
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn sources(&self) -> &CaptureSourceManager {
        &self.sources
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn composed_stream(&self) -> &ComposedStream {
        &self.stream
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Request every enabled source concurrently. Completions arrive on the
    /// returned channel, in whatever order the device answers.
    pub fn spawn_acquisitions(&self) -> mpsc::UnboundedReceiver<Acquisition> {
        let (tx, rx) = mpsc::unbounded_channel();
        for &kind in &self.enabled {
            let device = self.caps.device.clone();
            let wants_audio = kind.wants_audio() && self.config.capture.webcam_audio;
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = acquire(device, kind, wants_audio).await;
                // The loop may already be gone; the stream is dropped with it.
                let _ = tx.send(Acquisition { kind, result });
            });
        }
        rx
    }

    /// Apply a completed acquisition.
    pub fn on_acquired(&mut self, acquisition: Acquisition) {
        let Acquisition { kind, result } = acquisition;
        let outcome = self
            .sources
            .on_acquired(kind, result, self.caps.notifier.as_ref());
        if let AcquisitionOutcome::Live { audio_tracks, .. } = outcome {
            for track in audio_tracks {
                self.stream.add_audio_track(track);
            }
        }
    }

    /// Accept one encoder segment directly.
    pub fn on_segment(&mut self, segment: Segment) -> bool {
        self.recorder.on_segment(segment)
    }

    /// One compositor invocation.
    pub fn step(&mut self) -> FrameComposition {
        self.recorder.absorb_segments();
        self.sources.refresh_frames();

        let composition = self
            .compositor
            .render(&mut self.canvas, &self.sources, &self.settings);
        self.summary.frames_rendered = self.compositor.frames_rendered();

        if self.publish_rate.should_tick(self.clock.elapsed_ns()) {
            self.stream.publish(self.canvas.snapshot());
        }
        composition
    }

    /// Apply a command. Returns `false` once the session should end.
    pub fn handle_command(&mut self, command: Command) -> bool {
        tracing::debug!(?command, "Command");
        match command {
            Command::ToggleRecording => {
                self.toggle_recording();
            }
            Command::CyclePosition(kind) => {
                let position = self.settings.cycle_position(kind);
                tracing::info!(%kind, %position, "Source moved");
                self.persist(persist_position(self.caps.preferences.as_ref(), kind, position));
            }
            Command::SetSize(kind, value) => match self.settings.set_size(kind, value) {
                Some(size) => {
                    tracing::info!(%kind, %size, "Source resized");
                    self.persist(persist_size(self.caps.preferences.as_ref(), kind, size));
                }
                None => tracing::warn!(%kind, value, "Ignoring non-finite size"),
            },
            Command::Shutdown => return false,
        }
        true
    }

    /// Start or stop recording. A stop exports immediately.
    pub fn toggle_recording(&mut self) -> Option<SavedArtifact> {
        match self.recorder.toggle(&self.stream) {
            ToggleOutcome::Started { .. } => {
                self.caps.notifier.recording_changed(true);
                self.caps.notifier.notify(Notice::info(RECORDING_TEXT));
                None
            }
            ToggleOutcome::StartFailed(e) => {
                tracing::error!(error = %e, "Recording did not start");
                self.caps.notifier.notify(Notice::warning(START_FAILED_TEXT));
                None
            }
            ToggleOutcome::Stopped(finished) => self.finish(finished),
        }
    }

    /// Run until `Shutdown` or until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) -> SessionSummary {
        let mut acquisitions = self.spawn_acquisitions();
        let mut scheduler = FrameScheduler::new(self.config.canvas.refresh_hz);
        self.caps.notifier.notify(Notice::info(START_HINT_TEXT));
        scheduler.request_frame();

        loop {
            tokio::select! {
                _ = scheduler.next_frame(), if scheduler.is_armed() => {
                    self.step();
                    scheduler.request_frame();
                }
                Some(acquisition) = acquisitions.recv() => self.on_acquired(acquisition),
                command = commands.recv() => {
                    let command = command.unwrap_or(Command::Shutdown);
                    if !self.handle_command(command) {
                        break;
                    }
                }
            }
        }

        scheduler.shutdown();
        self.shutdown()
    }

    /// Stop and export an active recording, then release the sources.
    pub fn shutdown(&mut self) -> SessionSummary {
        if self.recorder.is_recording() {
            tracing::info!("Stopping active recording before shutdown");
            if let Some(finished) = self.recorder.stop() {
                self.finish(finished);
            }
        }
        self.sources.teardown();
        tracing::info!(
            frames = self.summary.frames_rendered,
            exports = self.summary.exports.len(),
            failed_exports = self.summary.failed_exports,
            "Composer shut down"
        );
        self.summary.clone()
    }

    fn finish(&mut self, finished: FinishedRecording) -> Option<SavedArtifact> {
        self.caps.notifier.recording_changed(false);
        self.caps.notifier.notify(Notice::info(STOPPED_TEXT));

        match self.exporter.export(finished, Utc::now()) {
            Ok(saved) => {
                self.summary.exports.push(saved.clone());
                Some(saved)
            }
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                self.summary.failed_exports += 1;
                self.caps.notifier.notify(Notice::warning(SAVE_FAILED_TEXT));
                None
            }
        }
    }

    fn persist(&self, result: ConvulseResult<()>) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist layout preference");
            self.caps
                .notifier
                .notify(Notice::warning("Couldn't save layout preference"));
        }
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("settings", &self.settings)
            .field("sources", &self.sources)
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}
