//! End-to-end composer flows over fake capabilities.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use convulse_capture_engine::RecordingState;
use convulse_common::config::AppConfig;
use convulse_common::error::{ConvulseError, ConvulseResult};
use convulse_composer::{
    Acquisition, Capabilities, Command, Composer, SAVE_FAILED_TEXT, START_FAILED_TEXT,
};
use convulse_platform_core::{
    Artifact, AudioTrack, CaptureDevice, CaptureStream, ComposedStream, EncoderFactory,
    EncoderSink, MemoryPreferenceStore, Notice, NoticeLevel, Notifier, PreferenceStore,
    SaveTrigger, SegmentSender, VideoFrame,
};
use convulse_scene_model::{PositionIndex, SourceKind};
use tokio::sync::{mpsc, watch};

struct FakeDevice {
    fail_desktop: bool,
    senders: Mutex<Vec<watch::Sender<Option<Arc<VideoFrame>>>>>,
}

impl FakeDevice {
    fn new(fail_desktop: bool) -> Self {
        Self {
            fail_desktop,
            senders: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FakeDevice {
    async fn request(&self, kind: SourceKind, wants_audio: bool) -> ConvulseResult<CaptureStream> {
        if kind == SourceKind::Desktop && self.fail_desktop {
            return Err(ConvulseError::permission_denied("screen share declined"));
        }
        let (tx, rx) = watch::channel(Some(Arc::new(VideoFrame::solid(
            64,
            48,
            [200, 10, 10, 255],
        ))));
        self.senders.lock().unwrap().push(tx);
        let mut stream = CaptureStream::new(kind, rx);
        if wants_audio {
            stream = stream.with_audio_tracks(vec![AudioTrack {
                label: "microphone".to_string(),
                device: None,
            }]);
        }
        Ok(stream)
    }
}

/// Emits one segment when started and one tail chunk when stopped.
struct FakeSink {
    recording: u64,
}

impl EncoderSink for FakeSink {
    fn mime_type(&self) -> &str {
        "video/webm"
    }

    fn start(&mut self, _timeslice: Duration, segments: SegmentSender) -> ConvulseResult<()> {
        self.recording = segments.recording_id();
        segments.send(format!("head{}", self.recording).into_bytes());
        Ok(())
    }

    fn stop(&mut self) -> ConvulseResult<Option<Vec<u8>>> {
        Ok(Some(format!("tail{}", self.recording).into_bytes()))
    }
}

#[derive(Default)]
struct FakeFactory {
    fail: bool,
    audio_tracks_seen: Mutex<Vec<usize>>,
}

impl EncoderFactory for FakeFactory {
    fn create(
        &self,
        stream: &ComposedStream,
        _mime_type: &str,
    ) -> ConvulseResult<Box<dyn EncoderSink>> {
        if self.fail {
            return Err(ConvulseError::encoder("no encoder"));
        }
        self.audio_tracks_seen
            .lock()
            .unwrap()
            .push(stream.audio_tracks().len());
        Ok(Box::new(FakeSink { recording: 0 }))
    }
}

#[derive(Default)]
struct MemorySave {
    fail: bool,
    saved: Mutex<Vec<Artifact>>,
}

impl SaveTrigger for MemorySave {
    fn save(&self, artifact: &Artifact) -> ConvulseResult<PathBuf> {
        if self.fail {
            return Err(ConvulseError::export("disk full"));
        }
        self.saved.lock().unwrap().push(artifact.clone());
        Ok(PathBuf::from("/downloads").join(&artifact.file_name))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    indicator: Mutex<Vec<bool>>,
}

impl RecordingNotifier {
    fn texts(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.text.clone())
            .collect()
    }

    fn warnings(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == NoticeLevel::Warning)
            .map(|n| n.text.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }

    fn recording_changed(&self, recording: bool) {
        self.indicator.lock().unwrap().push(recording);
    }
}

struct Harness {
    device: Arc<FakeDevice>,
    factory: Arc<FakeFactory>,
    save: Arc<MemorySave>,
    preferences: Arc<MemoryPreferenceStore>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new() -> Self {
        Self {
            device: Arc::new(FakeDevice::new(false)),
            factory: Arc::new(FakeFactory::default()),
            save: Arc::new(MemorySave::default()),
            preferences: Arc::new(MemoryPreferenceStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn composer(&self) -> Composer {
        let mut config = AppConfig::default();
        config.canvas.width = 320;
        config.canvas.height = 240;
        config.canvas.refresh_hz = 200;
        Composer::new(
            config,
            Capabilities {
                device: self.device.clone(),
                encoder: self.factory.clone(),
                save: self.save.clone(),
                preferences: self.preferences.clone(),
                notifier: self.notifier.clone(),
            },
        )
    }

    fn saved(&self) -> Vec<Artifact> {
        self.save.saved.lock().unwrap().clone()
    }
}

async fn acquire_all(composer: &mut Composer) {
    let mut acquisitions = composer.spawn_acquisitions();
    while let Some(acquisition) = acquisitions.recv().await {
        composer.on_acquired(acquisition);
    }
}

#[tokio::test]
async fn test_denied_desktop_still_composes_webcam() {
    let mut harness = Harness::new();
    harness.device = Arc::new(FakeDevice::new(true));
    let mut composer = harness.composer();

    acquire_all(&mut composer).await;

    assert!(composer.sources().source(SourceKind::Desktop).is_unavailable());
    assert!(composer.sources().source(SourceKind::Webcam).is_live());
    assert_eq!(
        harness.notifier.warnings(),
        vec!["Couldn't open screen grabber!".to_string()]
    );

    let composition = composer.step();
    assert!(composition.layer(SourceKind::Desktop).is_none());
    assert!(composition.layer(SourceKind::Webcam).is_some());
    assert!(composer.composed_stream().latest_frame().is_some());

    assert!(composer.toggle_recording().is_none());
    let saved = composer.toggle_recording().unwrap();
    assert_eq!(saved.segments, 2);
    assert_eq!(harness.saved()[0].bytes, b"head1tail1");
}

#[tokio::test]
async fn test_webcam_audio_reaches_encoder() {
    let harness = Harness::new();
    let mut composer = harness.composer();
    acquire_all(&mut composer).await;

    assert_eq!(composer.composed_stream().audio_tracks().len(), 1);
    composer.toggle_recording();
    assert_eq!(*harness.factory.audio_tracks_seen.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_failed_acquisition_is_not_retried() {
    let mut harness = Harness::new();
    harness.device = Arc::new(FakeDevice::new(true));
    let mut composer = harness.composer();
    acquire_all(&mut composer).await;

    composer.on_acquired(Acquisition {
        kind: SourceKind::Desktop,
        result: Err(ConvulseError::capture("again")),
    });
    assert_eq!(harness.notifier.warnings().len(), 1);
}

#[test]
fn test_two_recordings_export_disjoint_artifacts() {
    let harness = Harness::new();
    let mut composer = harness.composer();

    composer.toggle_recording();
    assert_eq!(composer.recording_state(), RecordingState::Recording);
    let first = composer.toggle_recording().unwrap();
    composer.toggle_recording();
    let second = composer.toggle_recording().unwrap();

    let saved = harness.saved();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].bytes, b"head1tail1");
    assert_eq!(saved[1].bytes, b"head2tail2");
    assert!(first.file_name.starts_with("convulse-"));
    assert!(second.file_name.ends_with(".webm"));
    assert_eq!(*harness.notifier.indicator.lock().unwrap(), vec![true, false, true, false]);
    assert_eq!(composer.summary().exports.len(), 2);
}

#[test]
fn test_layout_commands_persist() {
    let harness = Harness::new();
    let mut composer = harness.composer();

    assert!(composer.handle_command(Command::CyclePosition(SourceKind::Webcam)));
    assert!(composer.handle_command(Command::SetSize(SourceKind::Desktop, 0.5)));

    assert_eq!(composer.settings().webcam.position, PositionIndex::new(3));
    assert_eq!(harness.preferences.get("webcam_pos").as_deref(), Some("3"));
    assert_eq!(harness.preferences.get("desktop_size").as_deref(), Some("0.5"));

    // A fresh session picks the stored layout back up.
    let reopened = harness.composer();
    assert_eq!(reopened.settings(), composer.settings());
}

#[test]
fn test_non_finite_size_is_ignored() {
    let harness = Harness::new();
    let mut composer = harness.composer();
    let before = *composer.settings();

    assert!(composer.handle_command(Command::SetSize(SourceKind::Webcam, f64::NAN)));
    assert_eq!(composer.settings(), &before);
    assert!(harness.preferences.get("webcam_size").is_none());
}

#[test]
fn test_encoder_failure_leaves_composer_idle() {
    let mut harness = Harness::new();
    harness.factory = Arc::new(FakeFactory {
        fail: true,
        ..FakeFactory::default()
    });
    let mut composer = harness.composer();

    assert!(composer.toggle_recording().is_none());
    assert_eq!(composer.recording_state(), RecordingState::Idle);
    assert_eq!(harness.notifier.warnings(), vec![START_FAILED_TEXT.to_string()]);
    assert!(harness.notifier.indicator.lock().unwrap().is_empty());
}

#[test]
fn test_save_failure_is_reported() {
    let mut harness = Harness::new();
    harness.save = Arc::new(MemorySave {
        fail: true,
        ..MemorySave::default()
    });
    let mut composer = harness.composer();

    composer.toggle_recording();
    assert!(composer.toggle_recording().is_none());
    assert_eq!(composer.recording_state(), RecordingState::Idle);
    assert_eq!(harness.notifier.warnings(), vec![SAVE_FAILED_TEXT.to_string()]);
    assert_eq!(composer.summary().failed_exports, 1);
}

#[test]
fn test_shutdown_exports_active_recording() {
    let harness = Harness::new();
    let mut composer = harness.composer();

    composer.toggle_recording();
    let summary = composer.shutdown();

    assert_eq!(summary.exports.len(), 1);
    assert_eq!(harness.saved()[0].bytes, b"head1tail1");
    assert_eq!(composer.recording_state(), RecordingState::Idle);
}

#[tokio::test]
async fn test_run_loop_records_between_toggles() {
    let harness = Harness::new();
    let composer = harness.composer();
    let (tx, rx) = mpsc::unbounded_channel();

    let session = tokio::spawn(composer.run(rx));
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(Command::ToggleRecording).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(Command::ToggleRecording).unwrap();
    tx.send(Command::Shutdown).unwrap();

    let summary = session.await.unwrap();
    assert_eq!(summary.exports.len(), 1);
    assert!(summary.frames_rendered > 0);
    assert!(harness
        .notifier
        .texts()
        .contains(&"Press Enter to start and stop recording".to_string()));
}

#[tokio::test]
async fn test_closed_command_channel_ends_session() {
    let harness = Harness::new();
    let composer = harness.composer();
    let (tx, rx) = mpsc::unbounded_channel();

    tx.send(Command::ToggleRecording).unwrap();
    drop(tx);

    let summary = composer.run(rx).await;
    assert_eq!(summary.exports.len(), 1);
    assert_eq!(harness.saved().len(), 1);
}
