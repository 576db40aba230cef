//! GStreamer encoder sink for the composed stream.
//!
//! ```text
//! ComposedStream video ──► appsrc ─► videoconvert ─► vp8enc ──┐
//! audio track(s) ──────► autoaudiosrc ─► opusenc ─────────────┼─► webmmux ─► appsink
//!                                                             │      (pending bytes)
//!                                       every timeslice ◄─────┘──────────┘
//! ```
//!
//! Muxed output accumulates in a shared buffer; a timer task hands it to
//! the owner as one segment per timeslice. `stop` closes the buffer under
//! the same lock the timer sends under, so no segment is reported after
//! `stop` returns, then drains the pipeline and returns whatever the muxer
//! wrote after the last tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use convulse_common::error::{ConvulseError, ConvulseResult};
use convulse_platform_core::{
    AudioTrack, ComposedStream, EncoderFactory, EncoderSink, FrameReceiver, SegmentSender,
    VideoFrame,
};
use gstreamer as gst;
use gstreamer_app as gst_app;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::pipeline::{audio_source_fragment, GstPipeline};

const EOS_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Output containers the encoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// VP8 + Opus in WebM.
    WebM,
    /// H.264 + Opus in Matroska.
    Matroska,
}

impl Container {
    /// Resolve a MIME type, ignoring any `;codecs=` parameters.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "video/webm" => Some(Self::WebM),
            "video/x-matroska" => Some(Self::Matroska),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebM => "video/webm",
            Self::Matroska => "video/x-matroska",
        }
    }

    fn muxer(self) -> &'static str {
        match self {
            Self::WebM => "webmmux",
            Self::Matroska => "matroskamux",
        }
    }

    fn video_encoder(self, fps: u32) -> String {
        let keyint = fps.saturating_mul(2).max(2);
        match self {
            Self::WebM => {
                format!("vp8enc deadline=1 cpu-used=8 keyframe-max-dist={keyint}")
            }
            Self::Matroska => format!(
                "x264enc tune=zerolatency speed-preset=veryfast key-int-max={keyint} ! h264parse"
            ),
        }
    }
}

/// Launch string for an encoder over a canvas of the given geometry.
pub fn encoder_launch(
    container: Container,
    width: u32,
    height: u32,
    fps: u32,
    audio_tracks: &[AudioTrack],
) -> String {
    let fps = fps.max(1);
    let mut launch = format!(
        "{mux} name=mux streamable=true ! appsink name=segments sync=false \
         appsrc name=canvas is-live=true do-timestamp=true format=time \
         caps=\"video/x-raw,format=RGBA,width={width},height={height},framerate={fps}/1\" \
         ! queue max-size-buffers=8 leaky=downstream ! videoconvert ! {video} ! queue ! mux.",
        mux = container.muxer(),
        video = container.video_encoder(fps),
    );
    for track in audio_tracks {
        launch.push_str(&format!(
            " {source} ! queue ! audioconvert ! audioresample ! opusenc ! queue ! mux.",
            source = audio_source_fragment(track)
        ));
    }
    launch
}

/// Builds [`GstEncoderSink`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct GstEncoderFactory;

impl EncoderFactory for GstEncoderFactory {
    fn create(
        &self,
        stream: &ComposedStream,
        mime_type: &str,
    ) -> ConvulseResult<Box<dyn EncoderSink>> {
        let container = Container::from_mime(mime_type).ok_or_else(|| {
            ConvulseError::unsupported(format!("No encoder available for {mime_type}"))
        })?;
        let launch = encoder_launch(
            container,
            stream.width(),
            stream.height(),
            stream.fps(),
            stream.audio_tracks(),
        );
        Ok(Box::new(GstEncoderSink::new(
            container,
            &launch,
            stream.subscribe_video(),
        )?))
    }
}

/// Encoder bound to one composed stream for one recording.
pub struct GstEncoderSink {
    container: Container,
    pipeline: GstPipeline,
    appsrc: gst_app::AppSrc,
    frames: Option<FrameReceiver>,
    pending: Arc<Mutex<PendingBytes>>,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl GstEncoderSink {
    fn new(container: Container, launch: &str, frames: FrameReceiver) -> ConvulseResult<Self> {
        let pipeline = GstPipeline::from_launch("encoder", launch)
            .map_err(|e| ConvulseError::encoder(e.to_string()))?;
        let appsrc: gst_app::AppSrc = pipeline.element("canvas")?;
        let appsink: gst_app::AppSink = pipeline.element("segments")?;

        let pending = Arc::new(Mutex::new(PendingBytes::default()));
        let sink_pending = pending.clone();
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    if let Some(buffer) = sample.buffer() {
                        let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                        lock(&sink_pending).bytes.extend_from_slice(map.as_slice());
                    }
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        Ok(Self {
            container,
            pipeline,
            appsrc,
            frames: Some(frames),
            pending,
            tasks: Vec::new(),
            started: false,
        })
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl EncoderSink for GstEncoderSink {
    fn mime_type(&self) -> &str {
        self.container.mime_type()
    }

    fn start(&mut self, timeslice: Duration, segments: SegmentSender) -> ConvulseResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ConvulseError::encoder("Encoder sink must start inside a tokio runtime"))?;
        let mut frames = self
            .frames
            .take()
            .ok_or_else(|| ConvulseError::encoder("Encoder sink already started"))?;

        self.pipeline
            .start()
            .map_err(|e| ConvulseError::encoder(e.to_string()))?;
        self.started = true;

        let appsrc = self.appsrc.clone();
        self.tasks.push(runtime.spawn(async move {
            loop {
                let frame = frames.borrow_and_update().clone();
                if let Some(frame) = frame {
                    let buffer = gst::Buffer::from_slice(FrameBytes(frame));
                    if appsrc.push_buffer(buffer).is_err() {
                        tracing::debug!("Encoder refused canvas frame, stopping feed");
                        break;
                    }
                }
                if frames.changed().await.is_err() {
                    break;
                }
            }
        }));

        let pending = self.pending.clone();
        let recording_id = segments.recording_id();
        self.tasks.push(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(timeslice);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let keep_going = {
                    let mut buffer = lock(&pending);
                    if buffer.closed {
                        false
                    } else if buffer.bytes.is_empty() {
                        true
                    } else {
                        segments.send(std::mem::take(&mut buffer.bytes))
                    }
                };
                if !keep_going {
                    tracing::debug!(recording_id, "Segment flush finished");
                    break;
                }
            }
        }));

        tracing::debug!(
            recording_id,
            mime = %self.container.mime_type(),
            "Encoder sink started"
        );
        Ok(())
    }

    fn stop(&mut self) -> ConvulseResult<Option<Vec<u8>>> {
        lock(&self.pending).closed = true;
        self.abort_tasks();
        if !self.started {
            return Ok(None);
        }
        self.started = false;

        self.pipeline.drain(EOS_DRAIN_TIMEOUT);
        self.pipeline
            .stop()
            .map_err(|e| ConvulseError::encoder(e.to_string()))?;

        let rest = std::mem::take(&mut lock(&self.pending).bytes);
        Ok((!rest.is_empty()).then_some(rest))
    }
}

impl Drop for GstEncoderSink {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Lets a shared canvas frame back a GStreamer buffer without a copy.
struct FrameBytes(Arc<VideoFrame>);

impl AsRef<[u8]> for FrameBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.data()
    }
}

/// Muxer output not yet reported as a segment.
#[derive(Debug, Default)]
struct PendingBytes {
    bytes: Vec<u8>,
    /// Set by `stop`; the flush task exits on its next tick.
    closed: bool,
}

fn lock(pending: &Mutex<PendingBytes>) -> MutexGuard<'_, PendingBytes> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
