//! GStreamer pipeline construction for capture and encoding.
//!
//! Capture pipelines end in an RGBA `appsink` named `frames`; every decoded
//! sample is published into a watch channel. Launch strings are built by
//! plain functions so they can be checked without GStreamer installed.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use convulse_common::error::{ConvulseError, ConvulseResult};
use convulse_platform_core::{AudioTrack, FrameSender, VideoFrame};
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;

/// Name of the appsink every capture pipeline ends in.
pub const FRAME_SINK_NAME: &str = "frames";

const APPSINK_TAIL: &str =
    "videoconvert ! video/x-raw,format=RGBA ! appsink name=frames max-buffers=1 drop=true sync=false";

/// A running GStreamer pipeline, stopped and released on drop.
pub struct GstPipeline {
    name: String,
    pipeline: gst::Pipeline,
}

impl GstPipeline {
    pub fn from_launch(name: impl Into<String>, launch: &str) -> ConvulseResult<Self> {
        init_gstreamer()?;
        let name = name.into();
        tracing::debug!(pipeline = %name, %launch, "Building pipeline");

        let element = gst::parse::launch(launch)
            .map_err(|e| ConvulseError::capture(format!("Failed to build {name} pipeline: {e}")))?;

        let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
            ConvulseError::capture(format!("Launch string for {name} did not produce a pipeline"))
        })?;

        Ok(Self { name, pipeline })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a named element and cast it.
    pub fn element<T: IsA<gst::Element>>(&self, element_name: &str) -> ConvulseResult<T> {
        self.pipeline
            .by_name(element_name)
            .ok_or_else(|| {
                ConvulseError::capture(format!("{} pipeline has no `{element_name}`", self.name))
            })?
            .dynamic_cast::<T>()
            .map_err(|_| {
                ConvulseError::capture(format!(
                    "`{element_name}` in {} pipeline has an unexpected type",
                    self.name
                ))
            })
    }

    /// Route every RGBA sample of the `frames` appsink into `frames`.
    pub fn publish_frames(&self, frames: FrameSender) -> ConvulseResult<()> {
        let sink: gst_app::AppSink = self.element(FRAME_SINK_NAME)?;
        let name = self.name.clone();
        sink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    match frame_from_sample(&sample) {
                        Some(frame) => {
                            frames.send_replace(Some(Arc::new(frame)));
                        }
                        None => tracing::trace!(pipeline = %name, "Skipping unreadable sample"),
                    }
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );
        Ok(())
    }

    pub fn start(&self) -> ConvulseResult<()> {
        self.pipeline.set_state(gst::State::Playing).map_err(|e| {
            ConvulseError::capture(format!("Failed to start {} pipeline: {e:?}", self.name))
        })?;

        // Live sources report NoPreroll and settle asynchronously; a device
        // that cannot be opened fails here instead of silently later.
        match self.pipeline.state(gst::ClockTime::from_seconds(5)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(
                    pipeline = %self.name,
                    ?state,
                    "Pipeline did not reach Playing state within timeout"
                );
            }
            (Err(e), _, _) => {
                let detail = self.bus_error().unwrap_or_else(|| format!("{e:?}"));
                let _ = self.pipeline.set_state(gst::State::Null);
                return Err(ConvulseError::capture(format!(
                    "{} pipeline failed to reach Playing state: {detail}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Send EOS and wait for it to drain so muxers can finalize.
    pub fn drain(&self, deadline: Duration) {
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            tracing::warn!(pipeline = %self.name, "Failed to send EOS event; output may be truncated");
            return;
        }
        let Some(bus) = self.pipeline.bus() else {
            return;
        };

        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= deadline {
                tracing::warn!(pipeline = %self.name, "EOS drain timed out");
                break;
            }
            let remaining = gst::ClockTime::from_nseconds((deadline - elapsed).as_nanos() as u64);
            match bus.timed_pop(remaining) {
                Some(msg) => match msg.view() {
                    gst::MessageView::Eos(_) => {
                        tracing::debug!(pipeline = %self.name, "EOS received; pipeline drained");
                        break;
                    }
                    gst::MessageView::Error(e) => {
                        tracing::warn!(
                            pipeline = %self.name,
                            error = %e.error(),
                            "Pipeline error during EOS drain"
                        );
                        break;
                    }
                    _ => {}
                },
                None => {
                    tracing::warn!(pipeline = %self.name, "EOS drain timed out");
                    break;
                }
            }
        }
    }

    pub fn stop(&self) -> ConvulseResult<()> {
        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            ConvulseError::capture(format!("Failed to stop {} pipeline: {e:?}", self.name))
        })?;
        Ok(())
    }

    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(e) => Some(e.error().to_string()),
            _ => None,
        }
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::debug!(pipeline = %self.name, error = %e, "Pipeline teardown failed");
        }
    }
}

impl std::fmt::Debug for GstPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GstPipeline").field("name", &self.name).finish()
    }
}

fn frame_from_sample(sample: &gst::Sample) -> Option<VideoFrame> {
    let caps = sample.caps()?;
    let structure = caps.structure(0)?;
    let width = structure.get::<i32>("width").ok()?;
    let height = structure.get::<i32>("height").ok()?;
    let buffer = sample.buffer()?;
    let map = buffer.map_readable().ok()?;
    VideoFrame::from_rgba(width.max(0) as u32, height.max(0) as u32, map.as_slice().to_vec()).ok()
}

pub(crate) fn init_gstreamer() -> ConvulseResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(ConvulseError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

/// Webcam capture from a V4L2 node.
pub fn webcam_launch(device: &str) -> String {
    let device = escape(device);
    format!("v4l2src device=\"{device}\" do-timestamp=true ! videoscale ! {APPSINK_TAIL}")
}

/// Desktop capture from a portal-granted PipeWire node.
pub fn pipewire_desktop_launch(fd: i32, node_id: u32) -> String {
    format!("pipewiresrc fd={fd} path={node_id} do-timestamp=true ! {APPSINK_TAIL}")
}

/// Desktop capture on X11.
pub fn x11_desktop_launch(show_cursor: bool) -> String {
    format!("ximagesrc use-damage=false show-pointer={show_cursor} ! {APPSINK_TAIL}")
}

/// Source fragment for one audio track of the composed stream.
pub fn audio_source_fragment(track: &AudioTrack) -> String {
    match &track.device {
        Some(device) => format!("pulsesrc device=\"{}\" do-timestamp=true", escape(device)),
        None => "autoaudiosrc".to_string(),
    }
}

/// Elements the capture and encoder pipelines rely on.
pub const REQUIRED_ELEMENTS: &[&str] = &[
    "appsrc",
    "appsink",
    "videoconvert",
    "videoscale",
    "v4l2src",
    "pipewiresrc",
    "ximagesrc",
    "autoaudiosrc",
    "audioconvert",
    "audioresample",
    "vp8enc",
    "opusenc",
    "webmmux",
];

/// Required elements missing from the local GStreamer registry.
pub fn missing_elements() -> ConvulseResult<Vec<&'static str>> {
    init_gstreamer()?;
    Ok(REQUIRED_ELEMENTS
        .iter()
        .copied()
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .collect())
}

/// Detect the best V4L2 webcam device.
///
/// Enumerates `/dev/video0`–`/dev/video15`, scores each candidate by its
/// sysfs name and `v4l2-ctl` capabilities, and returns the best one. Falls
/// back to the first existing node when nothing scores.
pub fn detect_default_webcam_device() -> Option<String> {
    let mut candidates: Vec<(String, u32)> = Vec::new();

    for idx in 0..16u32 {
        let dev_path = format!("/dev/video{idx}");
        if !std::path::Path::new(&dev_path).exists() {
            continue;
        }
        let device_name = std::fs::read_to_string(format!("/sys/class/video4linux/video{idx}/name"))
            .unwrap_or_default();
        let priority = webcam_device_priority(&device_name, probe_v4l2_capture_capability(&dev_path));
        tracing::debug!(device = %dev_path, name = %device_name.trim(), priority, "V4L2 candidate");
        candidates.push((dev_path, priority));
    }

    // Stable sort keeps /dev/video0 ahead of later nodes on ties.
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    let (device, priority) = candidates.into_iter().next()?;

    tracing::info!(%device, priority, "Selected webcam device");
    Some(device)
}

/// Score a V4L2 device as a webcam candidate (higher = more likely a webcam).
fn webcam_device_priority(device_name: &str, supports_capture: Option<bool>) -> u32 {
    const WEBCAM_KEYWORDS: &[&str] = &[
        "webcam", "camera", "cam", "facetime", "logitech", "microsoft", "creative", "razer",
        "elgato", "virtual", "v4l2loopback",
    ];
    const NON_WEBCAM_KEYWORDS: &[&str] = &[
        "tuner", "tv", "dvb", "hdmi", "capture", "encoder", "decoder", "hauppauge", "blackmagic",
        "magewell",
    ];

    let device_name = device_name.to_lowercase();
    if NON_WEBCAM_KEYWORDS.iter().any(|kw| device_name.contains(kw)) {
        return 0;
    }
    let has_webcam_keyword = WEBCAM_KEYWORDS.iter().any(|kw| device_name.contains(kw));

    match (has_webcam_keyword, supports_capture) {
        (true, Some(true)) => 100,
        (true, _) => 80,
        (false, Some(true)) => 50,
        (false, Some(false)) => 0,
        (false, None) => 10,
    }
}

/// `Some(true)` if `v4l2-ctl` reports Video Capture, `None` without `v4l2-ctl`.
fn probe_v4l2_capture_capability(dev_path: &str) -> Option<bool> {
    let output = std::process::Command::new("v4l2-ctl")
        .args(["--device", dev_path, "--info"])
        .output()
        .ok()?;

    if !output.status.success() {
        return Some(false);
    }
    let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
    Some(stdout.contains("video capture"))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
