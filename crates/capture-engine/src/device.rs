//! GStreamer-backed capture device.

use convulse_common::config::CaptureDefaults;
use convulse_common::error::{ConvulseError, ConvulseResult};
use convulse_platform_core::{AudioTrack, CaptureDevice, CaptureStream, FrameReceiver};
use convulse_platform_linux::portal::{
    is_portal_available, request_screencast, CursorMode, SourceType,
};
use convulse_platform_linux::{detect_display_server, DisplayServer};
use convulse_scene_model::SourceKind;
use tokio::sync::watch;

use crate::pipeline::{
    detect_default_webcam_device, pipewire_desktop_launch, webcam_launch, x11_desktop_launch,
    GstPipeline,
};

/// Label of the microphone track delivered with the webcam.
pub const MICROPHONE_TRACK: &str = "microphone";

/// Opens the webcam through V4L2 and the desktop through the ScreenCast
/// portal (Wayland) or `ximagesrc` (X11).
#[derive(Debug, Clone, Default)]
pub struct GstCaptureDevice {
    settings: CaptureDefaults,
}

impl GstCaptureDevice {
    pub fn new(settings: CaptureDefaults) -> Self {
        Self { settings }
    }

    async fn open_webcam(&self, wants_audio: bool) -> ConvulseResult<CaptureStream> {
        let configured = self.settings.webcam_device.clone();
        let mut stream = tokio::task::spawn_blocking(move || {
            let device = configured
                .or_else(detect_default_webcam_device)
                .ok_or_else(|| ConvulseError::capture("No webcam device found"))?;
            let (pipeline, frames) = start_pipeline("webcam", &webcam_launch(&device))?;
            let stream = CaptureStream::new(SourceKind::Webcam, frames).with_keepalive(pipeline);
            Ok::<_, ConvulseError>(stream)
        })
        .await
        .map_err(|e| ConvulseError::capture(format!("Webcam startup task failed: {e}")))??;

        if wants_audio {
            stream = stream.with_audio_tracks(vec![AudioTrack {
                label: MICROPHONE_TRACK.to_string(),
                device: None,
            }]);
        }
        Ok(stream)
    }

    async fn open_desktop(&self) -> ConvulseResult<CaptureStream> {
        let display_server = detect_display_server();
        tracing::info!(?display_server, "Opening desktop capture");

        match display_server {
            DisplayServer::Wayland => {
                if !is_portal_available() {
                    return Err(ConvulseError::platform(
                        "XDG ScreenCast portal is not available for this Wayland session",
                    ));
                }
                let cursor = if self.settings.show_cursor {
                    CursorMode::Embedded
                } else {
                    CursorMode::Hidden
                };
                let session = request_screencast(SourceType::MonitorOrWindow, cursor).await?;
                let launch = pipewire_desktop_launch(session.pipewire_fd(), session.pipewire_node_id);

                tokio::task::spawn_blocking(move || {
                    let (pipeline, frames) = start_pipeline("desktop", &launch)?;
                    // The portal session owns the PipeWire fd the pipeline reads from.
                    let stream = CaptureStream::new(SourceKind::Desktop, frames)
                        .with_keepalive((pipeline, session));
                    Ok::<_, ConvulseError>(stream)
                })
                .await
                .map_err(|e| ConvulseError::capture(format!("Desktop startup task failed: {e}")))?
            }
            DisplayServer::X11 => {
                let launch = x11_desktop_launch(self.settings.show_cursor);
                tokio::task::spawn_blocking(move || {
                    let (pipeline, frames) = start_pipeline("desktop-x11", &launch)?;
                    let stream =
                        CaptureStream::new(SourceKind::Desktop, frames).with_keepalive(pipeline);
                    Ok::<_, ConvulseError>(stream)
                })
                .await
                .map_err(|e| ConvulseError::capture(format!("Desktop startup task failed: {e}")))?
            }
            DisplayServer::Unknown => Err(ConvulseError::unsupported(
                "Unsupported display server (neither Wayland nor X11)",
            )),
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for GstCaptureDevice {
    async fn request(&self, kind: SourceKind, wants_audio: bool) -> ConvulseResult<CaptureStream> {
        match kind {
            SourceKind::Webcam => self.open_webcam(wants_audio).await,
            // Desktop capture never carries audio.
            SourceKind::Desktop => self.open_desktop().await,
        }
    }
}

fn start_pipeline(name: &str, launch: &str) -> ConvulseResult<(GstPipeline, FrameReceiver)> {
    let pipeline = GstPipeline::from_launch(name, launch)?;
    let (frames_tx, frames_rx) = watch::channel(None);
    pipeline.publish_frames(frames_tx)?;
    pipeline.start()?;
    tracing::info!(pipeline = %pipeline.name(), "Capture pipeline running");
    Ok((pipeline, frames_rx))
}
