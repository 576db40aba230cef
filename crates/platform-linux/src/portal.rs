//! XDG Desktop Portal integration for Wayland screen capture.
//!
//! On Wayland, screen capture must go through the XDG Desktop Portal,
//! which provides a user-consented, sandboxed way to access screen content.
//!
//! # Flow
//!
//! 1. Connect to `org.freedesktop.portal.ScreenCast` via DBus
//! 2. Create a session
//! 3. Select sources (screen/window) with the requested cursor mode
//! 4. Start the stream → receive a PipeWire node ID
//! 5. Open the PipeWire remote → receive the fd the node is reachable on

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use ashpd::desktop::screencast::{
    CursorMode as PortalCursorMode, Screencast, SourceType as PortalSourceType,
};
use ashpd::desktop::PersistMode;
use convulse_common::error::{ConvulseError, ConvulseResult};

/// Cursor mode for screen capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Hide cursor from capture.
    Hidden,
    /// Show cursor embedded in the video stream.
    Embedded,
}

impl CursorMode {
    fn to_portal(self) -> PortalCursorMode {
        match self {
            CursorMode::Hidden => PortalCursorMode::Hidden,
            CursorMode::Embedded => PortalCursorMode::Embedded,
        }
    }
}

/// What the user may pick in the portal dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Monitor,
    Window,
    /// Either a monitor or a single window.
    MonitorOrWindow,
}

/// Result of a successful portal session setup.
#[derive(Debug)]
pub struct PortalSession {
    /// PipeWire node ID for the video stream.
    pub pipewire_node_id: u32,

    /// Stream dimensions, when the portal reports them.
    pub size: Option<(u32, u32)>,

    /// PipeWire remote the node lives on. Must outlive the consumer.
    pipewire_fd: OwnedFd,
}

impl PortalSession {
    /// Raw fd to hand to `pipewiresrc fd=`.
    pub fn pipewire_fd(&self) -> RawFd {
        self.pipewire_fd.as_raw_fd()
    }
}

/// Request a screen capture session through the XDG Desktop Portal.
///
/// Resolves only once the user has answered the portal dialog; a refusal
/// surfaces as an error.
pub async fn request_screencast(
    source_type: SourceType,
    cursor_mode: CursorMode,
) -> ConvulseResult<PortalSession> {
    tracing::info!(
        source = ?source_type,
        cursor = ?cursor_mode,
        "Requesting XDG ScreenCast session"
    );

    let proxy = Screencast::new().await.map_err(map_portal_error)?;
    let session = proxy.create_session().await.map_err(map_portal_error)?;

    proxy
        .select_sources(
            &session,
            cursor_mode.to_portal(),
            match source_type {
                SourceType::Monitor => PortalSourceType::Monitor.into(),
                SourceType::Window => PortalSourceType::Window.into(),
                SourceType::MonitorOrWindow => PortalSourceType::Monitor | PortalSourceType::Window,
            },
            false,
            None,
            PersistMode::DoNot,
        )
        .await
        .map_err(map_portal_error)?
        .response()
        .map_err(map_portal_error)?;

    let response = proxy
        .start(&session, &ashpd::WindowIdentifier::default())
        .await
        .map_err(map_portal_error)?
        .response()
        .map_err(map_portal_error)?;

    let stream = response
        .streams()
        .first()
        .ok_or_else(|| ConvulseError::permission_denied("No screen or window was selected"))?
        .to_owned();

    let pipewire_fd = proxy
        .open_pipe_wire_remote(&session)
        .await
        .map_err(map_portal_error)?;

    let size = stream
        .size()
        .map(|(w, h)| (w.max(0) as u32, h.max(0) as u32));

    tracing::info!(
        node_id = stream.pipe_wire_node_id(),
        ?size,
        "ScreenCast session started"
    );

    Ok(PortalSession {
        pipewire_node_id: stream.pipe_wire_node_id(),
        size,
        pipewire_fd,
    })
}

/// Check if the XDG ScreenCast portal is expected to be available.
pub fn is_portal_available() -> bool {
    std::env::var("WAYLAND_DISPLAY").is_ok()
        || std::env::var("XDG_SESSION_TYPE")
            .map(|v| v == "wayland")
            .unwrap_or(false)
}

fn map_portal_error(err: ashpd::Error) -> ConvulseError {
    match err {
        ashpd::Error::Response(e) => {
            ConvulseError::permission_denied(format!("ScreenCast request refused: {e}"))
        }
        other => ConvulseError::platform(format!("Portal error: {other}")),
    }
}
