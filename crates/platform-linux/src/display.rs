//! Display server detection.

/// Display server type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    Wayland,
    X11,
    Unknown,
}

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    display_server_from(
        std::env::var("WAYLAND_DISPLAY").ok().as_deref(),
        std::env::var("DISPLAY").ok().as_deref(),
    )
}

fn display_server_from(wayland_display: Option<&str>, x11_display: Option<&str>) -> DisplayServer {
    match (wayland_display, x11_display) {
        (Some(w), _) if !w.is_empty() => DisplayServer::Wayland,
        (_, Some(x)) if !x.is_empty() => DisplayServer::X11,
        _ => DisplayServer::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wayland_wins_over_xwayland() {
        assert_eq!(
            display_server_from(Some("wayland-0"), Some(":0")),
            DisplayServer::Wayland
        );
    }

    #[test]
    fn test_plain_x11_session() {
        assert_eq!(display_server_from(None, Some(":1")), DisplayServer::X11);
    }

    #[test]
    fn test_empty_variables_are_ignored() {
        assert_eq!(display_server_from(Some(""), Some("")), DisplayServer::Unknown);
        assert_eq!(display_server_from(None, None), DisplayServer::Unknown);
    }
}
