//! Permission detection and guidance for Linux.
//!
//! Convulse needs a screen capture path and, optionally, a webcam and a
//! microphone. Everything except screen capture is optional: the composer
//! keeps running with whichever sources are available.

use crate::display::{detect_display_server, DisplayServer};
use crate::portal::is_portal_available;

/// A system capability that Convulse may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    vec![
        check_screen_capture_access(),
        check_pipewire_access(),
        check_webcam_access(),
        check_audio_access(),
    ]
}

/// Check that some screen capture path exists (portal on Wayland, X server on X11).
fn check_screen_capture_access() -> Capability {
    let (available, description) = match detect_display_server() {
        DisplayServer::Wayland => (
            is_portal_available(),
            "XDG Desktop Portal for screen recording consent",
        ),
        DisplayServer::X11 => (true, "X11 screen grabbing (ximagesrc)"),
        DisplayServer::Unknown => (false, "Graphical session for screen capture"),
    };

    Capability {
        name: "Screen Capture".to_string(),
        description: description.to_string(),
        available,
        required: true,
        fix_instructions: if !available {
            Some(
                "Ensure you are running a graphical desktop session (GNOME, KDE, etc.)".to_string(),
            )
        } else {
            None
        },
    }
}

/// Check PipeWire availability.
fn check_pipewire_access() -> Capability {
    let available = std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| std::path::Path::new(&dir).join("pipewire-0").exists())
        .unwrap_or(false);

    Capability {
        name: "PipeWire".to_string(),
        description: "PipeWire multimedia server for portal screen streams".to_string(),
        available,
        required: detect_display_server() == DisplayServer::Wayland,
        fix_instructions: if !available {
            Some("Install PipeWire: sudo apt install pipewire pipewire-pulse".to_string())
        } else {
            None
        },
    }
}

/// Check audio capture capability.
fn check_audio_access() -> Capability {
    let available = std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| std::path::Path::new(&dir).join("pulse").exists())
        .unwrap_or(false);

    Capability {
        name: "Audio Capture".to_string(),
        description: "PulseAudio/PipeWire microphone for the recording's audio track".to_string(),
        available,
        required: false,
        fix_instructions: if !available {
            Some("Start PulseAudio or pipewire-pulse to record microphone audio".to_string())
        } else {
            None
        },
    }
}

/// Check if a webcam device is available.
fn check_webcam_access() -> Capability {
    let has_webcam = (0..16)
        .map(|idx| format!("/dev/video{idx}"))
        .any(|path| std::path::Path::new(&path).exists());

    Capability {
        name: "Webcam Device".to_string(),
        description: "Video4Linux webcam source for the camera layer".to_string(),
        available: has_webcam,
        required: false,
        fix_instructions: if has_webcam {
            None
        } else {
            Some(
                "Connect a webcam and verify /dev/video* exists (v4l2-ctl --list-devices)"
                    .to_string(),
            )
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("Convulse System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
