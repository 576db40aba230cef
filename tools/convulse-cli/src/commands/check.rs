//! Check system capabilities.

use convulse_capture_engine::pipeline::{detect_default_webcam_device, missing_elements};
use convulse_common::config::AppConfig;
use convulse_platform_linux::{detect_display_server, DisplayServer};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Convulse System Check");
    println!("{}", "=".repeat(50));

    let ds = detect_display_server();
    match ds {
        DisplayServer::Wayland => println!("[OK] Display server: Wayland"),
        DisplayServer::X11 => println!("[OK] Display server: X11"),
        _ => println!("[WARN] Display server: Unknown"),
    }

    let webcam = config
        .capture
        .webcam_device
        .clone()
        .or_else(detect_default_webcam_device);
    match &webcam {
        Some(device) => println!("[OK] Webcam: {device}"),
        None => println!("[WARN] Webcam: no capture device found"),
    }

    let gst_ok = match missing_elements() {
        Ok(missing) if missing.is_empty() => {
            println!("[OK] GStreamer elements: all present");
            true
        }
        Ok(missing) => {
            println!("[FAIL] GStreamer elements missing: {}", missing.join(", "));
            false
        }
        Err(e) => {
            println!("[FAIL] GStreamer: {e}");
            false
        }
    };

    let capabilities = convulse_platform_linux::permissions::check_capabilities();
    println!();
    convulse_platform_linux::permissions::print_capability_report(&capabilities);

    let all_required_ok = gst_ok
        && capabilities
            .iter()
            .filter(|c| c.required)
            .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. Convulse is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
