//! Run the live composer.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use convulse_capture_engine::{GstCaptureDevice, GstEncoderFactory};
use convulse_common::config::AppConfig;
use convulse_composer::{Capabilities, Command, Composer, ConsoleNotifier, JsonFilePreferenceStore};
use convulse_platform_core::{MemoryPreferenceStore, PreferenceStore};
use convulse_render_engine::FileSaveTrigger;
use convulse_scene_model::SourceKind;
use tokio::sync::mpsc;

/// Per-run overrides from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub refresh_hz: Option<u32>,
    pub capture_fps: Option<u32>,
    pub timeslice_ms: Option<u64>,
    pub webcam: bool,
    pub desktop: bool,
    pub persist: bool,
}

pub async fn run(mut config: AppConfig, options: RunOptions) -> anyhow::Result<()> {
    apply_overrides(&mut config, &options);

    let sources: Vec<SourceKind> = SourceKind::DRAW_ORDER
        .into_iter()
        .filter(|kind| match kind {
            SourceKind::Webcam => options.webcam,
            SourceKind::Desktop => options.desktop,
        })
        .collect();
    if sources.is_empty() {
        anyhow::bail!("Nothing to compose: both --no-webcam and --no-desktop were given");
    }

    println!("Convulse");
    println!("  Canvas: {}x{}", config.canvas.width, config.canvas.height);
    println!(
        "  Refresh: {} Hz, recording at {} fps",
        config.canvas.refresh_hz, config.canvas.capture_fps
    );
    println!("  Output: {}", config.recording.output_dir.display());
    println!(
        "  Sources: {}",
        sources
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Commands: Enter or r = record/stop, w / d = move webcam / desktop,");
    println!("          w <size> / d <size> = resize (0..1), q = quit");
    println!();

    let preferences: Arc<dyn PreferenceStore> = if options.persist {
        Arc::new(JsonFilePreferenceStore::open(&config.preferences_path))
    } else {
        Arc::new(MemoryPreferenceStore::new())
    };

    let caps = Capabilities {
        device: Arc::new(GstCaptureDevice::new(config.capture.clone())),
        encoder: Arc::new(GstEncoderFactory),
        save: Arc::new(FileSaveTrigger::new(config.recording.output_dir.clone())),
        preferences,
        notifier: Arc::new(ConsoleNotifier),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    spawn_stdin_reader(tx.clone())?;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Command::Shutdown);
        }
    });

    let summary = Composer::new(config, caps)
        .with_sources(&sources)
        .run(rx)
        .await;

    println!();
    println!("Frames rendered: {}", summary.frames_rendered);
    for saved in &summary.exports {
        println!(
            "Recording saved to: {} ({} bytes, {:.1}s)",
            saved.location.display(),
            saved.bytes,
            saved.duration_secs
        );
    }
    if summary.failed_exports > 0 {
        anyhow::bail!("{} recording(s) could not be saved", summary.failed_exports);
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, options: &RunOptions) {
    if let Some(output) = &options.output {
        config.recording.output_dir = output.clone();
    }
    if let Some(width) = options.width {
        config.canvas.width = width;
    }
    if let Some(height) = options.height {
        config.canvas.height = height;
    }
    if let Some(hz) = options.refresh_hz {
        config.canvas.refresh_hz = hz;
    }
    if let Some(fps) = options.capture_fps {
        config.canvas.capture_fps = fps;
    }
    if let Some(ms) = options.timeslice_ms {
        config.recording.timeslice_ms = ms;
    }
}

/// Read console commands on a plain thread.
///
/// A blocking stdin read cannot be cancelled; on a detached thread it does
/// not hold the runtime open once the session has ended.
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<Command>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("convulse-stdin".to_string())
        .spawn(move || forward_commands(std::io::stdin().lock(), &tx))?;
    Ok(())
}

/// Forward parsed lines until `q`, end of input, or a closed channel.
fn forward_commands(input: impl BufRead, tx: &mpsc::UnboundedSender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                break;
            }
        };
        match parse_command(&line) {
            Some(command) => {
                if tx.send(command).is_err() || command == Command::Shutdown {
                    return;
                }
            }
            None => println!("Unknown command: {}", line.trim()),
        }
    }
    let _ = tx.send(Command::Shutdown);
}

/// Parse one line of console input.
pub fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Some(Command::ToggleRecording);
    };
    let kind = match word {
        "r" => return Some(Command::ToggleRecording),
        "q" => return Some(Command::Shutdown),
        "w" => SourceKind::Webcam,
        "d" => SourceKind::Desktop,
        _ => return None,
    };
    match parts.next() {
        None => Some(Command::CyclePosition(kind)),
        Some(value) => {
            let size = value.parse::<f64>().ok()?;
            if parts.next().is_some() {
                return None;
            }
            Some(Command::SetSize(kind, size))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(""), Some(Command::ToggleRecording));
        assert_eq!(parse_command("  r "), Some(Command::ToggleRecording));
        assert_eq!(parse_command("q"), Some(Command::Shutdown));
        assert_eq!(
            parse_command("w"),
            Some(Command::CyclePosition(SourceKind::Webcam))
        );
        assert_eq!(
            parse_command("d 0.5"),
            Some(Command::SetSize(SourceKind::Desktop, 0.5))
        );
        assert_eq!(parse_command("w big"), None);
        assert_eq!(parse_command("w 0.5 0.6"), None);
        assert_eq!(parse_command("x"), None);
    }

    #[test]
    fn test_forwarding_stops_at_quit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_commands("r\nbogus\nq\nr\n".as_bytes(), &tx);

        assert_eq!(rx.try_recv().ok(), Some(Command::ToggleRecording));
        assert_eq!(rx.try_recv().ok(), Some(Command::Shutdown));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_end_of_input_shuts_down() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_commands("w\n".as_bytes(), &tx);

        assert_eq!(
            rx.try_recv().ok(),
            Some(Command::CyclePosition(SourceKind::Webcam))
        );
        assert_eq!(rx.try_recv().ok(), Some(Command::Shutdown));
    }

    #[test]
    fn test_overrides_replace_config_fields() {
        let mut config = AppConfig::default();
        let options = RunOptions {
            output: Some(PathBuf::from("/tmp/out")),
            width: Some(1280),
            height: None,
            refresh_hz: None,
            capture_fps: Some(24),
            timeslice_ms: Some(100),
            webcam: true,
            desktop: true,
            persist: false,
        };
        apply_overrides(&mut config, &options);

        assert_eq!(config.recording.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.canvas.width, 1280);
        assert_eq!(config.canvas.height, 1080);
        assert_eq!(config.canvas.capture_fps, 24);
        assert_eq!(config.recording.timeslice_ms, 100);
    }
}
