//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConvulseError, ConvulseResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Composed canvas geometry and cadence.
    pub canvas: CanvasConfig,

    /// Default recording settings.
    pub recording: RecordingDefaults,

    /// Capture device settings.
    pub capture: CaptureDefaults,

    /// Where layout preferences are persisted.
    pub preferences_path: PathBuf,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Canvas the two sources are composed onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canvas width in pixels.
    pub width: u32,

    /// Canvas height in pixels.
    pub height: u32,

    /// Compositor cadence (display refresh), in Hz.
    pub refresh_hz: u32,

    /// Rate at which the canvas output is published to the composed stream.
    pub capture_fps: u32,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Container/codec requested from the encoder sink.
    pub mime_type: String,

    /// Interval at which the encoder emits buffered data, in milliseconds.
    pub timeslice_ms: u64,

    /// Prefix of exported file names.
    pub file_prefix: String,

    /// Directory exported recordings are saved into.
    pub output_dir: PathBuf,
}

/// Capture device parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Explicit webcam device node (e.g. `/dev/video2`). Auto-detected when unset.
    pub webcam_device: Option<String>,

    /// Whether the webcam capture also requests microphone audio.
    pub webcam_audio: bool,

    /// Whether the desktop capture embeds the cursor.
    pub show_cursor: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "convulse=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            recording: RecordingDefaults::default(),
            capture: CaptureDefaults::default(),
            preferences_path: config_dir().join("preferences.json"),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            refresh_hz: 60,
            capture_fps: 30,
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            mime_type: "video/webm".to_string(),
            timeslice_ms: 10,
            file_prefix: "convulse".to_string(),
            output_dir: default_download_dir(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            webcam_device: None,
            webcam_audio: true,
            show_cursor: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location.
    ///
    /// A missing file yields the defaults. An unreadable or unparsable file
    /// is an error, so the caller can fall back to defaults and report it
    /// once logging is up.
    pub fn try_load() -> ConvulseResult<Self> {
        Self::from_path(&config_file_path())
    }

    /// Load config from an explicit path.
    pub fn from_path(path: &Path) -> ConvulseResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ConvulseError::config(format!("Failed to parse {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConvulseError::config(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}

fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("convulse")
}

/// Default directory recordings are saved into.
fn default_download_dir() -> PathBuf {
    std::env::var("XDG_DOWNLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join("Downloads"))
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}
