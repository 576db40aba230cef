//! Export of finished recordings.
//!
//! The exporter concatenates a recording's segments in arrival order into
//! one artifact named `<prefix>-<UTC timestamp>.<ext>` and hands it to the
//! injected save trigger.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use convulse_capture_engine::FinishedRecording;
use convulse_common::error::{ConvulseError, ConvulseResult};
use convulse_platform_core::{Artifact, SaveTrigger};

/// Timestamp layout used in artifact names; `-` replaces `:` so the name
/// is valid on every filesystem and still sorts chronologically.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifact {
    /// File name the artifact was saved under.
    pub file_name: String,

    /// Where the save trigger put it.
    pub location: PathBuf,

    /// Container/codec of the payload.
    pub mime_type: String,

    /// Payload size.
    pub bytes: usize,

    /// Number of segments concatenated.
    pub segments: usize,

    /// Recording length in seconds.
    pub duration_secs: f64,
}

/// File extension for a MIME type, ignoring any parameters.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

/// Artifact file name for a recording exported at `now`.
pub fn artifact_file_name(prefix: &str, now: DateTime<Utc>, mime_type: &str) -> String {
    format!(
        "{prefix}-{}.{}",
        now.format(FILE_TIMESTAMP_FORMAT),
        extension_for_mime(mime_type)
    )
}

/// Turns finished recordings into saved artifacts.
pub struct Exporter {
    prefix: String,
    save: Arc<dyn SaveTrigger>,
}

impl Exporter {
    pub fn new(prefix: impl Into<String>, save: Arc<dyn SaveTrigger>) -> Self {
        Self {
            prefix: prefix.into(),
            save,
        }
    }

    /// Concatenate the segments and save them.
    pub fn export(
        &self,
        recording: FinishedRecording,
        now: DateTime<Utc>,
    ) -> ConvulseResult<SavedArtifact> {
        if recording.is_empty() {
            tracing::warn!(recording_id = recording.id, "Exporting a recording with no data");
        }

        let segments = recording.segments.len();
        let mut bytes = Vec::with_capacity(recording.total_bytes());
        for segment in &recording.segments {
            bytes.extend_from_slice(segment);
        }

        let artifact = Artifact {
            file_name: artifact_file_name(&self.prefix, now, &recording.mime_type),
            mime_type: recording.mime_type,
            bytes,
        };
        let location = self.save.save(&artifact)?;

        tracing::info!(
            recording_id = recording.id,
            path = %location.display(),
            segments,
            bytes = artifact.bytes.len(),
            "Recording exported"
        );

        Ok(SavedArtifact {
            file_name: artifact.file_name,
            location,
            mime_type: artifact.mime_type,
            bytes: artifact.bytes.len(),
            segments,
            duration_secs: recording.duration_secs,
        })
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Saves artifacts into a directory, never overwriting an existing file.
#[derive(Debug, Clone)]
pub struct FileSaveTrigger {
    output_dir: PathBuf,
}

impl FileSaveTrigger {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl SaveTrigger for FileSaveTrigger {
    fn save(&self, artifact: &Artifact) -> ConvulseResult<PathBuf> {
        if artifact.file_name.contains(['/', '\\']) || artifact.file_name.is_empty() {
            return Err(ConvulseError::export(format!(
                "Invalid artifact name: {:?}",
                artifact.file_name
            )));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(&artifact.file_name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ConvulseError::FileExists { path });
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&artifact.bytes)?;
        file.sync_all()?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recording(segments: &[&[u8]]) -> FinishedRecording {
        FinishedRecording {
            id: 1,
            mime_type: "video/webm".to_string(),
            segments: segments.iter().map(|s| s.to_vec()).collect(),
            started_at: Utc::now(),
            duration_secs: 1.5,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 5).unwrap()
    }

    #[test]
    fn test_artifact_name_is_timestamped_and_filename_safe() {
        let name = artifact_file_name("convulse", noon(), "video/webm");
        assert_eq!(name, "convulse-2026-03-14T12-00-05.000Z.webm");
        assert!(!name.contains(':'));
    }

    #[test]
    fn test_extension_follows_mime() {
        assert_eq!(extension_for_mime("video/webm;codecs=vp8"), "webm");
        assert_eq!(extension_for_mime("video/mp4"), "mp4");
        assert_eq!(extension_for_mime("video/x-matroska"), "mkv");
        assert_eq!(extension_for_mime("application/octet-stream"), "bin");
    }

    #[test]
    fn test_export_concatenates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new("convulse", Arc::new(FileSaveTrigger::new(dir.path())));

        let saved = exporter.export(recording(&[b"ab", b"c", b"def"]), noon()).unwrap();
        assert_eq!(saved.bytes, 6);
        assert_eq!(saved.segments, 3);
        assert_eq!(std::fs::read(&saved.location).unwrap(), b"abcdef");
        assert_eq!(saved.location, dir.path().join(&saved.file_name));
    }

    #[test]
    fn test_save_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new("convulse", Arc::new(FileSaveTrigger::new(dir.path())));

        exporter.export(recording(&[b"first"]), noon()).unwrap();
        let err = exporter.export(recording(&[b"second"]), noon()).unwrap_err();
        assert!(matches!(err, ConvulseError::FileExists { .. }));

        let path = dir.path().join(artifact_file_name("convulse", noon(), "video/webm"));
        assert_eq!(std::fs::read(path).unwrap(), b"first");
    }

    #[test]
    fn test_save_creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let trigger = FileSaveTrigger::new(&nested);
        let artifact = Artifact {
            file_name: "clip.webm".to_string(),
            mime_type: "video/webm".to_string(),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(trigger.save(&artifact).unwrap(), nested.join("clip.webm"));
    }

    #[test]
    fn test_save_rejects_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        let trigger = FileSaveTrigger::new(dir.path());
        let artifact = Artifact {
            file_name: "../escape.webm".to_string(),
            mime_type: "video/webm".to_string(),
            bytes: Vec::new(),
        };
        assert!(trigger.save(&artifact).is_err());
    }
}
