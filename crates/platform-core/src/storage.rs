//! Save trigger and preference store capabilities.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use convulse_common::error::ConvulseResult;

/// A finished recording ready to be handed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Suggested file name.
    pub file_name: String,

    /// Container/codec identifier.
    pub mime_type: String,

    /// Complete file contents.
    pub bytes: Vec<u8>,
}

/// Persists an artifact in the user's environment ("download").
pub trait SaveTrigger: Send + Sync {
    /// Save the artifact and return where it ended up.
    fn save(&self, artifact: &Artifact) -> ConvulseResult<PathBuf>;
}

/// Key/value store for layout preferences.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> ConvulseResult<()>;
}

/// Preferences that live only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ConvulseResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trips_values() {
        let store = MemoryPreferenceStore::new();
        assert_eq!(store.get("webcam_pos"), None);
        store.set("webcam_pos", "5").unwrap();
        assert_eq!(store.get("webcam_pos").as_deref(), Some("5"));
    }
}
