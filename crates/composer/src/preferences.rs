//! Persisted layout preferences.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use convulse_common::error::{ConvulseError, ConvulseResult};
use convulse_platform_core::PreferenceStore;
use convulse_scene_model::{
    LayoutSettings, PositionIndex, SizeFraction, SourceKind, SourceLayout,
};

/// Preference store backed by a flat JSON object of strings.
///
/// A missing file is an empty store; an unreadable one is logged and
/// treated as empty. Every `set` rewrites the whole file.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFilePreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unparsable preferences at {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read preferences at {:?}: {}", path, e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored key.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.values().clone()
    }

    /// Forget every preference and delete the file.
    pub fn reset(&self) -> ConvulseResult<()> {
        self.values().clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn values(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, values: &BTreeMap<String, String>) -> ConvulseResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json).map_err(|e| {
            ConvulseError::preferences(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ConvulseResult<()> {
        let mut values = self.values();
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }
}

/// Read both sources' layout, falling back per key to the defaults.
pub fn load_layout(store: &dyn PreferenceStore) -> LayoutSettings {
    let mut settings = LayoutSettings::default();
    for kind in SourceKind::DRAW_ORDER {
        let default = SourceLayout::default_for(kind);
        let size = store
            .get(kind.size_key())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(SizeFraction::new)
            .unwrap_or(default.size);
        let position = store
            .get(kind.position_key())
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(PositionIndex::new)
            .unwrap_or(default.position);

        settings.set_size(kind, size.get());
        settings.set_position(kind, position);
    }
    settings
}

pub fn persist_size(
    store: &dyn PreferenceStore,
    kind: SourceKind,
    size: SizeFraction,
) -> ConvulseResult<()> {
    store.set(kind.size_key(), &size.to_string())
}

pub fn persist_position(
    store: &dyn PreferenceStore,
    kind: SourceKind,
    position: PositionIndex,
) -> ConvulseResult<()> {
    store.set(kind.position_key(), &position.to_string())
}
