//! Persisted mode preference, keyed the way the host stores its ritual choice.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::types::PlugResult;

/// Storage key for the selected ritual.
pub const MODE_STORAGE_KEY: &str = "tgRitual";

/// Ritual value that selects performance mode.
pub const PERFORMANCE_MODE: &str = "performance";

/// Minimal key/value store.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> PlugResult<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> PlugResult<()>;

    fn remove(&mut self, key: &str) -> PlugResult<()>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> PlugResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> PlugResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PlugResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object on disk. The file is re-read on every access
/// so separate processes see each other's writes.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> PlugResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, values: &BTreeMap<String, String>) -> PlugResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> PlugResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> PlugResult<()> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)?;
        tracing::debug!("Stored {key}={value} in {}", self.path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PlugResult<()> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}
