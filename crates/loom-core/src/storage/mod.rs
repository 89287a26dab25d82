//! Key-value persistence for usage history and stream bookkeeping
//!
//! The token tracker treats its store as an opaque durable map from keys to
//! JSON values. Two implementations are provided:
//!
//! - [`MemoryStore`]: process-local, for tests and ephemeral sessions
//! - [`JsonFileStore`]: one pretty-printed JSON object on disk, rewritten
//!   through a temporary file and a rename on every update

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{LoomError, LoomResult};

/// Durable key-value persistence
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    fn get(&self, key: &str) -> LoomResult<Option<Value>>;

    /// Replace the value stored under `key`
    fn update(&self, key: &str, value: Value) -> LoomResult<()>;

    /// Get the value stored under `key`, or `default` when absent
    fn get_or(&self, key: &str, default: Value) -> LoomResult<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> LoomResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn update(&self, key: &str, value: Value) -> LoomResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object file
///
/// The whole object is cached in memory; each update rewrites the file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open a store, loading the file if it exists
    pub fn open(path: impl Into<PathBuf>) -> LoomResult<Self> {
        let path = path.into();
        let entries = Self::load(&path)?;
        debug!(path = %path.display(), keys = entries.len(), "Opened JSON file store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Default store location under the user's data directory
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_default()
            .join("loom")
            .join("usage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> LoomResult<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            LoomError::io_with_path(format!("Failed to read store: {}", e), path.display().to_string())
        })?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(LoomError::storage(format!(
                "{} does not contain a JSON object",
                path.display()
            ))),
            Err(e) => Err(LoomError::storage(format!(
                "Failed to parse {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, entries: &Map<String, Value>) -> LoomResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LoomError::io(format!("Failed to create directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| {
            LoomError::io_with_path(format!("Failed to write store: {}", e), tmp.display().to_string())
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            LoomError::io_with_path(
                format!("Failed to replace store: {}", e),
                self.path.display().to_string(),
            )
        })?;

        debug!(path = %self.path.display(), "Saved JSON file store");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> LoomResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn update(&self, key: &str, value: Value) -> LoomResult<()> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value);
        self.save(&entries)
            .map_err(|e| match e {
                LoomError::Storage { message, .. } => LoomError::storage_key(message, key),
                other => other,
            })
    }
}
