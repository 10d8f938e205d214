//! Local settings stores.
//!
//! A settings store is a small durable key/value map holding user
//! preferences. There is no caching layer: every write is durable when
//! the setter returns.

use crate::error::StoreResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A typed settings value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    /// Boolean flag.
    Bool(bool),
    /// 64-bit integer.
    Long(i64),
    /// Floating point number.
    Float(f64),
    /// Free text.
    Text(String),
}

/// A durable key/value store for preferences.
///
/// Typed getters return the supplied default when the key is absent or
/// holds a value of another type.
pub trait SettingsStore: Send + Sync {
    /// Reads a raw value.
    fn get(&self, key: &str) -> Option<SettingValue>;

    /// Writes a raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be made durable.
    fn set(&self, key: &str, value: SettingValue) -> StoreResult<()>;

    /// Removes a key. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be made durable.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Reads a float, falling back to `default`.
    fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(SettingValue::Float(v)) => v,
            _ => default,
        }
    }

    /// Writes a float.
    fn set_float(&self, key: &str, value: f64) -> StoreResult<()> {
        self.set(key, SettingValue::Float(value))
    }

    /// Reads a boolean, falling back to `default`.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(SettingValue::Bool(v)) => v,
            _ => default,
        }
    }

    /// Writes a boolean.
    fn set_bool(&self, key: &str, value: bool) -> StoreResult<()> {
        self.set(key, SettingValue::Bool(value))
    }

    /// Reads an integer, falling back to `default`.
    fn get_long(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(SettingValue::Long(v)) => v,
            _ => default,
        }
    }

    /// Writes an integer.
    fn set_long(&self, key: &str, value: i64) -> StoreResult<()> {
        self.set(key, SettingValue::Long(value))
    }

    /// Reads a string, if present.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(SettingValue::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Writes a string.
    fn set_string(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set(key, SettingValue::Text(value.to_string()))
    }

    /// Returns true if the key holds any value.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Ephemeral settings held in memory.
///
/// Share one instance (via `Arc`) between engine instances to simulate a
/// restart against the same durable store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<BTreeMap<String, SettingValue>>,
}

impl MemorySettings {
    /// Creates an empty settings store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: SettingValue) -> StoreResult<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Settings persisted as a JSON document on disk.
///
/// The whole map is rewritten on every update via a temporary file and an
/// atomic rename, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: RwLock<BTreeMap<String, SettingValue>>,
}

impl FileSettings {
    /// Opens the settings file at `path`, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, SettingValue>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: SettingValue) -> StoreResult<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut values = self.values.write();
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}
