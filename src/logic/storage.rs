//! Local Storage
//!
//! A key/value store shaped like the browser's extension storage: each key
//! holds one flat JSON record and the last write wins. `StateStore` layers
//! typed load/mutate/persist helpers on top so components never touch raw
//! JSON and never share ambient globals.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::client::types::Prediction;
use super::error::PhishGuardError;
use super::state::{ApiConfig, ExtensionState, UsageStats};
use crate::constants::keys;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Corrupt record '{key}': {message}")]
    Corrupt { key: String, message: String },
}

impl From<StorageError> for PhishGuardError {
    fn from(e: StorageError) -> Self {
        PhishGuardError::unknown(e.to_string())
    }
}

// ============================================================================
// BACKENDS
// ============================================================================

/// Raw key/value storage
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, used by tests and short-lived tools
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.records.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records.write().remove(key);
        Ok(())
    }
}

/// All records in one pretty-printed JSON object on disk
pub struct JsonFileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default storage file under the data directory
    pub fn default_path() -> PathBuf {
        crate::constants::get_data_dir().join("storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let data = fs::read(&self.path)?;
        if data.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Map::new());
        }

        // An unreadable file is replaced on the next write
        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                log::warn!("{:?} is not a JSON object, starting from empty storage", self.path);
                Ok(Map::new())
            }
            Err(e) => {
                log::warn!("{:?} is corrupt ({}), starting from empty storage", self.path, e);
                Ok(Map::new())
            }
        }
    }

    fn write_all(&self, records: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;
        records.insert(key.to_string(), value);
        self.write_all(&records)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;
        if records.remove(key).is_some() {
            self.write_all(&records)?;
        }
        Ok(())
    }
}

// ============================================================================
// TYPED STORE
// ============================================================================

/// Typed access to the persisted records
#[derive(Clone)]
pub struct StateStore {
    backend: Arc<dyn Storage>,
}

impl StateStore {
    pub fn new(backend: Arc<dyn Storage>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let storage = JsonFileStorage::new(path);
        log::debug!("Using storage file {:?}", storage.path());
        Self::new(Arc::new(storage))
    }

    fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    fn set_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StorageError> {
        self.backend.set(key, serde_json::to_value(record)?)
    }

    /// Write install-time defaults for records that do not exist yet
    pub fn initialize(&self) -> Result<(), StorageError> {
        if self.get_record::<ExtensionState>(keys::STATE)?.is_none() {
            self.save_state(&ExtensionState::default())?;
            log::info!("Initialized extension state with defaults");
        }

        let mut stats = self.load_stats()?;
        if stats.time_installed.is_none() {
            stats.time_installed = Some(Utc::now());
            self.save_stats(&stats)?;
        }
        Ok(())
    }

    // --- extension state ---

    pub fn load_state(&self) -> Result<ExtensionState, StorageError> {
        Ok(self.get_record(keys::STATE)?.unwrap_or_default())
    }

    pub fn save_state(&self, state: &ExtensionState) -> Result<(), StorageError> {
        self.set_record(keys::STATE, state)
    }

    /// Load, mutate and persist the extension state in one step
    pub fn update_state<F>(&self, mutate: F) -> Result<ExtensionState, StorageError>
    where
        F: FnOnce(&mut ExtensionState),
    {
        let mut state = self.load_state()?;
        mutate(&mut state);
        self.save_state(&state)?;
        Ok(state)
    }

    // --- usage statistics ---

    pub fn load_stats(&self) -> Result<UsageStats, StorageError> {
        Ok(self.get_record(keys::STATS)?.unwrap_or_default())
    }

    pub fn save_stats(&self, stats: &UsageStats) -> Result<(), StorageError> {
        self.set_record(keys::STATS, stats)
    }

    pub fn update_stats<F>(&self, mutate: F) -> Result<UsageStats, StorageError>
    where
        F: FnOnce(&mut UsageStats),
    {
        let mut stats = self.load_stats()?;
        mutate(&mut stats);
        self.save_stats(&stats)?;
        Ok(stats)
    }

    /// Fold a verdict into both the extension state and the usage stats
    pub fn record_verdict(&self, prediction: Prediction, at: DateTime<Utc>) -> Result<(), StorageError> {
        if !prediction.is_verdict() {
            return Ok(());
        }
        self.update_state(|state| {
            state.record_scan(prediction, at);
        })?;
        self.update_stats(|stats| stats.record_scan(prediction))?;
        Ok(())
    }

    // --- API configuration ---

    pub fn load_config(&self) -> Result<Option<ApiConfig>, StorageError> {
        self.get_record(keys::CONFIG)
    }

    pub fn save_config(&self, config: &ApiConfig) -> Result<(), StorageError> {
        self.set_record(keys::CONFIG, config)
    }

    // --- auth token ---

    pub fn load_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .get_record::<String>(keys::AUTH_TOKEN)?
            .filter(|t| !t.is_empty()))
    }

    pub fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.set_record(keys::AUTH_TOKEN, &token)
    }

    pub fn clear_token(&self) -> Result<(), StorageError> {
        self.backend.remove(keys::AUTH_TOKEN)
    }
}

// ============================================================================
// TESTS
// ============================================================================
