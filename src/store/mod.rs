//! Persistence for the timer engine.
//!
//! The engine talks to an abstract key-value [`StateStore`] and stores a
//! single record per timer instance. Loading is fail-closed: an absent,
//! unparseable or invalid record yields `None` and a log line, never an
//! error for the caller.

mod error;
mod file;
mod record;

use std::collections::HashMap;
use std::sync::Mutex;

pub use error::{StateError, StoreError};
pub use file::FileStore;
pub use record::{decode_state, encode_state, STATE_FORMAT_VERSION};

use crate::types::TimerEngineState;

/// Default key for the engine record.
pub const DEFAULT_STATE_KEY: &str = "timer";

/// Key-value persistence backend.
pub trait StateStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store, used by default and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Loads the engine record stored under `key`.
///
/// Returns `None` when there is no usable prior state.
pub fn load_state(store: &dyn StateStore, key: &str) -> Option<TimerEngineState> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!("No persisted timer state under {:?}", key);
            return None;
        }
        Err(e) => {
            tracing::warn!("Failed to read timer state {:?}: {}", key, e);
            return None;
        }
    };

    match decode_state(&raw) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!("Discarding corrupt timer state {:?}: {}", key, e);
            None
        }
    }
}

/// Writes the engine record under `key`, logging failures.
///
/// Returns true if the record was written.
pub fn save_state(store: &dyn StateStore, key: &str, state: &TimerEngineState) -> bool {
    let encoded = match encode_state(state) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!("Failed to encode timer state: {}", e);
            return false;
        }
    };

    match store.put(key, &encoded) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to persist timer state {:?}: {}", key, e);
            false
        }
    }
}
