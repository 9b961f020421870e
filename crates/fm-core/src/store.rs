//! Settings store contract
//!
//! The persistent key-value store (browser `storage.local` in the real
//! deployment) is an external collaborator: the core reads it once at
//! startup and receives change notifications from the host. The only write
//! the core ever performs is the watchdog auto-disable flipping `enabled`
//! off.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings load failed: {0}")]
    Load(String),
    #[error("settings save failed: {0}")]
    Save(String),
}

// =============================================================================
// Store trait
// =============================================================================

pub trait SettingsStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

// =============================================================================
// Change notifications
// =============================================================================

/// Which storage area a change notification came from. The engine only
/// reacts to `Local`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Local,
    Sync,
    Session,
}

/// One changed key with its old and new values.
#[derive(Debug, Clone)]
pub struct KeyChange {
    pub key: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// A batch of changes delivered by the host in one notification.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub area: StorageArea,
    pub changes: Vec<KeyChange>,
}

impl ChangeSet {
    pub fn local(changes: Vec<KeyChange>) -> Self {
        Self {
            area: StorageArea::Local,
            changes,
        }
    }
}

/// Convenience constructor for a single-key change.
pub fn key_change(key: &str, old: Option<Value>, new: Option<Value>) -> KeyChange {
    KeyChange {
        key: key.to_string(),
        old,
        new,
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory store for tests and the CLI harness, with injectable failures
/// to exercise the "load/save errors are logged and survived" paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
    pub fail_loads: bool,
    pub fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.fail_loads {
            return Err(StoreError::Load("injected failure".to_string()));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Save("injected failure".to_string()));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
