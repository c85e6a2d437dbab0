//! Key-value persistence collaborator.
//!
//! Handlers that need to remember small pieces of session state (the entity
//! id assigned at login, for instance) talk to a [`KeyValueStore`] rather
//! than to a concrete backend, so tests can substitute a mock.

use std::collections::HashMap;

use parking_lot::Mutex;

/// String-keyed persistence used by handlers.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.  Returns `false` if the backend refused
    /// the write.
    fn set(&self, key: &str, value: &str) -> bool;

    /// Removes `key`.  Removing an absent key is not an error.
    fn delete(&self, key: &str);
}

/// Process-local [`KeyValueStore`]; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
