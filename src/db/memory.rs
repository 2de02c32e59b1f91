use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{StateStore, StoreKey};

/// In-memory stand-in for the SQLite store, used by tests. Clones share the
/// same backing maps so a test can hand one handle to the app and keep
/// another to inspect what was persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, String>>>,
    settings: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        Ok(self
            .collections
            .lock()
            .expect("store lock")
            .get(key.as_str())
            .cloned())
    }

    fn save(&self, key: StoreKey, json: &str) -> Result<()> {
        self.collections
            .lock()
            .expect("store lock")
            .insert(key.as_str().to_string(), json.to_string());
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.lock().expect("store lock").get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings
            .lock()
            .expect("store lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
