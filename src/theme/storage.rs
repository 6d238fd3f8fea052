//! Key-value persistence for user preferences.
//!
//! The file store keeps a flat JSON object on disk and rewrites it whole on
//! every mutation.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::{debug, warn};

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Map<String, Value> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("Ignoring non-object state in {}", self.path.display());
                Map::new()
            }
            Err(e) => {
                warn!("Failed to parse {}: {e}", self.path.display());
                Map::new()
            }
        }
    }

    fn write(&self, state: &Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create state dir {}: {e}", parent.display());
                return;
            }
        }
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize state: {e}");
                return;
            }
        };
        match fs::write(&self.path, json) {
            Ok(()) => debug!("Saved state to {}", self.path.display()),
            Err(e) => warn!("Failed to write {}: {e}", self.path.display()),
        }
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read()
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) {
        let mut state = self.read();
        state.insert(key.to_string(), Value::String(value.to_string()));
        self.write(&state);
    }

    fn remove(&self, key: &str) {
        let mut state = self.read();
        if state.remove(key).is_some() {
            self.write(&state);
        }
    }
}

/// In-process store for `theme.persist: false`; choices last until exit.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"other": "kept"}"#).unwrap();

        let store = FileStore::new(path.clone());
        assert_eq!(store.get("theme"), None);

        store.set("theme", "dark");
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
        assert_eq!(store.get("other").as_deref(), Some("kept"));

        store.remove("theme");
        assert_eq!(store.get("theme"), None);
        assert_eq!(store.get("other").as_deref(), Some("kept"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(path);
        assert_eq!(store.get("theme"), None);
        store.set("theme", "light");
        assert_eq!(store.get("theme").as_deref(), Some("light"));
    }
}
