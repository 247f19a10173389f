// src/storage.rs

use crate::errors::PersistenceError;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

/// Durable named slots, each holding one JSON document.
pub trait SlotStore: Send {
    fn read(&self, slot: &str) -> Result<Option<String>, PersistenceError>;
    fn write(&self, slot: &str, contents: &str) -> Result<(), PersistenceError>;
    fn remove(&self, slot: &str) -> Result<(), PersistenceError>;
}

/// Reads and decodes a slot. A missing slot is `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn SlotStore,
    slot: &str,
) -> Result<Option<T>, PersistenceError> {
    match store.read(slot)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PersistenceError::Parse {
                slot: slot.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn SlotStore,
    slot: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string(value).map_err(|source| PersistenceError::Parse {
        slot: slot.to_string(),
        source,
    })?;
    store.write(slot, &raw)
}

/// One `<slot>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }

    fn io_error(slot: &str, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            slot: slot.to_string(),
            source,
        }
    }
}

impl SlotStore for FileStore {
    fn read(&self, slot: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(slot)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(slot, e)),
        }
    }

    fn write(&self, slot: &str, contents: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(slot, e))?;
        let target = self.path_for(slot);
        let tmp = self.dir.join(format!(".{}.json.tmp", slot));
        fs::write(&tmp, contents).map_err(|e| Self::io_error(slot, e))?;
        fs::rename(&tmp, &target).map_err(|e| Self::io_error(slot, e))
    }

    fn remove(&self, slot: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(slot, e)),
        }
    }
}

/// In-process slots. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<String> {
        self.lock().get(slot).cloned()
    }

    pub fn insert(&self, slot: &str, contents: &str) {
        self.lock().insert(slot.to_string(), contents.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still usable; slots are whole strings.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SlotStore for MemoryStore {
    fn read(&self, slot: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.get(slot))
    }

    fn write(&self, slot: &str, contents: &str) -> Result<(), PersistenceError> {
        self.insert(slot, contents);
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), PersistenceError> {
        self.lock().remove(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_missing_slot_is_none() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.read("active_chat").unwrap(), None);
    }

    #[test]
    fn test_file_store_write_read_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        store.write("chat_history", "[]").unwrap();
        assert_eq!(store.read("chat_history").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("nested").join("chat_history.json").exists());

        store.remove("chat_history").unwrap();
        assert_eq!(store.read("chat_history").unwrap(), None);
        // removing twice is fine
        store.remove("chat_history").unwrap();
    }

    #[test]
    fn test_load_json_reports_parse_errors() {
        let store = MemoryStore::new();
        store.insert("active_chat", "{not json");
        let err = load_json::<Vec<String>>(&store, "active_chat").unwrap_err();
        assert!(matches!(err, PersistenceError::Parse { .. }));
    }

    #[test]
    fn test_save_then_load_json() {
        let store = MemoryStore::new();
        save_json(&store, "slot", &vec!["a", "b"]).unwrap();
        let loaded: Option<Vec<String>> = load_json(&store, "slot").unwrap();
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
