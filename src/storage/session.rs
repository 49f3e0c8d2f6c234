//! Tab-scoped key/value storage, the `sessionStorage` of the client.
//!
//! Values are plain strings; structured values (flow state) are encoded by
//! their owners. A tab session ends when the storage is dropped (memory) or
//! its file is deleted (file-backed).

use super::{load_json_map, save_json_map};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
    }

    fn clear(&self) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.clear();
    }
}

/// Session storage persisted as a JSON object, written through on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = load_json_map(&path);
        Self {
            path,
            items: RwLock::new(items),
        }
    }

    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut items);
        save_json_map(&self.path, &items);
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        });
    }

    fn remove_item(&self, key: &str) {
        self.update(|items| {
            items.remove(key);
        });
    }

    fn clear(&self) {
        self.update(BTreeMap::clear);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set_item("pageRestored", "true");
        assert_eq!(storage.get_item("pageRestored").as_deref(), Some("true"));
        storage.remove_item("pageRestored");
        assert_eq!(storage.get_item("pageRestored"), None);
    }

    #[test]
    fn file_storage_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = FileStorage::open(&path);
        storage.set_item("login_flow", "{}");
        storage.set_item("pageRestored", "true");
        storage.remove_item("pageRestored");

        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get_item("login_flow").as_deref(), Some("{}"));
        assert_eq!(reopened.get_item("pageRestored"), None);

        reopened.clear();
        assert_eq!(FileStorage::open(&path).get_item("login_flow"), None);
    }

    #[test]
    fn unreadable_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();

        let storage = FileStorage::open(&path);
        assert_eq!(storage.get_item("anything"), None);
    }
}
