//! Client-side persistence: the cookie jar and tab-scoped session storage.
//!
//! Both stores are last-write-wins maps of small scalar values. The file-backed
//! variants write through on every mutation so a crashed process never loses
//! more than the write in progress; I/O failures are logged and otherwise
//! ignored, the same way a browser store is assumed to be always available.

pub mod cookies;
pub mod session;

pub use cookies::{CookieJar, DEFAULT_COOKIE_DAYS};
pub use session::{FileStorage, MemoryStorage, SessionStorage};

use serde::{de::DeserializeOwned, Serialize};
use std::{collections::BTreeMap, fs, io::ErrorKind, path::Path};
use tracing::warn;

/// Reads a JSON object from `path`; a missing or unreadable file yields an empty map.
fn load_json_map<T: DeserializeOwned>(path: &Path) -> BTreeMap<String, T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!("failed to read {}: {err}", path.display());
            return BTreeMap::new();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        warn!("discarding unreadable store {}: {err}", path.display());
        BTreeMap::new()
    })
}

/// Writes `map` as pretty JSON, creating parent directories as needed.
fn save_json_map<T: Serialize>(path: &Path, map: &BTreeMap<String, T>) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!("failed to create {}: {err}", parent.display());
            return;
        }
    }

    match serde_json::to_vec_pretty(map) {
        Ok(bytes) => {
            if let Err(err) = fs::write(path, bytes) {
                warn!("failed to write {}: {err}", path.display());
            }
        }
        Err(err) => warn!("failed to encode {}: {err}", path.display()),
    }
}
