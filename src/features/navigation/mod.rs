//! Route table, last-page recording and reload restoration.
//!
//! The router itself is abstracted behind [`Navigator`] so the restoration
//! logic can drive a browser history, the terminal front end, or a test.

pub mod recorder;
pub mod restore;
pub mod routes;

pub use recorder::{LastPageRecorder, PageEvent};
pub use restore::{NavigationType, PageRestorer, RestoreDecision};

use std::sync::{Mutex, PoisonError};

/// Cookie holding the last page an authenticated user saw.
pub const LAST_VISITED_PAGE: &str = "lastVisitedPage";

/// Session-storage flag set once restoration has been considered on a reload.
pub const PAGE_RESTORED_KEY: &str = "pageRestored";

/// Paths never recorded nor restored.
pub const EXCLUDED_PREFIXES: [&str; 3] = ["/login", "/register", "/admin-panel"];

#[must_use]
pub fn is_trackable(path: &str) -> bool {
    !path.is_empty() && !EXCLUDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    /// Moves to `path`, overwriting the current history entry when `replace` is set.
    fn navigate(&self, path: &str, replace: bool);
}

/// In-process history stack.
#[derive(Debug)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    #[must_use]
    pub fn new(start: &str) -> Self {
        Self {
            entries: Mutex::new(vec![start.to_string()]),
        }
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for History {
    fn current_path(&self) -> String {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| routes::HOME_PATH.to_string())
    }

    fn navigate(&self, path: &str, replace: bool) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if replace {
            entries.pop();
        }
        entries.push(path.to_string());
    }
}
