//! Writes `lastVisitedPage` while a signed-in user moves around.

use super::{is_trackable, LAST_VISITED_PAGE};
use crate::storage::CookieJar;
use std::sync::Arc;
use tracing::debug;

/// Moments the current path is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageEvent {
    PathChanged,
    BeforeUnload,
    PageHide,
}

#[derive(Clone)]
pub struct LastPageRecorder {
    cookies: Arc<CookieJar>,
}

impl LastPageRecorder {
    #[must_use]
    pub fn new(cookies: Arc<CookieJar>) -> Self {
        Self { cookies }
    }

    /// Records `path` for signed-in users on trackable paths. Returns whether
    /// the cookie was written.
    pub fn record(&self, event: PageEvent, path: &str, is_authenticated: bool) -> bool {
        if !is_authenticated || !is_trackable(path) {
            return false;
        }
        self.cookies.set(LAST_VISITED_PAGE, path, None);
        debug!(?event, path, "last visited page saved");
        true
    }
}
