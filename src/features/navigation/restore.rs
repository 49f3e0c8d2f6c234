//! Sends a user back to their last page after a reload.
//!
//! Restoration is considered once per controller (one page load) after auth
//! loading settles, and acts at most once per tab session: the
//! `pageRestored` flag is set on every reload that reaches the decision,
//! whether or not it navigated.

use super::{is_trackable, Navigator, LAST_VISITED_PAGE, PAGE_RESTORED_KEY};
use crate::{features::navigation::routes::HOME_PATH, storage::{CookieJar, SessionStorage}};
use std::{fmt, str::FromStr, sync::Arc, time::Duration};
use tracing::debug;

/// Delay between deciding to restore and navigating.
pub const RESTORE_DELAY: Duration = Duration::from_millis(50);

/// How the current page load started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationType {
    Navigate,
    Reload,
    BackForward,
    Prerender,
}

impl FromStr for NavigationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "navigate" => Ok(Self::Navigate),
            "reload" => Ok(Self::Reload),
            "back_forward" => Ok(Self::BackForward),
            "prerender" => Ok(Self::Prerender),
            other => Err(format!("unknown navigation type: {other}")),
        }
    }
}

impl fmt::Display for NavigationType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Navigate => "navigate",
            Self::Reload => "reload",
            Self::BackForward => "back_forward",
            Self::Prerender => "prerender",
        };
        formatter.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestoreDecision {
    /// Auth is still loading; ask again later.
    Waiting,
    /// This controller already decided.
    AlreadyChecked,
    Restore(String),
    Skip,
}

pub struct PageRestorer {
    cookies: Arc<CookieJar>,
    session: Arc<dyn SessionStorage>,
    has_restored: bool,
    delay: Duration,
}

impl PageRestorer {
    pub fn new(cookies: Arc<CookieJar>, session: Arc<dyn SessionStorage>) -> Self {
        Self {
            cookies,
            session,
            has_restored: false,
            delay: RESTORE_DELAY,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Decides and records the flags, without navigating.
    pub fn decide(
        &mut self,
        auth_loading: bool,
        navigation: NavigationType,
        current_path: &str,
    ) -> RestoreDecision {
        if auth_loading {
            return RestoreDecision::Waiting;
        }
        if self.has_restored {
            return RestoreDecision::AlreadyChecked;
        }
        self.has_restored = true;

        let saved = self.cookies.get(LAST_VISITED_PAGE);
        let is_reload = navigation == NavigationType::Reload;
        let already_restored = self.session.get_item(PAGE_RESTORED_KEY).is_some();
        debug!(
            saved = saved.as_deref(),
            current_path,
            %navigation,
            already_restored,
            "checking page restoration"
        );

        match saved {
            Some(saved)
                if is_reload
                    && !already_restored
                    && is_trackable(&saved)
                    && (saved != current_path || current_path == HOME_PATH) =>
            {
                self.session.set_item(PAGE_RESTORED_KEY, "true");
                RestoreDecision::Restore(saved)
            }
            _ => {
                if is_reload {
                    self.session.set_item(PAGE_RESTORED_KEY, "true");
                }
                RestoreDecision::Skip
            }
        }
    }

    /// Decides, then after the restore delay replaces the current history
    /// entry with the saved page when restoring.
    pub async fn run(
        &mut self,
        auth_loading: bool,
        navigation: NavigationType,
        navigator: &dyn Navigator,
    ) -> RestoreDecision {
        let current_path = navigator.current_path();
        let decision = self.decide(auth_loading, navigation, &current_path);
        if let RestoreDecision::Restore(path) = &decision {
            tokio::time::sleep(self.delay).await;
            debug!(path, from = current_path, "restoring last page");
            navigator.navigate(path, true);
        }
        decision
    }
}
