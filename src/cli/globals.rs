use std::{path::PathBuf, time::Duration};

pub const COOKIES_FILE: &str = "cookies.json";
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub state_dir: PathBuf,
    pub timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, state_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            api_url,
            state_dir: state_dir.into(),
            timeout,
        }
    }

    /// Cookie jar file; plays the role of the browser's cookie store.
    #[must_use]
    pub fn cookies_path(&self) -> PathBuf {
        self.state_dir.join(COOKIES_FILE)
    }

    /// Session storage file; plays the role of one browser tab.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join(SESSION_FILE)
    }
}
