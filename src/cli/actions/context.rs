//! Wiring shared by every action: the persisted cookie jar and tab storage,
//! the API client, the auth session and a toast bus printed to stderr.

use crate::{
    cli::globals::GlobalArgs,
    client::{ApiClient, ClientConfig},
    features::{
        auth::{AuthSession, User},
        notify::{Subscription, ToastBus, ToastEvent},
        query::QueryCache,
    },
    storage::{CookieJar, FileStorage, SessionStorage},
};
use anyhow::{Context as _, Result};
use std::sync::Arc;
use tracing::debug;

pub struct Context {
    pub cookies: Arc<CookieJar>,
    pub session: Arc<dyn SessionStorage>,
    pub auth: AuthSession,
    pub toasts: ToastBus,
    _printer: Subscription,
}

impl Context {
    /// # Errors
    /// Returns an error if the API URL is invalid or the HTTP client cannot be built.
    pub fn open(globals: &GlobalArgs) -> Result<Self> {
        debug!(state_dir = %globals.state_dir.display(), "opening client state");
        let cookies = Arc::new(CookieJar::open(globals.cookies_path()));
        let session: Arc<dyn SessionStorage> =
            Arc::new(FileStorage::open(globals.session_path()));

        let config = ClientConfig::new(&globals.api_url)
            .with_context(|| format!("invalid API URL: {}", globals.api_url))?
            .with_timeout(globals.timeout);
        let api = ApiClient::new(config, Arc::clone(&cookies)).context("failed to build client")?;
        let auth = AuthSession::new(api, Arc::new(QueryCache::new()));

        let toasts = ToastBus::new();
        let printer = toasts.subscribe(|event| {
            if let ToastEvent::Shown(toast) = event {
                eprintln!("[{}] {}", toast.kind, toast.message);
            }
        });

        Ok(Self {
            cookies,
            session,
            auth,
            toasts,
            _printer: printer,
        })
    }

    /// Hydrates the session. Failures are reported as a toast and treated as
    /// signed out.
    pub async fn mount(&self) -> Option<User> {
        match self.auth.mount().await {
            Ok(user) => user,
            Err(err) => {
                self.toasts.error(err.to_string());
                None
            }
        }
    }
}
