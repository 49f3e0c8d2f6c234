//! Email-then-password step machine shared by the login and registration flows.
//!
//! The persisted part is one [`FlowState`] JSON value per flow under its own
//! session-storage key. A server failure is kept together with the email it
//! was raised for, and is dropped the moment the email changes.

use super::{
    email::{validate_email, EmailError},
    errors::Failure,
};
use crate::storage::SessionStorage;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tracing::debug;

pub const LOGIN_FLOW_KEY: &str = "login_flow";
pub const REGISTER_FLOW_KEY: &str = "register_flow";
pub const FLOW_STATE_VERSION: u32 = 1;

/// Pause between a prefilled email and the automatic move to the password step.
pub const PREFILL_SETTLE: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Email,
    Password,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub version: u32,
    pub step: Step,
    pub email: String,
    #[serde(default)]
    pub error: Option<Failure>,
    #[serde(default)]
    pub error_email: String,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            version: FLOW_STATE_VERSION,
            step: Step::Email,
            email: String::new(),
            error: None,
            error_email: String::new(),
        }
    }
}

impl FlowState {
    /// True when the last failure was a duplicate-account rejection.
    #[must_use]
    pub fn account_exists(&self) -> bool {
        self.error.as_ref().is_some_and(Failure::is_account_exists)
    }

    fn clear_error(&mut self) {
        self.error = None;
        self.error_email.clear();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowError {
    InvalidEmail(EmailError),
    EmptyPassword,
    PasswordTooShort { min: usize },
    WrongStep(Step),
    Rejected(Failure),
}

impl fmt::Display for FlowError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::InvalidEmail(error) => write!(formatter, "{error}"),
            FlowError::EmptyPassword => write!(formatter, "Please enter your password."),
            FlowError::PasswordTooShort { min } => {
                write!(formatter, "Password must be at least {min} characters.")
            }
            FlowError::WrongStep(step) => write!(formatter, "Not available on the {step:?} step."),
            FlowError::Rejected(failure) => write!(formatter, "{failure}"),
        }
    }
}

impl std::error::Error for FlowError {}

/// Reads and writes one flow's state under a session-storage key.
#[derive(Clone)]
pub struct FlowStore {
    storage: Arc<dyn SessionStorage>,
    key: &'static str,
}

impl FlowStore {
    pub fn new(storage: Arc<dyn SessionStorage>, key: &'static str) -> Self {
        Self { storage, key }
    }

    /// Missing, unreadable or other-version values yield a fresh state.
    #[must_use]
    pub fn load(&self) -> FlowState {
        let Some(raw) = self.storage.get_item(self.key) else {
            return FlowState::default();
        };
        match serde_json::from_str::<FlowState>(&raw) {
            Ok(state) if state.version == FLOW_STATE_VERSION => state,
            Ok(state) => {
                debug!(key = self.key, version = state.version, "discarding flow state");
                FlowState::default()
            }
            Err(err) => {
                debug!(key = self.key, "unreadable flow state: {err}");
                FlowState::default()
            }
        }
    }

    pub fn save(&self, state: &FlowState) {
        match serde_json::to_string(state) {
            Ok(raw) => self.storage.set_item(self.key, &raw),
            Err(err) => debug!(key = self.key, "failed to encode flow state: {err}"),
        }
    }

    pub fn clear(&self) {
        self.storage.remove_item(self.key);
    }
}

/// Step machine plus the in-memory password. The login and registration
/// flows wrap this and add their own submit.
pub(crate) struct StepFlow {
    store: FlowStore,
    state: FlowState,
    password: Option<SecretString>,
}

impl StepFlow {
    /// Loads persisted state. A stored failure is kept in memory for this
    /// view but removed from storage, so it shows once.
    pub(crate) fn resume(storage: Arc<dyn SessionStorage>, key: &'static str) -> Self {
        let store = FlowStore::new(storage, key);
        let state = store.load();
        if state.error.is_some() {
            let mut persisted = state.clone();
            persisted.clear_error();
            store.save(&persisted);
        }
        Self {
            store,
            state,
            password: None,
        }
    }

    pub(crate) fn state(&self) -> &FlowState {
        &self.state
    }

    pub(crate) fn email(&self) -> &str {
        &self.state.email
    }

    pub(crate) fn set_email(&mut self, email: &str) {
        self.state.email = email.to_string();
        if self.state.error.is_some() && self.state.email != self.state.error_email {
            self.state.clear_error();
        }
        self.persist();
    }

    pub(crate) fn set_password(&mut self, password: SecretString) {
        self.password = Some(password);
    }

    /// The typed password, or `EmptyPassword`. Only valid on the password step.
    pub(crate) fn password(&self) -> Result<&SecretString, FlowError> {
        if self.state.step != Step::Password {
            return Err(FlowError::WrongStep(self.state.step));
        }
        match &self.password {
            Some(password) if !password.expose_secret().is_empty() => Ok(password),
            _ => Err(FlowError::EmptyPassword),
        }
    }

    pub(crate) fn submit_email(&mut self) -> Result<(), FlowError> {
        if self.state.step != Step::Email {
            return Err(FlowError::WrongStep(self.state.step));
        }
        validate_email(&self.state.email)
            .into_result()
            .map_err(FlowError::InvalidEmail)?;

        if self.state.error_email != self.state.email {
            self.state.clear_error();
        }
        self.state.step = Step::Password;
        self.persist();
        Ok(())
    }

    /// Sets an email handed over by another flow. Valid emails move to the
    /// password step after [`PREFILL_SETTLE`].
    pub(crate) async fn prefill(&mut self, email: &str) -> bool {
        self.state.email = email.trim().to_string();
        self.state.clear_error();
        self.password = None;

        if !validate_email(&self.state.email).is_valid {
            self.state.step = Step::Email;
            self.persist();
            return false;
        }

        self.persist();
        tokio::time::sleep(PREFILL_SETTLE).await;
        self.state.step = Step::Password;
        self.persist();
        true
    }

    pub(crate) fn back(&mut self) {
        self.password = None;
        self.state.clear_error();
        self.state.step = Step::Email;
        self.persist();
    }

    pub(crate) fn clear_password(&mut self) {
        self.password = None;
    }

    /// Keeps `failure` against the current email.
    pub(crate) fn reject(&mut self, failure: Failure) -> FlowError {
        self.state.error_email.clone_from(&self.state.email);
        self.state.error = Some(failure.clone());
        self.persist();
        FlowError::Rejected(failure)
    }

    /// Drops the persisted flow after a successful sign-in.
    pub(crate) fn finish(&mut self) {
        self.password = None;
        self.state = FlowState::default();
        self.store.clear();
    }

    fn persist(&self) {
        self.store.save(&self.state);
    }
}

/// `path?email=<email>` with the email form-encoded.
pub(crate) fn link_with_email(path: &str, email: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
    format!("{path}?email={encoded}")
}
