use super::{
    errors::{classify_login_error, Failure, FailureKind},
    flow::{link_with_email, FlowError, FlowState, Step, StepFlow, LOGIN_FLOW_KEY},
    state::AuthSession,
};
use crate::{
    features::navigation::routes::{HOME_PATH, REGISTER_PATH},
    storage::SessionStorage,
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

/// Two-step sign-in: email, then password.
pub struct LoginFlow {
    auth: AuthSession,
    flow: StepFlow,
}

impl LoginFlow {
    /// Picks up the tab's saved login state, if any.
    pub fn resume(auth: AuthSession, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            auth,
            flow: StepFlow::resume(storage, LOGIN_FLOW_KEY),
        }
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        self.flow.state()
    }

    #[must_use]
    pub fn step(&self) -> Step {
        self.flow.state().step
    }

    #[must_use]
    pub fn email(&self) -> &str {
        self.flow.email()
    }

    #[must_use]
    pub fn error(&self) -> Option<&Failure> {
        self.flow.state().error.as_ref()
    }

    pub fn set_email(&mut self, email: &str) {
        self.flow.set_email(email);
    }

    pub fn set_password(&mut self, password: SecretString) {
        self.flow.set_password(password);
    }

    /// # Errors
    /// `InvalidEmail` with the first failed rule, or `WrongStep`.
    pub fn submit_email(&mut self) -> Result<(), FlowError> {
        self.flow.submit_email()
    }

    /// Fills in an email passed as `?email=` and advances when it is valid.
    pub async fn prefill(&mut self, email: &str) -> bool {
        self.flow.prefill(email).await
    }

    /// Signs in with the current email and password. On success the saved
    /// flow is cleared and the caller should navigate to the returned path.
    ///
    /// # Errors
    /// Local checks fail with `EmptyPassword`/`WrongStep`; a rejected login
    /// returns `Rejected`, clears the password and keeps the failure.
    pub async fn submit_password(&mut self) -> Result<&'static str, FlowError> {
        let result = {
            let password = self.flow.password()?;
            self.auth.login(self.flow.email(), password).await
        };

        match result {
            Ok(_) => {
                self.flow.finish();
                Ok(HOME_PATH)
            }
            Err(err) => {
                let failure = classify_login_error(&err);
                debug!(kind = ?failure.kind, "login rejected");
                self.flow.clear_password();
                Err(self.flow.reject(failure))
            }
        }
    }

    pub fn back(&mut self) {
        self.flow.back();
    }

    /// Offered after bad credentials: `/register?email=<email>`.
    #[must_use]
    pub fn register_link(&self) -> Option<String> {
        let state = self.flow.state();
        let bad_credentials = state
            .error
            .as_ref()
            .is_some_and(|failure| failure.kind == FailureKind::InvalidCredentials);
        (state.step == Step::Password && bad_credentials)
            .then(|| link_with_email(REGISTER_PATH, &state.email))
    }
}
