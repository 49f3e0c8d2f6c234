use super::{
    errors::{classify_register_error, Failure},
    flow::{link_with_email, FlowError, FlowState, Step, StepFlow, REGISTER_FLOW_KEY},
    state::AuthSession,
    types::Registration,
};
use crate::{
    features::navigation::routes::{HOME_PATH, LOGIN_PATH},
    storage::SessionStorage,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::debug;

pub const MIN_PASSWORD_CHARS: usize = 8;

/// Two-step account creation: email, then password.
pub struct RegisterFlow {
    auth: AuthSession,
    flow: StepFlow,
}

impl RegisterFlow {
    pub fn resume(auth: AuthSession, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            auth,
            flow: StepFlow::resume(storage, REGISTER_FLOW_KEY),
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

    /// The duplicate-account branch: the UI offers sign-in instead of a retry.
    #[must_use]
    pub fn account_exists(&self) -> bool {
        self.flow.state().account_exists()
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

    /// Fills in an email handed over from sign-in and advances when valid.
    pub async fn prefill(&mut self, email: &str) -> bool {
        self.flow.prefill(email).await
    }

    /// Creates the account with the current email and password.
    ///
    /// # Errors
    /// `EmptyPassword`, `PasswordTooShort` or `WrongStep` before any request;
    /// `Rejected` with the classified failure when the API refuses.
    pub async fn submit_password(&mut self) -> Result<&'static str, FlowError> {
        let registration = {
            let password = self.flow.password()?;
            if password.expose_secret().chars().count() < MIN_PASSWORD_CHARS {
                return Err(FlowError::PasswordTooShort {
                    min: MIN_PASSWORD_CHARS,
                });
            }
            Registration::new(
                self.flow.email(),
                SecretString::from(password.expose_secret().to_owned()),
            )
        };

        match self.auth.register(&registration).await {
            Ok(_) => {
                self.flow.finish();
                Ok(HOME_PATH)
            }
            Err(err) => {
                let failure = classify_register_error(&err);
                debug!(kind = ?failure.kind, "registration rejected");
                Err(self.flow.reject(failure))
            }
        }
    }

    pub fn back(&mut self) {
        self.flow.back();
    }

    /// Offered in the duplicate-account branch: `/login?email=<email>`.
    #[must_use]
    pub fn login_link(&self) -> Option<String> {
        self.account_exists()
            .then(|| link_with_email(LOGIN_PATH, self.flow.email()))
    }
}
