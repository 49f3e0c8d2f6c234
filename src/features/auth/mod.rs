//! Auth feature: session state, route guarding and the two-step sign-in flows.
//!
//! Flow overview: both login and registration ask for an email first and a
//! password second. The step, the email and the last server-side failure are
//! persisted per tab in one versioned [`flow::FlowState`] so a reload resumes
//! where the user was. Passwords stay in memory as `SecretString` and are
//! exposed only when the request body is built; never log them.

pub mod client;
pub mod email;
pub mod errors;
pub mod flow;
pub mod guards;
pub mod login;
pub mod register;
pub mod state;
pub mod types;

pub use email::{validate_email, EmailError, EmailValidation};
pub use errors::{Failure, FailureKind};
pub use flow::{FlowError, FlowState, Step};
pub use guards::{guard, AuthStatus, GuardDecision, GuardInput, Redirect};
pub use login::LoginFlow;
pub use register::RegisterFlow;
pub use state::AuthSession;
pub use types::{Registration, User};
