//! Turns API failures from the sign-in endpoints into user-facing failures.

use crate::client::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid login or password. Please try again.";
pub const MALFORMED_LOGIN_MESSAGE: &str = "Invalid data format. Check your email and password.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub const LOGIN_FAILED_MESSAGE: &str = "Incorrect password. Please try again.";
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed. Please try again.";
pub const ACCOUNT_EXISTS_MESSAGE: &str =
    "An account with this email already exists. Try signing in or use a different email.";

/// Error code a backend sends for duplicate accounts.
pub const ACCOUNT_EXISTS_CODE: &str = "account_exists";

/// Phrasings matched when the backend sends no structured code.
const ACCOUNT_EXISTS_PHRASES: [&str; 3] =
    ["уже зарегистрирован", "already exists", "already registered"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidCredentials,
    MalformedRequest,
    AccountExists,
    FieldValidation,
    Network,
    ServerError,
    Timeout,
    Cancelled,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_account_exists(&self) -> bool {
        self.kind == FailureKind::AccountExists
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

/// Maps a failed login: 401 and 400 get fixed messages, anything else keeps
/// the server's `error` text or the transport message.
#[must_use]
pub fn classify_login_error(err: &ApiError) -> Failure {
    match err {
        ApiError::Http { status: 401, .. } => {
            Failure::new(FailureKind::InvalidCredentials, INVALID_CREDENTIALS_MESSAGE)
        }
        ApiError::Http { status: 400, .. } => {
            Failure::new(FailureKind::MalformedRequest, MALFORMED_LOGIN_MESSAGE)
        }
        ApiError::Http { status, .. } if *status >= 500 => {
            Failure::new(FailureKind::ServerError, SERVER_ERROR_MESSAGE)
        }
        ApiError::Http {
            message, details, ..
        } => {
            let server_error = details
                .as_ref()
                .and_then(|value| value.get("error"))
                .and_then(Value::as_str);
            match server_error {
                Some(text) => Failure::new(FailureKind::Other, text),
                None if message.is_empty() => {
                    Failure::new(FailureKind::Other, LOGIN_FAILED_MESSAGE)
                }
                None => Failure::new(FailureKind::Other, message.clone()),
            }
        }
        other => transport_failure(other),
    }
}

/// Maps a failed registration. Duplicate accounts are recognized by a
/// structured `code` first, then by known phrasings in the email/username
/// field, the first field, or a bare string body.
#[must_use]
pub fn classify_register_error(err: &ApiError) -> Failure {
    match err {
        ApiError::Http { status, .. } if *status >= 500 => {
            Failure::new(FailureKind::ServerError, SERVER_ERROR_MESSAGE)
        }
        ApiError::Http {
            message, details, ..
        } => match details {
            Some(Value::Object(fields)) => classify_fields(fields),
            Some(Value::String(text)) => from_message(text),
            _ if message.is_empty() => Failure::new(FailureKind::Other, REGISTRATION_FAILED_MESSAGE),
            _ => from_message(message),
        },
        other => transport_failure(other),
    }
}

fn classify_fields(fields: &serde_json::Map<String, Value>) -> Failure {
    if fields.get("code").and_then(Value::as_str) == Some(ACCOUNT_EXISTS_CODE) {
        return Failure::new(FailureKind::AccountExists, ACCOUNT_EXISTS_MESSAGE);
    }

    let identity = fields.get("email").or_else(|| fields.get("username"));
    let field = identity.or_else(|| fields.values().next());
    let Some(field_error) = field.and_then(FieldError::from_value) else {
        return Failure::new(FailureKind::Other, REGISTRATION_FAILED_MESSAGE);
    };

    if field_error.code == Some(ACCOUNT_EXISTS_CODE) || mentions_existing_account(field_error.message)
    {
        Failure::new(FailureKind::AccountExists, ACCOUNT_EXISTS_MESSAGE)
    } else {
        Failure::new(FailureKind::FieldValidation, field_error.message)
    }
}

fn from_message(text: &str) -> Failure {
    if mentions_existing_account(text) {
        Failure::new(FailureKind::AccountExists, ACCOUNT_EXISTS_MESSAGE)
    } else {
        Failure::new(FailureKind::Other, text)
    }
}

fn transport_failure(err: &ApiError) -> Failure {
    let kind = match err {
        ApiError::Network(_) => FailureKind::Network,
        ApiError::Timeout(_) => FailureKind::Timeout,
        ApiError::Cancelled => FailureKind::Cancelled,
        _ => FailureKind::Other,
    };
    Failure::new(kind, err.to_string())
}

fn mentions_existing_account(message: &str) -> bool {
    let lowered = message.to_lowercase();
    ACCOUNT_EXISTS_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// One field's first error: a string, or `{message, code}`, possibly inside a list.
struct FieldError<'a> {
    message: &'a str,
    code: Option<&'a str>,
}

impl<'a> FieldError<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.first().and_then(FieldError::from_value),
            Value::String(message) => Some(Self {
                message,
                code: None,
            }),
            Value::Object(object) => Some(Self {
                message: object.get("message").and_then(Value::as_str)?,
                code: object.get("code").and_then(Value::as_str),
            }),
            _ => None,
        }
    }
}
