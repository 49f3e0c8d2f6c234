use serde_json::Value;
use std::fmt;

/// User-facing text for requests that never got a response.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to connect to server. Please check your connection.";

/// User-facing text for requests that hit the client timeout.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

#[derive(Clone, Debug)]
pub enum ApiError {
    Config(String),
    Network(String),
    Timeout(String),
    Cancelled,
    /// Non-2xx response. `details` holds the parsed JSON body when there was one,
    /// so callers can look at field-keyed validation errors.
    Http {
        status: u16,
        message: String,
        details: Option<Value>,
    },
    Parse(String),
    Serialization(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        match self {
            ApiError::Http { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Config(message) => write!(formatter, "Config error: {message}"),
            ApiError::Network(message) => write!(formatter, "Network error: {message}"),
            ApiError::Timeout(message) => write!(formatter, "Timeout: {message}"),
            ApiError::Cancelled => write!(formatter, "Request cancelled."),
            ApiError::Http {
                status, message, ..
            } => {
                write!(formatter, "Request failed ({status}): {message}")
            }
            ApiError::Parse(message) => write!(formatter, "Response error: {message}"),
            ApiError::Serialization(message) => {
                write!(formatter, "Request error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
