//! API endpoint configuration. Values are public; do not store secrets here.

use super::errors::ApiError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Default request timeout applied to every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Builds a config for `api_base_url` with the default timeout.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the URL is empty or cannot be parsed.
    pub fn new(api_base_url: &str) -> Result<Self, ApiError> {
        let normalized = normalize_base_url(api_base_url)
            .ok_or_else(|| ApiError::Config("API base URL is not configured.".to_string()))?;
        let api_base_url = Url::parse(&normalized)
            .map_err(|err| ApiError::Config(format!("Invalid API base URL: {err}")))?;

        Ok(Self {
            api_base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves `path` (with or without a leading slash) under the base URL.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.api_base_url
            .join(path.trim().trim_start_matches('/'))
            .map_err(|err| ApiError::Config(format!("Invalid API path {path}: {err}")))
    }
}

/// Trims the value and guarantees a trailing slash so relative joins keep the base path.
fn normalize_base_url(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("{trimmed}/"))
    }
}
