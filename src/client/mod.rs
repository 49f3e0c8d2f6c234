//! HTTP client for the backend API.
//!
//! Every request goes through [`ApiClient::execute`], which applies the
//! timeout, carries cookies through the shared [`CookieJar`], attaches the
//! CSRF header on mutating verbs and logs 401/403/5xx responses before the
//! error reaches the caller.

pub mod config;
pub mod csrf;
pub mod errors;

pub use config::{ClientConfig, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT};
pub use errors::{ApiError, NETWORK_ERROR_MESSAGE, TIMEOUT_MESSAGE};

use crate::storage::CookieJar;
use csrf::{CsrfBootstrap, CSRF_COOKIE, CSRF_HEADER, CSRF_TOKEN_PATH};
use futures_util::FutureExt;
use reqwest::{header::CONTENT_TYPE, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};
use url::Url;

const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
    cancel: CancellationToken,
}

struct Inner {
    http: Client,
    config: ClientConfig,
    cookies: Arc<CookieJar>,
    csrf: CsrfBootstrap,
}

impl ApiClient {
    /// # Errors
    /// Returns `ApiError::Config` if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig, cookies: Arc<CookieJar>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                cookies,
                csrf: CsrfBootstrap::default(),
            }),
            cancel: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn cookies(&self) -> &Arc<CookieJar> {
        &self.inner.cookies
    }

    /// A handle sharing this client whose requests stop when either this
    /// handle or its parent is cancelled.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: self.cancel.child_token(),
        }
    }

    /// A handle sharing this client whose requests stop when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: token,
        }
    }

    /// Aborts every in-flight request made through this handle (and its children).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// # Errors
    /// Returns an `ApiError` on transport failure, non-2xx status or undecodable body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, path, None).await?;
        decode_json(response).await
    }

    /// Like [`get_json`](Self::get_json) but maps 204, 401 and a JSON `null`
    /// body to `None`.
    ///
    /// # Errors
    /// Returns an `ApiError` for any other failure.
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        match self.execute(Method::GET, path, None).await {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => Ok(None),
            Ok(response) => decode_json::<Option<T>>(response).await,
            Err(err) if err.is_unauthorized() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// # Errors
    /// Returns an `ApiError` if the body cannot be encoded or the request fails.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_body(body)?;
        let response = self.execute(Method::POST, path, Some(payload)).await?;
        decode_json(response).await
    }

    /// POST without a body, discarding the response body.
    ///
    /// # Errors
    /// Returns an `ApiError` if the request fails.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::POST, path, None).await.map(drop)
    }

    /// POST without a body, decoding the JSON response.
    ///
    /// # Errors
    /// Returns an `ApiError` if the request fails or the body is undecodable.
    pub async fn post_empty_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::POST, path, None).await?;
        decode_json(response).await
    }

    /// # Errors
    /// Returns an `ApiError` if the body cannot be encoded or the request fails.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_body(body)?;
        let response = self.execute(Method::PUT, path, Some(payload)).await?;
        decode_json(response).await
    }

    /// # Errors
    /// Returns an `ApiError` if the body cannot be encoded or the request fails.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_body(body)?;
        let response = self.execute(Method::PATCH, path, Some(payload)).await?;
        decode_json(response).await
    }

    /// # Errors
    /// Returns an `ApiError` if the request fails.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, None).await.map(drop)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<Response, ApiError> {
        let url = self.inner.config.endpoint(path)?;
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.dispatch(method, url, body) => result,
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> Result<Response, ApiError> {
        let mut request = self.inner.http.request(method.clone(), url.clone());

        if is_mutating(&method) {
            self.ensure_csrf_token().await;
            if let Some(token) = self.inner.cookies.get(CSRF_COOKIE) {
                request = request.header(CSRF_HEADER, token);
            }
        }

        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let span = info_span!("api.request", http.method = %method, url = %url);
        let response = request
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;
        check_status(response).await
    }

    /// Makes sure a `csrftoken` cookie exists, joining any fetch already in flight.
    /// Failures are logged and the request proceeds without the header.
    async fn ensure_csrf_token(&self) {
        if self.inner.cookies.get(CSRF_COOKIE).is_some() {
            return;
        }
        let url = match self.inner.config.endpoint(CSRF_TOKEN_PATH) {
            Ok(url) => url,
            Err(err) => {
                warn!("csrf token endpoint unavailable: {err}");
                return;
            }
        };

        let http = self.inner.http.clone();
        let fetch = self.inner.csrf.join_or_start(move || {
            async move {
                match http.get(url).send().await {
                    Ok(response) => debug!(status = %response.status(), "csrf token requested"),
                    Err(err) => warn!("csrf token request failed: {err}"),
                }
            }
            .boxed()
        });
        fetch.await;
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body)
        .map_err(|err| ApiError::Serialization(format!("Failed to encode request: {err}")))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::Parse(format!("Failed to decode response: {err}")))
}

fn map_request_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        warn!("request timed out: {err}");
        ApiError::Timeout(TIMEOUT_MESSAGE.to_string())
    } else if err.is_builder() {
        ApiError::Config(format!("Invalid request: {err}"))
    } else {
        warn!("network error, no response from server: {err}");
        ApiError::Network(NETWORK_ERROR_MESSAGE.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let details = serde_json::from_str::<Value>(&body).ok();
    let code = status.as_u16();

    match code {
        401 => warn!(%url, "authentication required"),
        403 => warn!(%url, body = %sanitize_body(&body), "access forbidden"),
        _ if code >= 500 => error!(%url, status = code, body = %sanitize_body(&body), "server error"),
        _ => debug!(%url, status = code, "request rejected"),
    }

    Err(ApiError::Http {
        status: code,
        message: error_message(status, details.as_ref(), &body),
        details,
    })
}

/// Prefers the backend's `error` or `detail` field, then the raw body, then the reason phrase.
fn error_message(status: StatusCode, details: Option<&Value>, body: &str) -> String {
    let field = details.and_then(|value| {
        ["error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
    });
    if let Some(message) = field {
        return message.to_string();
    }

    let sanitized = sanitize_body(body);
    if sanitized.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        sanitized
    }
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_CHARS {
        let truncated: String = trimmed.chars().take(MAX_ERROR_CHARS).collect();
        format!("{truncated}...")
    } else {
        trimmed.to_string()
    }
}
