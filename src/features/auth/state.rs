//! Auth session state. The session hydrates once on mount from the
//! current-user endpoint and is replaced wholesale by login, register and
//! logout. The `currentUser` cache entry mirrors it so other readers see the
//! same user without another request.

use crate::{
    client::{ApiClient, ApiError},
    features::{
        auth::{
            client,
            guards::AuthStatus,
            types::{LoginRequest, Registration, User},
        },
        query::{QueryCache, CURRENT_USER_KEY},
    },
};
use secrecy::{ExposeSecret, SecretString};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Duration,
};
use tracing::{debug, info, warn};

/// How long a fetched current user is reused before the next mount refetches it.
pub const CURRENT_USER_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    cache: Arc<QueryCache>,
    user: RwLock<Option<User>>,
    pending: AtomicUsize,
    hydrated: AtomicBool,
}

/// Counts an operation as in flight until dropped, including on cancellation.
struct Pending<'a>(&'a AtomicUsize);

impl<'a> Pending<'a> {
    fn begin(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AuthSession {
    #[must_use]
    pub fn new(api: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                cache,
                user: RwLock::new(None),
                pending: AtomicUsize::new(0),
                hydrated: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.inner.cache
    }

    /// Bootstraps the CSRF cookie (errors ignored) and loads the current
    /// user, reusing a cached copy younger than [`CURRENT_USER_STALE_AFTER`].
    ///
    /// # Errors
    /// Returns the fetch error for anything other than "no session". Loading
    /// ends either way.
    pub async fn mount(&self) -> Result<Option<User>, ApiError> {
        let _pending = Pending::begin(&self.inner.pending);
        let api = &self.inner.api;
        if let Err(err) = client::fetch_csrf_token(api).await {
            debug!("csrf bootstrap failed: {err}");
        }

        let result = self
            .inner
            .cache
            .get_or_fetch(CURRENT_USER_KEY, CURRENT_USER_STALE_AFTER, || {
                client::fetch_current_user(api)
            })
            .await;
        self.inner.hydrated.store(true, Ordering::SeqCst);

        let user = result?;
        debug!(signed_in = user.is_some(), "session hydrated");
        self.set_user(user.clone());
        Ok(user)
    }

    /// # Errors
    /// Propagates the API error; the current user is left unchanged.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<User, ApiError> {
        let _pending = Pending::begin(&self.inner.pending);
        let request = LoginRequest {
            username,
            password: password.expose_secret(),
        };
        let response = client::login(&self.inner.api, &request).await?;

        self.replace_user(&response.user);
        info!(user_id = response.user.id, "signed in");
        Ok(response.user)
    }

    /// Registers and signs in, then refetches the current user so the cached
    /// copy reflects the new session. A failed refetch keeps the registered user.
    ///
    /// # Errors
    /// Propagates the registration error; the current user is left unchanged.
    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        let _pending = Pending::begin(&self.inner.pending);
        let response = client::register(&self.inner.api, &registration.request()).await?;
        self.replace_user(&response.user);
        info!(user_id = response.user.id, "account created");

        self.inner.cache.invalidate(CURRENT_USER_KEY);
        match client::fetch_current_user(&self.inner.api).await {
            Ok(Some(user)) => {
                self.replace_user(&user);
                Ok(user)
            }
            Ok(None) => {
                debug!("session not visible yet after registration");
                self.inner.cache.set_typed(CURRENT_USER_KEY, &Some(&response.user));
                Ok(response.user)
            }
            Err(err) => {
                warn!("current user refresh after registration failed: {err}");
                self.inner.cache.set_typed(CURRENT_USER_KEY, &Some(&response.user));
                Ok(response.user)
            }
        }
    }

    /// # Errors
    /// Propagates the API error; the session stays signed in.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _pending = Pending::begin(&self.inner.pending);
        client::logout(&self.inner.api).await?;

        self.set_user(None);
        self.inner.cache.clear();
        info!("signed out");
        Ok(())
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|user| user.is_admin)
    }

    /// True until the mount fetch settles and while any auth call is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.inner.hydrated.load(Ordering::SeqCst) || self.inner.pending.load(Ordering::SeqCst) > 0
    }

    /// Point-in-time view for guards and route resolution.
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        AuthStatus {
            is_authenticated: self.is_authenticated(),
            is_loading: self.is_loading(),
            is_admin: self.is_admin(),
        }
    }

    fn replace_user(&self, user: &User) {
        self.set_user(Some(user.clone()));
        self.inner.cache.set_typed(CURRENT_USER_KEY, &Some(user));
    }

    fn set_user(&self, user: Option<User>) {
        *self
            .inner
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner) = user;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{client::ClientConfig, storage::CookieJar};
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn user_json(id: u64, admin: bool) -> serde_json::Value {
        json!({"id": id, "username": "ann@example.com", "email": "ann@example.com",
               "first_name": "Ann", "last_name": "", "isAdmin": admin})
    }

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/csrf-token/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "csrftoken=tok; Path=/")
                    .set_body_json(json!({"csrfToken": "tok"})),
            )
            .mount(&server)
            .await;
        server
    }

    fn session(server: &MockServer) -> AuthSession {
        let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
        let api = ApiClient::new(config, Arc::new(CookieJar::new())).unwrap();
        AuthSession::new(api, Arc::new(QueryCache::new()))
    }

    #[tokio::test]
    async fn loading_until_mount_settles() {
        let server = server().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/current-user/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
            .mount(&server)
            .await;

        let auth = session(&server);
        assert!(auth.is_loading());
        assert_eq!(auth.mount().await.unwrap(), None);
        assert!(!auth.is_loading());
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn mount_reuses_fresh_cached_user() {
        let server = server().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/current-user/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(1, true)))
            .expect(1)
            .mount(&server)
            .await;

        let auth = session(&server);
        auth.mount().await.unwrap();
        auth.mount().await.unwrap();
        assert!(auth.is_admin());
    }

    #[tokio::test]
    async fn remount_counts_as_loading_while_in_flight() {
        let server = server().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/current-user/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(user_json(2, false))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let auth = session(&server);
        auth.mount().await.unwrap();
        assert!(!auth.is_loading());

        auth.cache().invalidate(CURRENT_USER_KEY);
        let (user, loading_midway) = tokio::join!(auth.mount(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            auth.is_loading()
        });
        assert_eq!(user.unwrap().unwrap().id, 2);
        assert!(loading_midway);
        assert!(!auth.is_loading());
    }

    #[tokio::test]
    async fn mount_surfaces_server_errors_but_stops_loading() {
        let server = server().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/current-user/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let auth = session(&server);
        assert_eq!(auth.mount().await.unwrap_err().status(), Some(500));
        assert!(!auth.is_loading());
    }

    #[tokio::test]
    async fn login_writes_through_to_cache() {
        let server = server().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .and(body_json(json!({"username": "ann@example.com", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"user": user_json(3, false), "message": "ok"})),
            )
            .mount(&server)
            .await;

        let auth = session(&server);
        let user = auth
            .login("ann@example.com", &SecretString::from("pw"))
            .await
            .unwrap();
        assert_eq!(user.id, 3);
        assert!(auth.is_authenticated());
        assert_eq!(auth.cache().get(CURRENT_USER_KEY).unwrap()["id"], 3);
    }

    #[tokio::test]
    async fn failed_login_keeps_previous_state() {
        let server = server().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"error": "Invalid username or password"})),
            )
            .mount(&server)
            .await;

        let auth = session(&server);
        let err = auth
            .login("ann@example.com", &SecretString::from("bad"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!auth.is_authenticated());
        assert_eq!(auth.inner.pending.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn register_refetches_current_user() {
        let server = server().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register/"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"user": user_json(9, false), "message": "created"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/current-user/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(9, false)))
            .expect(1)
            .mount(&server)
            .await;

        let auth = session(&server);
        let registration = Registration::new("ann@example.com", SecretString::from("longenough"));
        let user = auth.register(&registration).await.unwrap();
        assert_eq!(user.id, 9);
        assert!(auth.cache().contains(CURRENT_USER_KEY));
    }

    #[tokio::test]
    async fn logout_clears_user_and_cache() {
        let server = server().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/current-user/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(1, false)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/logout/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "bye"})))
            .mount(&server)
            .await;

        let auth = session(&server);
        auth.mount().await.unwrap();
        assert!(auth.is_authenticated());

        auth.logout().await.unwrap();
        assert!(!auth.is_authenticated());
        assert!(!auth.cache().contains(CURRENT_USER_KEY));
        assert!(!auth.is_loading());
    }
}
