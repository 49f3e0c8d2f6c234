//! Single-flight CSRF token acquisition.
//!
//! The token lives in the `csrftoken` cookie. When it is missing, the first
//! mutating request starts a `GET auth/csrf-token/` and parks the future in a
//! shared slot; every request arriving while that fetch is outstanding awaits
//! the same future. The slot empties when the fetch settles, whatever the
//! outcome, so the next absence window gets a fresh attempt.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, PoisonError};

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_TOKEN_PATH: &str = "auth/csrf-token/";

pub(crate) type TokenFetch = Shared<BoxFuture<'static, ()>>;

#[derive(Clone, Default)]
pub(crate) struct CsrfBootstrap {
    in_flight: Arc<Mutex<Option<TokenFetch>>>,
}

impl CsrfBootstrap {
    /// Joins the outstanding fetch, or starts one built by `start`.
    pub(crate) fn join_or_start<F>(&self, start: F) -> TokenFetch
    where
        F: FnOnce() -> BoxFuture<'static, ()>,
    {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(fetch) = slot.as_ref() {
            return fetch.clone();
        }

        let in_flight = Arc::clone(&self.in_flight);
        let request = start();
        let fetch = async move {
            request.await;
            in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
        .boxed()
        .shared();

        *slot = Some(fetch.clone());
        fetch
    }

    pub(crate) fn is_fetching(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
