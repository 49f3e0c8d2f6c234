//! # Newme (mood journal client core)
//!
//! `newme` is the client-side core of the Newme mood journal: it signs users
//! in, keeps their session continuous across reloads, and talks to the
//! journal's REST API on their behalf. The presentation layer (browser UI or
//! the bundled `newme` terminal front end) only renders what these modules
//! decide.
//!
//! ## Sign-in
//!
//! Login and registration are two-step flows (`email` then `password`). The
//! flow state is a versioned value persisted through a [`storage::SessionStorage`]
//! adapter so a reload resumes on the same step with the same email. The auth
//! session controller owns the current user and the query cache entry that
//! mirrors it.
//!
//! ## Requests
//!
//! All API calls go through [`client::ApiClient`]. Cookies live in one jar
//! ([`storage::CookieJar`]) shared with the application; state-changing verbs
//! carry the `X-CSRFToken` header, and a missing token is fetched once no
//! matter how many requests are waiting for it. Every request observes a
//! timeout and a cancellation token.
//!
//! ## Session continuity
//!
//! While a user is signed in, the last visited page is written to the
//! `lastVisitedPage` cookie. On a literal reload the page-restoration
//! controller sends the user back there, at most once per tab session.

pub mod cli;
pub mod client;
pub mod features;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
