//! Client features built on the HTTP client and storage adapters. Auth and
//! navigation hold the session-continuity logic; the remaining modules are
//! thin typed wrappers over the journal's REST endpoints.

pub mod analytics;
pub mod auth;
pub mod cbt;
pub mod conversation;
pub mod crisis;
pub mod mood;
pub mod navigation;
pub mod notify;
pub mod query;
pub mod subscription;

use serde::Deserialize;

/// List endpoints answer either with a paginated `{ "results": [...] }`
/// envelope or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Page { results } | Self::Plain(results) => results,
        }
    }
}
