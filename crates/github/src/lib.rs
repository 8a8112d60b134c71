//! GitHub infrastructure adapter.
//!
//! Implements the [`tracker::ActivityGateway`] trait over the GitHub REST API
//! with `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! All GitHub API details (authentication, page sizes, response shapes,
//! timeouts) are handled here; the [`tracker`] crate never sees them.
//!
//! ## Failure Handling
//!
//! Transport errors, non-2xx statuses and undecodable bodies are logged and
//! reported to the caller as "no data" (an empty list or `None`). Requests are
//! bounded by [`GithubConfig::timeout_secs`].

mod client;
mod error;
mod wire;

pub use client::{
    GithubClient, GithubConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS, LIST_PAGE_SIZE,
};
pub use error::GithubError;
pub use wire::SHORT_SHA_LEN;
