//! Webhook event source infrastructure.
//!
//! Receives GitHub webhook deliveries over HTTP (`axum`), verifies their
//! HMAC-SHA256 signature and routes them to tracker operations:
//!
//! - [`signature`] checks `X-Hub-Signature-256` in constant time.
//! - [`Dispatcher`] maps `ping`, `pull_request`, `issues` and `workflow_run`
//!   events onto the matching project.
//! - [`router`] wires both behind `POST /webhooks/github`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details, header names and payload
//! deserialisation all live here. The [`tracker`] crate sees only decoded
//! values: repository names, issue snapshots and automation flags.
//!
//! ## Deployment
//!
//! | Scenario | Notes |
//! |----------|-------|
//! | Local development | Forward deliveries with smee.io to `serve` |
//! | Production | Requires a public HTTPS endpoint in front of `serve` |

mod dispatch;
mod error;
mod payload;
mod server;
pub mod signature;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::WebhookError;
pub use server::{
    router, WebhookState, DELIVERY_HEADER, EVENT_HEADER, HEALTH_PATH, SIGNATURE_HEADER,
    WEBHOOK_PATH,
};
pub use signature::SignatureVerifier;
