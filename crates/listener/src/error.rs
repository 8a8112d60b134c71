//! Error types for the webhook receiver.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracker::{StoreError, TrackerError};

/// Errors that can occur while receiving or dispatching a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The `X-Hub-Signature-256` header is missing.
    #[error("missing signature header")]
    MissingSignature,

    /// The signature did not verify, or no secret is configured.
    #[error("invalid signature")]
    InvalidSignature,

    /// The `X-GitHub-Event` header is missing.
    #[error("missing event type header")]
    MissingEventType,

    /// The body is not JSON, or not the shape the event type requires.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A tracker operation failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl WebhookError {
    /// Returns the HTTP status code for this error.
    ///
    /// - Signature failures: 403 Forbidden
    /// - Missing event type or bad payload: 400 Bad Request
    /// - Store or tracker failures: 500 Internal Server Error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingSignature | Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::MissingEventType | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Tracker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        // Bodies are fixed strings; details go to the log only.
        let status = self.status_code();
        let body = match &self {
            Self::MissingSignature => "Missing signature",
            Self::InvalidSignature => "Invalid signature",
            Self::MissingEventType => "Missing event type",
            Self::InvalidPayload(_) => "Invalid payload",
            Self::Store(_) | Self::Tracker(_) => "Internal server error",
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            WebhookError::MissingSignature.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WebhookError::MissingEventType.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::InvalidPayload("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::Store(StoreError::storage("append_log", "disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn responses_do_not_leak_details() {
        let response =
            WebhookError::Store(StoreError::storage("append_log", "secret path")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Internal server error");
    }
}
