//! The HTTP surface: `POST /webhooks/github` and `GET /healthz`.
//!
//! A delivery goes through three gates in order, and the first failure ends
//! it: signature verification (403), event type and JSON decoding (400), then
//! dispatch. Nothing touches the store before the body has decoded.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info_span, warn, Instrument};
use tracker::RequestId;

use crate::{DispatchOutcome, Dispatcher, SignatureVerifier, WebhookError};

/// Route GitHub delivers to.
pub const WEBHOOK_PATH: &str = "/webhooks/github";

/// Liveness route.
pub const HEALTH_PATH: &str = "/healthz";

pub const EVENT_HEADER: &str = "x-github-event";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Shared state of the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    verifier: Arc<SignatureVerifier>,
    dispatcher: Arc<Dispatcher>,
}

impl WebhookState {
    pub fn new(verifier: SignatureVerifier, dispatcher: Dispatcher) -> Self {
        if !verifier.is_configured() {
            warn!("no webhook secret configured; every delivery will be rejected");
        }
        Self {
            verifier: Arc::new(verifier),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Builds the router serving the webhook and health routes.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(receive))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn receive(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DispatchOutcome>, WebhookError> {
    let request_id = RequestId::new_random();
    let event = header(&headers, EVENT_HEADER).unwrap_or_default().to_string();
    let delivery = header(&headers, DELIVERY_HEADER).unwrap_or("-").to_string();
    let span = info_span!("webhook", %request_id, event = %event, delivery = %delivery);

    async move {
        let result = handle(&state, &headers, &event, &body).await;
        if let Err(error) = &result {
            warn!(%error, status = %error.status_code(), "delivery rejected");
        }
        result.map(Json)
    }
    .instrument(span)
    .await
}

async fn handle(
    state: &WebhookState,
    headers: &HeaderMap,
    event: &str,
    body: &[u8],
) -> Result<DispatchOutcome, WebhookError> {
    let signature = header(headers, SIGNATURE_HEADER).ok_or(WebhookError::MissingSignature)?;
    if !state.verifier.verify(body, signature) {
        return Err(WebhookError::InvalidSignature);
    }
    if event.is_empty() {
        return Err(WebhookError::MissingEventType);
    }
    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    state.dispatcher.dispatch(event, payload).await
}
