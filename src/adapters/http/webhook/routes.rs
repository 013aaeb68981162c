//! HTTP routes for the webhook endpoint.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{health, receive_event, WebhookState};

/// Creates the router for event callbacks and health checks.
pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook/events", post(receive_event))
        .route("/health", get(health))
        .with_state(state)
}
