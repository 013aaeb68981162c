//! HTTP handlers for event callbacks.
//!
//! Callbacks are acknowledged as soon as they are parsed and verified.
//! Message events are processed on their own task, tracked so shutdown can
//! wait for them to drain.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio_util::task::TaskTracker;

use crate::adapters::lark::{parse_event, token_matches, EventParseError, LarkEvent};
use crate::application::InboundDispatcher;

use super::dto::{ChallengeResponse, ErrorResponse};

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<InboundDispatcher>,
    pub verification_token: Option<Arc<str>>,
    pub tracker: TaskTracker,
}

impl WebhookState {
    pub fn new(dispatcher: Arc<InboundDispatcher>, verification_token: Option<&str>, tracker: TaskTracker) -> Self {
        Self {
            dispatcher,
            verification_token: verification_token.map(Arc::from),
            tracker,
        }
    }
}

/// POST /webhook/events - Receive a chat platform callback
pub async fn receive_event(State(state): State<WebhookState>, body: Bytes) -> Result<Response, WebhookApiError> {
    let event = parse_event(&body)?;

    if !token_matches(state.verification_token.as_deref(), event.token()) {
        tracing::warn!("event callback with invalid verification token");
        return Err(WebhookApiError::InvalidToken);
    }

    match event {
        LarkEvent::Challenge { challenge, .. } => {
            tracing::info!("answering url verification challenge");
            Ok(Json(ChallengeResponse { challenge }).into_response())
        }
        LarkEvent::Message { message, .. } => {
            let dispatcher = Arc::clone(&state.dispatcher);
            state.tracker.spawn(async move {
                if let Err(e) = dispatcher.handle(message).await {
                    tracing::warn!(error = %e, "inbound message failed");
                }
            });
            Ok(StatusCode::OK.into_response())
        }
        LarkEvent::Other { event_type, .. } => {
            tracing::debug!(event_type = %event_type, "ignoring event");
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// Errors surfaced to the callback sender.
#[derive(Debug)]
pub enum WebhookApiError {
    Parse(EventParseError),
    InvalidToken,
}

impl From<EventParseError> for WebhookApiError {
    fn from(err: EventParseError) -> Self {
        Self::Parse(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            WebhookApiError::Parse(e) => {
                tracing::warn!(error = %e, "rejecting event callback");
                (StatusCode::BAD_REQUEST, ErrorResponse::new("INVALID_EVENT", e.to_string()))
            }
            WebhookApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("INVALID_TOKEN", "Verification token mismatch"),
            ),
        };
        (status, Json(error)).into_response()
    }
}
