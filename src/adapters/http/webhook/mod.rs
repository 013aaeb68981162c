//! Webhook endpoint for chat platform event callbacks.

mod dto;
mod handlers;
mod routes;

pub use dto::{ChallengeResponse, ErrorResponse};
pub use handlers::WebhookState;
pub use routes::webhook_routes;
