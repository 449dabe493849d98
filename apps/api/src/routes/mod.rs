pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::email::handlers as email_handlers;
use crate::matching::handlers as matching_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/matches", post(matching_handlers::handle_match))
        .route("/api/v1/emails", post(email_handlers::handle_generate_email))
        .with_state(state)
}
