use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::server::AppState;

mod auth;
pub mod gemini;
pub mod health;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/gemini", post(gemini::generate_text))
        .route("/health", get(health::health))
}
