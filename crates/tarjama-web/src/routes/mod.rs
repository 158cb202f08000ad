//! HTTP route handlers for the tarjama web service.
//!
//! One upload in, one translated PDF out. Errors are returned as plain text.

mod health;
mod translate;

pub use health::health;
pub use translate::translate_pdf;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/translate", post(translate_pdf))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
