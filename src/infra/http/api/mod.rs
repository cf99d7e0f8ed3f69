//! JSON endpoints: render submission and progress queries.

pub mod error;
mod handlers;

use axum::{Router, routing::any};

use super::AppState;

/// Both endpoints answer every method themselves so a mismatch gets a 405
/// carrying the single allowed method.
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/api/create-video", any(handlers::create_video))
        .route("/api/get-video-progress", any(handlers::get_video_progress))
}
