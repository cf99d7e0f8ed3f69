pub mod api;
mod middleware;
mod ui;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use render_video_protocol::{JobHandle, RenderRequest};
use serde::Deserialize;

use crate::{application::render::RenderService, infra::assets};

use self::middleware::{log_responses, set_request_context};

/// Shared, immutable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub render: Arc<RenderService>,
    pub form: Arc<RenderRequest>,
    pub poll_interval: Duration,
}

impl AppState {
    pub fn new(render: Arc<RenderService>, form: RenderRequest, poll_interval: Duration) -> Self {
        Self {
            render,
            form: Arc::new(form),
            poll_interval,
        }
    }
}

/// `?renderId=..&bucketName=..`, shared by the JSON endpoint and the progress stream.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ProgressQuery {
    render_id: String,
    bucket_name: String,
}

impl From<ProgressQuery> for JobHandle {
    fn from(query: ProgressQuery) -> Self {
        JobHandle::new(query.bucket_name, query.render_id)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::build_api_router())
        .merge(ui::build_ui_router())
        .route("/static/{*path}", get(assets::serve))
        .route("/_health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
