use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::Method,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use render_video_protocol::{JobHandle, RenderRequest};

use crate::infra::http::{AppState, ProgressQuery};

use super::error::{ApiError, method_not_allowed};

pub(super) async fn create_video(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return method_not_allowed(Method::POST, &method);
    }

    let request: RenderRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return ApiError::invalid_body(&err).into_response(),
    };

    match state.render.submit(request).await {
        Ok(handle) => Json(handle).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

pub(super) async fn get_video_progress(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> Response {
    if method != Method::GET {
        return method_not_allowed(Method::GET, &method);
    }

    let handle = match query {
        Ok(Query(query)) => JobHandle::from(query),
        Err(rejection) => return ApiError::invalid_query(rejection.body_text()).into_response(),
    };

    match state.render.progress(&handle).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}
