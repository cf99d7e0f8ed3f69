//! Browser surface: the form, the progress page and its live update stream.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use datastar::prelude::{ElementPatchMode, PatchElements};
use render_video_protocol::{JobHandle, Poller, RenderRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::{
    application::error::ErrorReport,
    infra::http::{AppState, ProgressQuery, api::error::render_error_status},
    presentation::views::{
        IndexTemplate, PROGRESS_SELECTOR, ProgressPageTemplate, ProgressPartialTemplate,
        ProgressView, render_template, render_template_response,
    },
};

pub(super) fn build_ui_router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/renders", post(submit))
        .route("/renders/{bucket_name}/{render_id}", get(progress_page))
        .route("/ui/renders/progress", get(progress_stream))
}

async fn index(State(state): State<AppState>) -> Response {
    let template = IndexTemplate {
        form: state.form.as_ref().clone(),
        error: None,
    };
    render_template_response(template, StatusCode::OK)
}

async fn submit(State(state): State<AppState>, Form(request): Form<RenderRequest>) -> Response {
    let (status, message, detail) = match state.render.submit(request.clone()).await {
        Ok(handle) if handle.has_render_id() => {
            return match progress_page_path(&handle) {
                Some(path) => Redirect::to(&path).into_response(),
                None => render_template_response(ProgressPageTemplate::new(handle), StatusCode::OK),
            };
        }
        Ok(_) => (
            StatusCode::BAD_GATEWAY,
            "The renderer accepted the job but returned no render id.".to_string(),
            "render function returned an empty render id".to_string(),
        ),
        Err(err) => (
            render_error_status(&err),
            format!("Rendering could not be started: {err}"),
            err.to_string(),
        ),
    };

    let template = IndexTemplate {
        form: request,
        error: Some(message),
    };
    let mut response = render_template_response(template, status);
    ErrorReport::from_message("infra::http::ui::submit", status, detail).attach(&mut response);
    response
}

async fn progress_page(Path((bucket_name, render_id)): Path<(String, String)>) -> Response {
    let handle = JobHandle::new(bucket_name, render_id);
    render_template_response(ProgressPageTemplate::new(handle), StatusCode::OK)
}

/// Runs a poller for the job and streams each update as a datastar patch.
/// The poller stops once the client goes away.
async fn progress_stream(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Response {
    let handle = JobHandle::from(query);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let mut poller = Poller::new(state.render.clone(), handle)
        .with_interval(state.poll_interval)
        .with_cancellation(cancel);

    let events = stream! {
        let _guard = guard;
        while let Some(event) = poller.next_event().await {
            let Some(view) = ProgressView::from_event(&event) else {
                break;
            };
            match render_template(ProgressPartialTemplate { progress: view }) {
                Ok(Html(html)) => {
                    yield Ok::<Event, Infallible>(
                        PatchElements::new(html)
                            .selector(PROGRESS_SELECTOR)
                            .mode(ElementPatchMode::Outer)
                            .write_as_axum_sse_event(),
                    );
                }
                Err(err) => {
                    warn!(
                        render_id = %poller.handle().render_id,
                        error = ?err,
                        "progress partial failed to render"
                    );
                    break;
                }
            }
        }
        debug!(
            render_id = %poller.handle().render_id,
            queries = poller.queries_issued(),
            "progress stream finished"
        );
    };

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn progress_page_path(handle: &JobHandle) -> Option<String> {
    let mut url = Url::parse("http://localhost/renders").ok()?;
    url.path_segments_mut()
        .ok()?
        .push(&handle.bucket_name)
        .push(&handle.render_id);
    Some(url.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_path_encodes_segments() {
        assert_eq!(
            progress_page_path(&JobHandle::new("bucket1", "render1")).as_deref(),
            Some("/renders/bucket1/render1")
        );
        assert_eq!(
            progress_page_path(&JobHandle::new("b/1", "r 1")).as_deref(),
            Some("/renders/b%2F1/r%201")
        );
    }
}
