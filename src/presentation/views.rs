use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use render_video_protocol::{JobHandle, PollEvent, ProgressSnapshot, RenderRequest};
use url::form_urlencoded;

use crate::application::error::PageError;

/// CSS selector of the element the progress stream patches.
pub const PROGRESS_SELECTOR: &str = "#render-progress";

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, PageError> {
    template.render().map(Html).map_err(|err| {
        PageError::internal(
            "presentation::views::render_template",
            "Template rendering failed",
            &err,
        )
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub form: RenderRequest,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "progress.html")]
pub struct ProgressPageTemplate {
    pub handle: JobHandle,
    pub stream_url: String,
    pub progress: ProgressView,
}

impl ProgressPageTemplate {
    pub fn new(handle: JobHandle) -> Self {
        let stream_url = progress_stream_url(&handle);
        Self {
            handle,
            stream_url,
            progress: ProgressView::pending(),
        }
    }
}

#[derive(Template)]
#[template(path = "partials/progress.html")]
pub struct ProgressPartialTemplate {
    pub progress: ProgressView,
}

/// Where the browser subscribes to progress updates for `handle`.
pub fn progress_stream_url(handle: &JobHandle) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("renderId", &handle.render_id)
        .append_pair("bucketName", &handle.bucket_name)
        .finish();
    format!("/ui/renders/progress?{query}")
}

/// What the progress partial shows at one point of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub percent: u8,
    pub video_url: Option<String>,
    pub download_name: Option<String>,
    pub error: Option<String>,
}

impl ProgressView {
    pub fn pending() -> Self {
        Self {
            percent: 0,
            video_url: None,
            download_name: None,
            error: None,
        }
    }

    pub fn running(snapshot: &ProgressSnapshot) -> Self {
        Self {
            percent: snapshot.percent(),
            ..Self::pending()
        }
    }

    pub fn completed(snapshot: &ProgressSnapshot) -> Self {
        Self {
            percent: 100,
            video_url: snapshot.output_file.clone(),
            download_name: snapshot.download_name(),
            error: None,
        }
    }

    pub fn failed(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            error: Some(message.into()),
            ..Self::pending()
        }
    }

    /// View for a poller event; `None` once the poller was cancelled.
    pub fn from_event(event: &PollEvent) -> Option<Self> {
        match event {
            PollEvent::Progress(snapshot) => Some(Self::running(snapshot)),
            PollEvent::Completed(snapshot) => Some(Self::completed(snapshot)),
            PollEvent::RenderFailed { snapshot, message } => {
                Some(Self::failed(snapshot.percent(), message.clone()))
            }
            PollEvent::QueryFailed(err) => Some(Self::failed(
                0,
                format!("Could not fetch render progress: {err}"),
            )),
            PollEvent::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(progress: f64, done: bool) -> ProgressSnapshot {
        ProgressSnapshot {
            overall_progress: progress,
            done,
            output_file: done
                .then(|| "https://bucket1.s3.amazonaws.com/renders/render1/out.mp4".into()),
            out_key: done.then(|| "renders/render1/out.mp4".into()),
            ..Default::default()
        }
    }

    #[test]
    fn running_partial_shows_percentage() {
        let html = ProgressPartialTemplate {
            progress: ProgressView::running(&snapshot(0.5, false)),
        }
        .render()
        .expect("render");

        assert!(html.contains("width: 50%"));
        assert!(html.contains("50%"));
        assert!(!html.contains("<video"));
    }

    #[test]
    fn completed_partial_offers_player_and_download() {
        let html = ProgressPartialTemplate {
            progress: ProgressView::completed(&snapshot(1.0, true)),
        }
        .render()
        .expect("render");

        assert!(html.contains("<video"));
        assert!(html.contains(r#"src="https://bucket1.s3.amazonaws.com/renders/render1/out.mp4""#));
        assert!(html.contains(r#"download="out.mp4""#));
    }

    #[test]
    fn stream_url_escapes_identifiers() {
        let url = progress_stream_url(&JobHandle::new("b 1", "r&1"));
        assert_eq!(url, "/ui/renders/progress?renderId=r%261&bucketName=b+1");
    }

    #[test]
    fn cancelled_event_has_no_view() {
        assert_eq!(ProgressView::from_event(&PollEvent::Cancelled), None);
    }
}
