//! Port to the external rendering service.

use async_trait::async_trait;
use render_video_protocol::{JobHandle, ProgressSnapshot};
use thiserror::Error;

use crate::domain::render::RenderJob;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("render function invocation failed: {0}")]
    Invoke(String),
    #[error("render function reported an error: {message}")]
    Function {
        kind: Option<String>,
        message: String,
    },
    #[error("render function returned an unexpected payload: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn function(kind: Option<String>, message: impl Into<String>) -> Self {
        Self::Function {
            kind,
            message: message.into(),
        }
    }
}

/// A managed renderer that accepts jobs and reports their progress.
///
/// Implementations forward what they are given; they do not validate input.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn start_render(&self, job: &RenderJob) -> Result<JobHandle, BackendError>;

    async fn render_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, BackendError>;
}
