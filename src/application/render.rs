//! Render workflow: forward submissions and progress queries to the backend.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use metrics::{counter, histogram};
use render_video_protocol::{
    JobHandle, PollError, ProgressSnapshot, ProgressSource, RenderRequest,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::{
    error::DomainError,
    render::{RenderJob, RenderTarget},
    validation::validate_render_request,
};

use super::backend::{BackendError, RenderBackend};

pub const SUBMISSIONS_TOTAL: &str = "render_video_submissions_total";
pub const SUBMISSION_FAILURES_TOTAL: &str = "render_video_submission_failures_total";
pub const PROGRESS_QUERIES_TOTAL: &str = "render_video_progress_queries_total";
pub const PROGRESS_FAILURES_TOTAL: &str = "render_video_progress_failures_total";
pub const UPSTREAM_LATENCY_MS: &str = "render_video_upstream_latency_ms";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("render function did not answer within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl RenderError {
    /// Stable machine-readable code, shared by the JSON API and the poller.
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::Invalid(_) => "invalid_input",
            RenderError::Timeout(_) => "upstream_timeout",
            RenderError::Backend(BackendError::Invoke(_)) => "upstream_error",
            RenderError::Backend(BackendError::Function { .. }) => "upstream_rejected",
            RenderError::Backend(BackendError::Decode(_)) => "upstream_invalid_response",
        }
    }
}

pub struct RenderService {
    backend: Arc<dyn RenderBackend>,
    target: RenderTarget,
    timeout: Duration,
    validate: bool,
}

impl RenderService {
    pub fn new(backend: Arc<dyn RenderBackend>, target: RenderTarget, timeout: Duration) -> Self {
        Self {
            backend,
            target,
            timeout,
            validate: false,
        }
    }

    /// Reject malformed submissions before they reach the backend.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    #[instrument(skip_all, fields(composition = %self.target.composition))]
    pub async fn submit(&self, request: RenderRequest) -> Result<JobHandle, RenderError> {
        counter!(SUBMISSIONS_TOTAL).increment(1);

        if self.validate {
            if let Err(err) = validate_render_request(&request) {
                counter!(SUBMISSION_FAILURES_TOTAL, "code" => "invalid_input").increment(1);
                return Err(err.into());
            }
        }

        let job = RenderJob::new(self.target.clone(), request);
        let result = self.call("start", self.backend.start_render(&job)).await;

        match &result {
            Ok(handle) => info!(
                render_id = %handle.render_id,
                bucket_name = %handle.bucket_name,
                "render submitted"
            ),
            Err(err) => {
                counter!(SUBMISSION_FAILURES_TOTAL, "code" => err.code()).increment(1);
                warn!(error = %err, code = err.code(), "render submission failed");
            }
        }
        result
    }

    #[instrument(
        skip_all,
        fields(render_id = %handle.render_id, bucket_name = %handle.bucket_name)
    )]
    pub async fn progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, RenderError> {
        counter!(PROGRESS_QUERIES_TOTAL).increment(1);

        let result = self
            .call("status", self.backend.render_progress(handle))
            .await;

        if let Err(err) = &result {
            counter!(PROGRESS_FAILURES_TOTAL, "code" => err.code()).increment(1);
            warn!(error = %err, code = err.code(), "render progress query failed");
        }
        result
    }

    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T, RenderError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, future).await;
        histogram!(UPSTREAM_LATENCY_MS, "operation" => operation)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(result) => result.map_err(RenderError::from),
            Err(_) => Err(RenderError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl ProgressSource for RenderService {
    async fn fetch_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, PollError> {
        self.progress(handle)
            .await
            .map_err(|err| PollError::Upstream {
                code: err.code().to_string(),
                message: err.to_string(),
            })
    }
}
