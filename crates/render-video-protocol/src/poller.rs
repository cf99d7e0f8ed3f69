//! Sequential progress polling.
//!
//! A [`Poller`] issues one progress query, waits for its response, sleeps for
//! the configured interval and only then issues the next one. At most one query
//! is outstanding per poller. The cancellation token is checked before every
//! scheduled query and interrupts both the wait and an in-flight query.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{JobHandle, ProgressSnapshot};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid progress payload: {0}")]
    Decode(String),
    #[error("progress query rejected ({code}): {message}")]
    Upstream { code: String, message: String },
}

/// Anything that can answer "how far along is this render?".
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn fetch_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, PollError>;
}

#[async_trait]
impl<T: ProgressSource + ?Sized> ProgressSource for Arc<T> {
    async fn fetch_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, PollError> {
        (**self).fetch_progress(handle).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Render still running; another query follows after the interval.
    Progress(ProgressSnapshot),
    Completed(ProgressSnapshot),
    /// The service reported a fatal render error.
    RenderFailed {
        snapshot: ProgressSnapshot,
        message: String,
    },
    /// The query itself failed. Not retried.
    QueryFailed(PollError),
    Cancelled,
}

impl PollEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollEvent::Progress(_))
    }
}

pub struct Poller<S> {
    source: S,
    handle: JobHandle,
    interval: Duration,
    cancel: CancellationToken,
    issued: u64,
    finished: bool,
}

impl<S: ProgressSource> Poller<S> {
    pub fn new(source: S, handle: JobHandle) -> Self {
        Self {
            source,
            handle,
            interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
            issued: 0,
            finished: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Tie this polling sequence to an externally owned lifetime.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    /// Number of progress queries issued so far.
    pub fn queries_issued(&self) -> u64 {
        self.issued
    }

    /// Issue the next query, waiting out the interval first unless this is the
    /// first one. Returns `None` once a terminal event was produced.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            return Some(self.finish(PollEvent::Cancelled));
        }

        if self.issued > 0 {
            let waited = tokio::select! {
                biased;
                () = self.cancel.cancelled() => false,
                () = tokio::time::sleep(self.interval) => true,
            };
            if !waited {
                return Some(self.finish(PollEvent::Cancelled));
            }
        }

        self.issued += 1;
        debug!(
            render_id = %self.handle.render_id,
            bucket_name = %self.handle.bucket_name,
            attempt = self.issued,
            "querying render progress"
        );

        let fetched = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.source.fetch_progress(&self.handle) => Some(result),
        };

        let event = match fetched {
            None => PollEvent::Cancelled,
            Some(Ok(snapshot)) if snapshot.done => PollEvent::Completed(snapshot),
            Some(Ok(snapshot)) if snapshot.is_fatal() => {
                let message = snapshot
                    .fatal_error_message()
                    .unwrap_or_else(|| "render failed".to_string());
                PollEvent::RenderFailed { snapshot, message }
            }
            Some(Ok(snapshot)) => PollEvent::Progress(snapshot),
            Some(Err(err)) => PollEvent::QueryFailed(err),
        };

        if event.is_terminal() {
            return Some(self.finish(event));
        }
        Some(event)
    }

    /// Drive the sequence to its terminal event, reporting every event on the way.
    pub async fn run<F>(mut self, mut on_event: F) -> PollEvent
    where
        F: FnMut(&PollEvent) + Send,
    {
        let mut last = PollEvent::Cancelled;
        while let Some(event) = self.next_event().await {
            on_event(&event);
            last = event;
        }
        last
    }

    fn finish(&mut self, event: PollEvent) -> PollEvent {
        self.finished = true;
        event
    }
}
