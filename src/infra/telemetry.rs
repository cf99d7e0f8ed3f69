use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::render::{
        PROGRESS_FAILURES_TOTAL, PROGRESS_QUERIES_TOTAL, SUBMISSION_FAILURES_TOTAL,
        SUBMISSIONS_TOTAL, UPSTREAM_LATENCY_MS,
    },
    config::{LogFormat, LoggingSettings},
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            SUBMISSIONS_TOTAL,
            Unit::Count,
            "Total number of render submissions received."
        );
        describe_counter!(
            SUBMISSION_FAILURES_TOTAL,
            Unit::Count,
            "Render submissions that failed, labelled by error code."
        );
        describe_counter!(
            PROGRESS_QUERIES_TOTAL,
            Unit::Count,
            "Total number of render progress queries."
        );
        describe_counter!(
            PROGRESS_FAILURES_TOTAL,
            Unit::Count,
            "Progress queries that failed, labelled by error code."
        );
        describe_histogram!(
            UPSTREAM_LATENCY_MS,
            Unit::Milliseconds,
            "Render function call latency in milliseconds, labelled by operation."
        );
    });
}
