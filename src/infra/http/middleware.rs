use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{Level, debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier shared by every log line of one request.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Reuses a caller-supplied `x-request-id` when it is printable, otherwise
/// mints one, and echoes it on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Logs failed responses with the handler's [`ErrorReport`], if any.
/// Successful render calls are logged at debug.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();

    let Some(level) = level_for(status) else {
        if uri.path().starts_with("/api/") {
            debug!(
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                elapsed_ms,
                request_id,
                "render api call"
            );
        }
        return response;
    };

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, chain) = report.map_or(("unreported", Vec::new()), |report| {
        (report.source, report.messages)
    });
    let detail = chain.first().map_or("-", String::as_str);

    if level == Level::ERROR {
        error!(
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            request_id,
            "request failed"
        );
    } else {
        warn!(
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            request_id,
            "request rejected"
        );
    }

    response
}

fn level_for(status: StatusCode) -> Option<Level> {
    if status.is_server_error() {
        Some(Level::ERROR)
    } else if status.is_client_error() {
        Some(Level::WARN)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_failures_are_escalated() {
        assert_eq!(level_for(StatusCode::OK), None);
        assert_eq!(level_for(StatusCode::SEE_OTHER), None);
        assert_eq!(level_for(StatusCode::METHOD_NOT_ALLOWED), Some(Level::WARN));
        assert_eq!(level_for(StatusCode::GATEWAY_TIMEOUT), Some(Level::ERROR));
    }
}
