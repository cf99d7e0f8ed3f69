use std::error::Error as StdError;

use axum::{
    Json,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use render_video_protocol::{ApiErrorBody, ApiErrorMessage};

use crate::application::{backend::BackendError, error::ErrorReport, render::RenderError};

pub mod codes {
    pub const INVALID_BODY: &str = "invalid_body";
    pub const INVALID_QUERY: &str = "invalid_query";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const UPSTREAM_REJECTED: &str = "upstream_rejected";
    pub const UPSTREAM_INVALID_RESPONSE: &str = "upstream_invalid_response";
    pub const UPSTREAM_TIMEOUT: &str = "upstream_timeout";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        let message = message.into();
        let report = ErrorReport::from_message(
            "infra::http::api",
            status,
            format!("{code}: {}", hint.as_deref().unwrap_or(&message)),
        );
        Self {
            status,
            code,
            message,
            hint,
            report,
        }
    }

    pub fn invalid_body(error: &dyn StdError) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_BODY,
            "Request body is not valid JSON",
            Some(error.to_string()),
        )
    }

    pub fn invalid_query(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_QUERY,
            "Query string could not be parsed",
            Some(detail.into()),
        )
    }
}

/// HTTP status for a failed render operation.
pub fn render_error_status(err: &RenderError) -> StatusCode {
    match err {
        RenderError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RenderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        RenderError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        let status = render_error_status(&err);
        let (code, message, hint) = match &err {
            RenderError::Invalid(domain) => (
                codes::INVALID_INPUT,
                domain.to_string(),
                domain.field().map(|field| format!("Check the `{field}` field")),
            ),
            RenderError::Timeout(after) => (
                codes::UPSTREAM_TIMEOUT,
                "The render function did not answer in time".to_string(),
                Some(format!("Gave up after {} seconds", after.as_secs())),
            ),
            RenderError::Backend(BackendError::Invoke(_)) => (
                codes::UPSTREAM_ERROR,
                "The render function could not be invoked".to_string(),
                None,
            ),
            RenderError::Backend(BackendError::Function { message, .. }) => {
                (codes::UPSTREAM_REJECTED, message.clone(), None)
            }
            RenderError::Backend(BackendError::Decode(_)) => (
                codes::UPSTREAM_INVALID_RESPONSE,
                "The render function returned an unexpected response".to_string(),
                None,
            ),
        };

        Self {
            status,
            code,
            message,
            hint,
            report: ErrorReport::from_error("infra::http::api::render", status, &err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// 405 answer naming the one method the endpoint accepts.
pub fn method_not_allowed(allow: Method, method: &Method) -> Response {
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {method} Not Allowed"),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(allow.as_str()) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    ErrorReport::from_message(
        "infra::http::api::method_not_allowed",
        StatusCode::METHOD_NOT_ALLOWED,
        format!("{method} not allowed, expected {allow}"),
    )
    .attach(&mut response);
    response
}
