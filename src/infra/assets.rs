//! Stylesheet and other files compiled into the binary from `static/`.

use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, File, include_dir};

use crate::application::error::ErrorReport;

static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

const CACHE_CONTROL: &str = "public, max-age=3600";
const SOURCE: &str = "infra::assets::serve";

/// `GET /static/{*path}`
pub async fn serve(path: Option<Path<String>>) -> Response {
    let requested = path.map(|Path(value)| value).unwrap_or_default();
    match lookup(&requested) {
        Ok(Some(file)) => asset_response(file),
        Ok(None) => failure(StatusCode::NOT_FOUND, "static asset not found"),
        Err(status) => failure(status, "static asset path rejected"),
    }
}

/// Finds an embedded file. Paths escaping the bundle are rejected; directories
/// and unknown names are simply absent.
fn lookup(requested: &str) -> Result<Option<&'static File<'static>>, StatusCode> {
    let relative = requested.trim_start_matches('/');
    if relative.split('/').any(|segment| segment == "..") || relative.contains('\\') {
        return Err(StatusCode::BAD_REQUEST);
    }
    if relative.is_empty() || relative.ends_with('/') {
        return Ok(None);
    }
    Ok(STATIC_ASSETS.get_file(relative))
}

fn asset_response(file: &'static File<'static>) -> Response {
    let mime = mime_guess::from_path(file.path()).first_or_octet_stream();
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
        ],
        Bytes::from_static(file.contents()),
    )
        .into_response()
}

fn failure(status: StatusCode, message: &'static str) -> Response {
    let mut response = status.into_response();
    ErrorReport::from_message(SOURCE, status, message).attach(&mut response);
    response
}
