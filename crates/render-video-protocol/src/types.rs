//! Request and response bodies exchanged with the render-video endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters collected by the form and forwarded to the renderer as input props.
///
/// Every field defaults to an empty string: the submission endpoint forwards
/// whatever it receives and leaves rejection to the rendering service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderRequest {
    pub main_text: String,
    pub sub_text: String,
    pub logo_url: String,
    pub primary_color: String,
}

/// Identifies one render job on the rendering service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobHandle {
    pub bucket_name: String,
    pub render_id: String,
}

impl JobHandle {
    pub fn new(bucket_name: impl Into<String>, render_id: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            render_id: render_id.into(),
        }
    }

    /// A handle is only worth polling once the service assigned a render id.
    pub fn has_render_id(&self) -> bool {
        !self.render_id.trim().is_empty()
    }
}

const FATAL_ERROR_KEY: &str = "fatalErrorEncountered";

/// Point-in-time status of a render job.
///
/// Fields the service reports beyond the ones named here are kept in `extra`
/// and serialised back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub overall_progress: f64,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub out_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressSnapshot {
    /// Completion as a whole percentage, clamped to `0..=100`.
    pub fn percent(&self) -> u8 {
        let clamped = if self.overall_progress.is_finite() {
            self.overall_progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (clamped * 100.0).round() as u8
    }

    /// Whether the service flagged `fatalErrorEncountered`. The flag stays in
    /// `extra` so it is echoed exactly as received.
    pub fn is_fatal(&self) -> bool {
        self.extra
            .get(FATAL_ERROR_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// First error message reported by the service, if any.
    pub fn fatal_error_message(&self) -> Option<String> {
        self.extra
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.iter().find_map(error_message))
    }

    /// File name offered for download: `outKey` when present, else the last
    /// path segment of `outputFile`.
    pub fn download_name(&self) -> Option<String> {
        if let Some(key) = self.out_key.as_deref().filter(|key| !key.is_empty()) {
            return Some(key.rsplit('/').next().unwrap_or(key).to_string());
        }
        self.output_file
            .as_deref()
            .and_then(|file| file.split(['?', '#']).next())
            .and_then(|file| file.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

fn error_message(entry: &Value) -> Option<String> {
    match entry {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Error body returned by the JSON endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
