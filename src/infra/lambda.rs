//! Rendering backend backed by a synchronously invoked AWS Lambda function.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::{
    Client, config::Credentials, error::DisplayErrorContext, types::InvocationType,
};
use aws_smithy_types::Blob;
use render_video_protocol::{JobHandle, ProgressSnapshot, RenderRequest};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::{
    application::backend::{BackendError, RenderBackend},
    config::RenderSettings,
    domain::render::{Codec, RenderJob},
};

const CREDENTIALS_PROVIDER_NAME: &str = "render-video-config";

pub struct LambdaRenderBackend {
    client: Client,
    function_name: String,
    remotion_version: String,
    region: String,
}

impl LambdaRenderBackend {
    /// Build a client for the configured region, using static keys when given
    /// and the default provider chain otherwise.
    pub async fn from_settings(settings: &RenderSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let Some(credentials) = settings.credentials.as_ref() {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }

        let sdk_config = loader.load().await;
        Self {
            client: Client::new(&sdk_config),
            function_name: settings.function_name.clone(),
            remotion_version: settings.remotion_version.clone(),
            region: settings.region.clone(),
        }
    }

    async fn invoke<T>(&self, payload: &FunctionPayload<'_>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(payload)
            .map_err(|err| BackendError::Invoke(format!("unable to serialize payload: {err}")))?;

        let output = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|err| BackendError::Invoke(DisplayErrorContext(&err).to_string()))?;

        debug!(
            status = output.status_code(),
            function_error = output.function_error(),
            "render function answered"
        );

        decode_response(
            output.function_error(),
            output.payload().map(|blob| blob.as_ref()),
        )
    }
}

#[async_trait]
impl RenderBackend for LambdaRenderBackend {
    #[instrument(skip_all, fields(function = %self.function_name))]
    async fn start_render(&self, job: &RenderJob) -> Result<JobHandle, BackendError> {
        let payload = StartPayload::new(&self.remotion_version, job)?;
        self.invoke(&FunctionPayload::Start(payload)).await
    }

    #[instrument(skip_all, fields(function = %self.function_name))]
    async fn render_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, BackendError> {
        let payload = StatusPayload::new(&self.remotion_version, handle);
        self.invoke(&FunctionPayload::Status(payload)).await
    }
}

/// Routine payloads understood by the Remotion render function. Every field
/// the function reads is present; unset options are sent as `null` the way
/// the Remotion client does.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum FunctionPayload<'a> {
    Start(StartPayload<'a>),
    Status(StatusPayload<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartPayload<'a> {
    version: &'a str,
    serve_url: &'a str,
    composition: &'a str,
    input_props: SerializedInputProps,
    codec: Codec,
    image_format: &'static str,
    jpeg_quality: u8,
    crf: Option<u8>,
    env_variables: Map<String, Value>,
    pixel_format: Option<String>,
    pro_res_profile: Option<String>,
    x264_preset: Option<String>,
    max_retries: u32,
    privacy: &'static str,
    log_level: &'static str,
    frame_range: Option<Value>,
    out_name: Option<String>,
    timeout_in_milliseconds: u64,
    chromium_options: Map<String, Value>,
    scale: u32,
    every_nth_frame: u32,
    number_of_gif_loops: Option<u32>,
    concurrency_per_lambda: u32,
    frames_per_lambda: Option<u32>,
    download_behavior: DownloadBehavior,
    muted: bool,
    overwrite: bool,
    audio_bitrate: Option<String>,
    video_bitrate: Option<String>,
    encoding_buffer_size: Option<String>,
    encoding_max_rate: Option<String>,
    webhook: Option<Value>,
    force_height: Option<u32>,
    force_width: Option<u32>,
    bucket_name: Option<String>,
    audio_codec: Option<String>,
    renderer_function_name: Option<String>,
    offthread_video_cache_size_in_bytes: Option<u64>,
    delete_after: Option<String>,
    color_space: Option<String>,
    prefer_lossless: bool,
    force_path_style: bool,
}

impl<'a> StartPayload<'a> {
    fn new(version: &'a str, job: &'a RenderJob) -> Result<Self, BackendError> {
        Ok(Self {
            version,
            serve_url: job.target.serve_url.as_str(),
            composition: &job.target.composition,
            input_props: SerializedInputProps::new(&job.input_props)?,
            codec: job.target.codec,
            image_format: "jpeg",
            jpeg_quality: 80,
            crf: None,
            env_variables: Map::new(),
            pixel_format: None,
            pro_res_profile: None,
            x264_preset: None,
            max_retries: 1,
            privacy: "public",
            log_level: "info",
            frame_range: None,
            out_name: None,
            timeout_in_milliseconds: 30_000,
            chromium_options: Map::new(),
            scale: 1,
            every_nth_frame: 1,
            number_of_gif_loops: None,
            concurrency_per_lambda: 1,
            frames_per_lambda: None,
            download_behavior: DownloadBehavior::PlayInBrowser,
            muted: false,
            overwrite: false,
            audio_bitrate: None,
            video_bitrate: None,
            encoding_buffer_size: None,
            encoding_max_rate: None,
            webhook: None,
            force_height: None,
            force_width: None,
            bucket_name: None,
            audio_codec: None,
            renderer_function_name: None,
            offthread_video_cache_size_in_bytes: None,
            delete_after: None,
            color_space: None,
            prefer_lossless: false,
            force_path_style: false,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload<'a> {
    version: &'a str,
    bucket_name: &'a str,
    render_id: &'a str,
    log_level: &'static str,
    s3_output_provider: Option<Value>,
    force_path_style: bool,
}

impl<'a> StatusPayload<'a> {
    fn new(version: &'a str, handle: &'a JobHandle) -> Self {
        Self {
            version,
            bucket_name: &handle.bucket_name,
            render_id: &handle.render_id,
            log_level: "info",
            s3_output_provider: None,
            force_path_style: false,
        }
    }
}

/// Input props travel as a JSON string inside a tagged wrapper.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SerializedInputProps {
    Payload { payload: String },
}

impl SerializedInputProps {
    fn new(props: &RenderRequest) -> Result<Self, BackendError> {
        let payload = serde_json::to_string(props).map_err(|err| {
            BackendError::Invoke(format!("unable to serialize input props: {err}"))
        })?;
        Ok(Self::Payload { payload })
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum DownloadBehavior {
    PlayInBrowser,
}

/// Error body the Lambda runtime returns alongside `FunctionError`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RuntimeError {
    error_type: Option<String>,
    error_message: Option<String>,
}

/// Turns a function answer into `T`. Both the runtime error shape and the
/// `{"type":"error"}` envelope are rejections; a `"type":"success"` tag is
/// stripped before decoding.
fn decode_response<T>(
    function_error: Option<&str>,
    payload: Option<&[u8]>,
) -> Result<T, BackendError>
where
    T: DeserializeOwned,
{
    let payload = payload.unwrap_or_default();

    if let Some(kind) = function_error {
        let runtime: RuntimeError = serde_json::from_slice(payload).unwrap_or_default();
        let message = runtime
            .error_message
            .unwrap_or_else(|| String::from_utf8_lossy(payload).into_owned());
        return Err(BackendError::function(
            runtime.error_type.or_else(|| Some(kind.to_string())),
            message,
        ));
    }

    let mut value: Value = serde_json::from_slice(payload)
        .map_err(|err| BackendError::Decode(format!("payload is not JSON: {err}")))?;

    match value.get("type").and_then(Value::as_str) {
        Some("error") => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("render function reported an error without a message");
            return Err(BackendError::function(None, message));
        }
        Some("success") => {
            if let Some(fields) = value.as_object_mut() {
                fields.remove("type");
            }
        }
        _ => {}
    }

    serde_json::from_value(value).map_err(|err| BackendError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::domain::render::RenderTarget;

    fn koala_job() -> RenderJob {
        RenderJob::new(
            RenderTarget {
                composition: "IntroAnimtaion".into(),
                serve_url: Url::parse("https://example.com/sites/render-video/index.html")
                    .expect("url"),
                codec: Codec::H264,
            },
            RenderRequest {
                main_text: "A".into(),
                sub_text: "B".into(),
                logo_url: "https://x/y.png".into(),
                primary_color: "#fff".into(),
            },
        )
    }

    #[test]
    fn start_payload_carries_target_and_input_props() {
        let job = koala_job();
        let payload = FunctionPayload::Start(StartPayload::new("4.0.182", &job).expect("payload"));
        let value = serde_json::to_value(&payload).expect("json");

        assert_eq!(value["type"], "start");
        assert_eq!(value["version"], "4.0.182");
        assert_eq!(
            value["serveUrl"],
            "https://example.com/sites/render-video/index.html"
        );
        assert_eq!(value["composition"], "IntroAnimtaion");
        assert_eq!(value["codec"], "h264");
        assert_eq!(value["inputProps"]["type"], "payload");
        let props: Value = serde_json::from_str(
            value["inputProps"]["payload"]
                .as_str()
                .expect("serialized props"),
        )
        .expect("props json");
        assert_eq!(
            props,
            json!({
                "mainText": "A",
                "subText": "B",
                "logoUrl": "https://x/y.png",
                "primaryColor": "#fff"
            })
        );
        assert_eq!(value["downloadBehavior"], json!({"type": "play-in-browser"}));
        assert_eq!(value["privacy"], "public");
        assert_eq!(value["imageFormat"], "jpeg");
        assert!(value["framesPerLambda"].is_null());
        assert!(value["x264Preset"].is_null());
        assert!(value.get("region").is_none());
    }

    #[test]
    fn status_payload_names_the_job() {
        let handle = JobHandle::new("b1", "r1");
        let payload = FunctionPayload::Status(StatusPayload::new("4.0.182", &handle));

        assert_eq!(
            serde_json::to_value(&payload).expect("json"),
            json!({
                "type": "status",
                "version": "4.0.182",
                "bucketName": "b1",
                "renderId": "r1",
                "logLevel": "info",
                "s3OutputProvider": null,
                "forcePathStyle": false
            })
        );
    }

    #[test]
    fn success_envelope_is_unwrapped() {
        let snapshot: ProgressSnapshot = decode_response(
            None,
            Some(br#"{"type":"success","overallProgress":0.5,"done":false,"chunks":3}"#),
        )
        .expect("snapshot");

        assert_eq!(snapshot.percent(), 50);
        assert!(snapshot.extra.get("type").is_none());
        assert_eq!(snapshot.extra.get("chunks"), Some(&json!(3)));
    }

    #[test]
    fn decodes_start_response() {
        let handle: JobHandle = decode_response(
            None,
            Some(br#"{"bucketName":"bucket1","renderId":"render1"}"#),
        )
        .expect("handle");

        assert_eq!(handle, JobHandle::new("bucket1", "render1"));
    }

    #[test]
    fn function_error_becomes_rejection() {
        let err = decode_response::<JobHandle>(
            Some("Unhandled"),
            Some(br#"{"errorType":"TypeError","errorMessage":"composition not found"}"#),
        )
        .expect_err("rejected");

        match err {
            BackendError::Function { kind, message } => {
                assert_eq!(kind.as_deref(), Some("TypeError"));
                assert_eq!(message, "composition not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_envelope_becomes_rejection() {
        let err = decode_response::<ProgressSnapshot>(
            None,
            Some(br#"{"type":"error","message":"No render found"}"#),
        )
        .expect_err("rejected");

        assert!(matches!(
            err,
            BackendError::Function { kind: None, ref message } if message == "No render found"
        ));
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let err = decode_response::<JobHandle>(None, Some(b"<html>")).expect_err("garbage");
        assert!(matches!(err, BackendError::Decode(_)));

        let err = decode_response::<JobHandle>(None, None).expect_err("empty");
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
