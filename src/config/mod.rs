//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use render_video_protocol::RenderRequest;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::render::{Codec, RenderTarget};

pub use cli::{CheckConfigArgs, CliArgs, Command, RenderOverrides, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "render-video";
const ENV_PREFIX: &str = "RENDER_VIDEO";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_RENDER_REGION: &str = "ap-southeast-2";
const DEFAULT_RENDER_FUNCTION_NAME: &str = "remotion-render-4-0-182-mem2048mb-disk2048mb-120sec";
const DEFAULT_RENDER_REMOTION_VERSION: &str = "4.0.182";
const DEFAULT_RENDER_COMPOSITION: &str = "IntroAnimtaion";
const DEFAULT_RENDER_SERVE_URL: &str =
    "https://remotionlambda-apsoutheast2-3xj1q4wewy.s3.ap-southeast-2.amazonaws.com/sites/render-video/index.html";
const DEFAULT_RENDER_CODEC: &str = "h264";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 1000;
const DEFAULT_FORM_MAIN_TEXT: &str = "Koala 聊开源";
const DEFAULT_FORM_SUB_TEXT: &str = "陪伴你成长的技术频道";
const DEFAULT_FORM_LOGO_URL: &str =
    "https://render-video-api-public.s3.ap-southeast-2.amazonaws.com/koala.png";
const DEFAULT_FORM_PRIMARY_COLOR: &str = "#f6e58d";

/// Credential variables read by the deployed renderer; honoured as a fallback.
const REMOTION_ACCESS_KEY_ENV: &str = "REMOTION_AWS_ACCESS_KEY_ID";
const REMOTION_SECRET_KEY_ENV: &str = "REMOTION_AWS_SECRET_ACCESS_KEY";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub poll: PollSettings,
    pub validation: ValidationSettings,
    pub form: FormDefaults,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub region: String,
    pub function_name: String,
    /// Sent with every invocation; the function refuses payloads from another version.
    pub remotion_version: String,
    pub target: RenderTarget,
    pub timeout: Duration,
    pub credentials: Option<StaticCredentials>,
}

/// Explicit access keys for the render function; otherwise the default AWS
/// provider chain is used.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationSettings {
    pub enabled: bool,
}

/// Values the form is pre-filled with.
#[derive(Debug, Clone)]
pub struct FormDefaults {
    pub main_text: String,
    pub sub_text: String,
    pub logo_url: String,
    pub primary_color: String,
}

impl From<&FormDefaults> for RenderRequest {
    fn from(form: &FormDefaults) -> Self {
        RenderRequest {
            main_text: form.main_text.clone(),
            sub_text: form.sub_text.clone(),
            logo_url: form.logo_url.clone(),
            primary_color: form.primary_color.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_credential_fallback(|name| std::env::var(name).ok());

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::CheckConfig(args)) => raw.apply_render_overrides(&args.render),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    poll: RawPollSettings,
    validation: RawValidationSettings,
    form: RawFormSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(millis) = overrides.poll_interval_millis {
            self.poll.interval_millis = Some(millis);
        }
        if let Some(enabled) = overrides.validation_enabled {
            self.validation.enabled = Some(enabled);
        }

        self.apply_render_overrides(&overrides.render);
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(region) = overrides.region.as_ref() {
            self.render.region = Some(region.clone());
        }
        if let Some(name) = overrides.function_name.as_ref() {
            self.render.function_name = Some(name.clone());
        }
        if let Some(version) = overrides.remotion_version.as_ref() {
            self.render.remotion_version = Some(version.clone());
        }
        if let Some(composition) = overrides.composition.as_ref() {
            self.render.composition = Some(composition.clone());
        }
        if let Some(url) = overrides.serve_url.as_ref() {
            self.render.serve_url = Some(url.clone());
        }
        if let Some(codec) = overrides.codec.as_ref() {
            self.render.codec = Some(codec.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.render.timeout_seconds = Some(seconds);
        }
    }

    /// Fill in keys from the renderer's own environment variables when the
    /// `render` section leaves them unset.
    fn apply_credential_fallback<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.render.access_key_id.is_none() {
            self.render.access_key_id = lookup(REMOTION_ACCESS_KEY_ENV);
        }
        if self.render.secret_access_key.is_none() {
            self.render.secret_access_key = lookup(REMOTION_SECRET_KEY_ENV);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            render,
            poll,
            validation,
            form,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            poll: build_poll_settings(poll)?,
            validation: ValidationSettings {
                enabled: validation.enabled.unwrap_or(false),
            },
            form: build_form_defaults(form),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let region = non_blank(render.region, DEFAULT_RENDER_REGION, "render.region")?;
    let function_name = non_blank(
        render.function_name,
        DEFAULT_RENDER_FUNCTION_NAME,
        "render.function_name",
    )?;
    let remotion_version = non_blank(
        render.remotion_version,
        DEFAULT_RENDER_REMOTION_VERSION,
        "render.remotion_version",
    )?;
    let composition = non_blank(
        render.composition,
        DEFAULT_RENDER_COMPOSITION,
        "render.composition",
    )?;

    let serve_url_value = render
        .serve_url
        .unwrap_or_else(|| DEFAULT_RENDER_SERVE_URL.to_string());
    let serve_url = Url::parse(serve_url_value.trim())
        .map_err(|err| LoadError::invalid("render.serve_url", format!("invalid URL: {err}")))?;

    let codec_value = render
        .codec
        .unwrap_or_else(|| DEFAULT_RENDER_CODEC.to_string());
    let codec = Codec::from_str(&codec_value)
        .map_err(|err| LoadError::invalid("render.codec", err.to_string()))?;

    let timeout_seconds = render
        .timeout_seconds
        .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "render.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let access_key_id = blank_to_none(render.access_key_id);
    let secret_access_key = blank_to_none(render.secret_access_key);
    let credentials = match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
            access_key_id,
            secret_access_key,
        }),
        (None, None) => None,
        _ => {
            return Err(LoadError::invalid(
                "render.access_key_id",
                "access_key_id and secret_access_key must be set together",
            ));
        }
    };

    Ok(RenderSettings {
        region,
        function_name,
        remotion_version,
        target: RenderTarget {
            composition,
            serve_url,
            codec,
        },
        timeout: Duration::from_secs(timeout_seconds),
        credentials,
    })
}

fn build_poll_settings(poll: RawPollSettings) -> Result<PollSettings, LoadError> {
    let millis = poll.interval_millis.unwrap_or(DEFAULT_POLL_INTERVAL_MILLIS);
    if millis == 0 {
        return Err(LoadError::invalid(
            "poll.interval_millis",
            "must be greater than zero",
        ));
    }
    Ok(PollSettings {
        interval: Duration::from_millis(millis),
    })
}

fn build_form_defaults(form: RawFormSettings) -> FormDefaults {
    FormDefaults {
        main_text: form
            .main_text
            .unwrap_or_else(|| DEFAULT_FORM_MAIN_TEXT.to_string()),
        sub_text: form
            .sub_text
            .unwrap_or_else(|| DEFAULT_FORM_SUB_TEXT.to_string()),
        logo_url: form
            .logo_url
            .unwrap_or_else(|| DEFAULT_FORM_LOGO_URL.to_string()),
        primary_color: form
            .primary_color
            .unwrap_or_else(|| DEFAULT_FORM_PRIMARY_COLOR.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    region: Option<String>,
    function_name: Option<String>,
    remotion_version: Option<String>,
    composition: Option<String>,
    serve_url: Option<String>,
    codec: Option<String>,
    timeout_seconds: Option<u64>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPollSettings {
    interval_millis: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawValidationSettings {
    enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFormSettings {
    main_text: Option<String>,
    sub_text: Option<String>,
    logo_url: Option<String>,
    primary_color: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
