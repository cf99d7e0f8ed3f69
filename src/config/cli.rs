use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the render-video binary.
#[derive(Debug, Parser)]
#[command(
    name = "render-video",
    version,
    about = "Intro video generator backed by a serverless renderer"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "RENDER_VIDEO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Resolve and validate configuration, print a summary, then exit.
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub render: RenderOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the AWS region hosting the render function.
    #[arg(long = "render-region", value_name = "REGION")]
    pub region: Option<String>,

    /// Override the render function name.
    #[arg(long = "render-function-name", value_name = "NAME")]
    pub function_name: Option<String>,

    /// Override the Remotion version the render function was deployed with.
    #[arg(long = "render-remotion-version", value_name = "VERSION")]
    pub remotion_version: Option<String>,

    /// Override the composition id rendered for each submission.
    #[arg(long = "render-composition", value_name = "ID")]
    pub composition: Option<String>,

    /// Override the URL of the deployed composition bundle.
    #[arg(long = "render-serve-url", value_name = "URL")]
    pub serve_url: Option<String>,

    /// Override the output codec.
    #[arg(long = "render-codec", value_name = "CODEC")]
    pub codec: Option<String>,

    /// Override the timeout applied to each call to the render function.
    #[arg(long = "render-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the delay between progress queries made by the browser stream.
    #[arg(long = "poll-interval-millis", value_name = "MILLIS")]
    pub poll_interval_millis: Option<u64>,

    /// Reject malformed submissions instead of forwarding them to the renderer.
    #[arg(
        long = "validation-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub validation_enabled: Option<bool>,
}
