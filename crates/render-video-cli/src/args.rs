//! Command-line surface for `render-video-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use render_video_protocol::{JobHandle, RenderRequest};

#[derive(Parser, Debug)]
#[command(
    name = "render-video-cli",
    version,
    about = "Submit intro video renders and follow their progress",
    long_about = None
)]
pub struct Cli {
    /// Service base URL, e.g. <http://127.0.0.1:3000>
    #[arg(long, env = "RENDER_VIDEO_SITE_URL")]
    pub site: Option<String>,

    /// Milliseconds between progress queries
    #[arg(
        long = "interval-ms",
        env = "RENDER_VIDEO_POLL_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a render and print its handle
    Submit(RenderArgs),
    /// Query the progress of a render once
    Progress(JobArgs),
    /// Poll a submitted render until it finishes
    Wait(WaitArgs),
    /// Submit a render and poll it until it finishes
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[arg(long, default_value = "Koala 聊开源")]
    pub main_text: String,
    #[arg(long, default_value = "陪伴你成长的技术频道")]
    pub sub_text: String,
    #[arg(
        long,
        default_value = "https://render-video-api-public.s3.ap-southeast-2.amazonaws.com/koala.png"
    )]
    pub logo_url: String,
    #[arg(long, default_value = "#f6e58d")]
    pub primary_color: String,
}

impl From<RenderArgs> for RenderRequest {
    fn from(args: RenderArgs) -> Self {
        RenderRequest {
            main_text: args.main_text,
            sub_text: args.sub_text,
            logo_url: args.logo_url,
            primary_color: args.primary_color,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    #[arg(long)]
    pub render_id: String,
    #[arg(long)]
    pub bucket_name: String,
}

impl From<JobArgs> for JobHandle {
    fn from(args: JobArgs) -> Self {
        JobHandle::new(args.bucket_name, args.render_id)
    }
}

#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    #[command(flatten)]
    pub job: JobArgs,
    /// Download the finished video to this path
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub render: RenderArgs,
    /// Download the finished video to this path
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}
