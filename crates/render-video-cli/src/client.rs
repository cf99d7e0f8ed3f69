#![deny(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use render_video_protocol::{
    ApiErrorBody, JobHandle, PollError, ProgressSnapshot, ProgressSource, RenderRequest,
    TransitionError,
};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or RENDER_VIDEO_SITE_URL)")]
    MissingSite,
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("{code} ({status}): {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error(transparent)]
    Session(#[from] TransitionError),
    #[error("progress query failed: {0}")]
    Poll(#[from] PollError),
    #[error("render failed: {0}")]
    RenderFailed(String),
    #[error("render finished without an output file")]
    MissingOutput,
    #[error("cancelled")]
    Cancelled,
    #[error("failed to write {path}: {source}")]
    OutputFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
}

impl Ctx {
    pub fn new(site: &str) -> Result<Self, CliError> {
        let base = Url::parse(site)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("render-video-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    pub async fn submit(&self, request: &RenderRequest) -> Result<JobHandle, CliError> {
        let resp = self
            .client
            .post(self.url("/api/create-video")?)
            .json(request)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, CliError> {
        let mut url = self.url("/api/get-video-progress")?;
        url.query_pairs_mut()
            .append_pair("renderId", &handle.render_id)
            .append_pair("bucketName", &handle.bucket_name);

        let resp = self.client.get(url).send().await?;
        Self::handle(resp).await
    }

    /// Stream `source` into `path`, returning the number of bytes written.
    pub async fn download(&self, source: &str, path: &Path) -> Result<u64, CliError> {
        let mut resp = self.client.get(source).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CliError::Server(format!("status {status} downloading {source}")));
        }

        let output_error = |source| CliError::OutputFile {
            path: path.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(path).await.map_err(output_error)?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk)
                .await
                .map_err(output_error)?;
            written += chunk.len() as u64;
        }
        tokio::io::AsyncWriteExt::flush(&mut file)
            .await
            .map_err(output_error)?;
        Ok(written)
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, CliError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            if let Ok(body) = serde_json::from_slice::<ApiErrorBody>(&bytes) {
                return Err(CliError::Api {
                    status,
                    code: body.error.code,
                    message: body.error.message,
                });
            }
            let text = String::from_utf8_lossy(&bytes).into_owned();
            return Err(CliError::Server(format!("status {status} body {text}")));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Decode(format!("failed to parse body: {e}")))
    }
}

#[async_trait]
impl ProgressSource for Ctx {
    async fn fetch_progress(&self, handle: &JobHandle) -> Result<ProgressSnapshot, PollError> {
        self.progress(handle).await.map_err(|err| match err {
            CliError::Api { code, message, .. } => PollError::Upstream { code, message },
            CliError::Decode(message) => PollError::Decode(message),
            other => PollError::Transport(other.to_string()),
        })
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let site = cli.site.clone().ok_or(CliError::MissingSite)?;
    Ctx::new(&site)
}
