#![deny(clippy::all, clippy::pedantic)]

use std::{path::Path, time::Duration};

use render_video_protocol::{JobHandle, PollEvent, Poller, ProgressSnapshot, RenderSession};
use tokio_util::sync::CancellationToken;

use crate::args::{GenerateArgs, JobArgs, RenderArgs, WaitArgs};
use crate::client::{CliError, Ctx};
use crate::print::{print_json, progress_line};

pub async fn submit(ctx: &Ctx, args: RenderArgs) -> Result<(), CliError> {
    let mut session = RenderSession::new();
    let handle = submit_render(ctx, &mut session, args).await?;
    print_json(&handle)
}

pub async fn progress(ctx: &Ctx, args: JobArgs) -> Result<(), CliError> {
    let snapshot = ctx.progress(&JobHandle::from(args)).await?;
    print_json(&snapshot)
}

pub async fn wait(
    ctx: &Ctx,
    args: WaitArgs,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let handle = JobHandle::from(args.job);
    let mut session = RenderSession::resume(handle.clone())?;
    let snapshot = follow(ctx, &mut session, handle, interval, cancel).await?;
    finish(ctx, &snapshot, args.output.as_deref()).await
}

pub async fn generate(
    ctx: &Ctx,
    args: GenerateArgs,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let mut session = RenderSession::new();
    let handle = submit_render(ctx, &mut session, args.render).await?;
    eprintln!(
        "submitted render {} in bucket {}",
        handle.render_id, handle.bucket_name
    );
    let snapshot = follow(ctx, &mut session, handle, interval, cancel).await?;
    finish(ctx, &snapshot, args.output.as_deref()).await
}

pub(crate) async fn submit_render(
    ctx: &Ctx,
    session: &mut RenderSession,
    args: RenderArgs,
) -> Result<JobHandle, CliError> {
    session.begin_submit()?;
    let handle = match ctx.submit(&args.into()).await {
        Ok(handle) => handle,
        Err(err) => {
            session.fail(err.to_string());
            return Err(err);
        }
    };
    session.submitted(handle.clone())?;
    Ok(handle)
}

/// Poll until the render reaches a terminal state, feeding every snapshot to
/// the session. Failures are not retried.
pub(crate) async fn follow(
    ctx: &Ctx,
    session: &mut RenderSession,
    handle: JobHandle,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<ProgressSnapshot, CliError> {
    let mut poller = Poller::new(ctx.clone(), handle)
        .with_interval(interval)
        .with_cancellation(cancel);

    while let Some(event) = poller.next_event().await {
        match event {
            PollEvent::Progress(snapshot) => {
                progress_line(snapshot.percent());
                session.observe(snapshot)?;
            }
            PollEvent::Completed(snapshot) => {
                progress_line(100);
                session.observe(snapshot.clone())?;
                return Ok(snapshot);
            }
            PollEvent::RenderFailed { snapshot, message } => {
                session.observe(snapshot)?;
                return Err(CliError::RenderFailed(message));
            }
            PollEvent::QueryFailed(err) => {
                session.fail(err.to_string());
                return Err(err.into());
            }
            PollEvent::Cancelled => break,
        }
    }

    session.cancel();
    Err(CliError::Cancelled)
}

async fn finish(
    ctx: &Ctx,
    snapshot: &ProgressSnapshot,
    output: Option<&Path>,
) -> Result<(), CliError> {
    print_json(snapshot)?;

    let Some(path) = output else {
        return Ok(());
    };
    let source = snapshot
        .output_file
        .as_deref()
        .ok_or(CliError::MissingOutput)?;
    let written = ctx.download(source, path).await?;
    eprintln!("saved {written} bytes to {}", path.display());
    Ok(())
}
