//! render-video-cli: submit intro video renders and follow them to completion.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod commands;
mod print;

use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;
    let interval = Duration::from_millis(cli.interval_ms);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(cancel.clone()));

    match cli.command {
        Commands::Submit(args) => commands::submit(&ctx, args).await?,
        Commands::Progress(args) => commands::progress(&ctx, args).await?,
        Commands::Wait(args) => commands::wait(&ctx, args, interval, cancel).await?,
        Commands::Generate(args) => commands::generate(&ctx, args, interval, cancel).await?,
    }

    Ok(())
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("interrupted; stopping");
        cancel.cancel();
    }
}

#[cfg(test)]
mod tests;
