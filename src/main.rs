use std::{process, sync::Arc};

use render_video::{
    application::{error::AppError, render::RenderService},
    config::{self, Settings},
    infra::{
        error::InfraError,
        http::{self, AppState},
        lambda::LambdaRenderBackend,
        telemetry,
    },
};
use render_video_protocol::RenderRequest;
use tokio_util::sync::CancellationToken;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging)?;
            run_serve(settings).await
        }
        config::Command::CheckConfig(_) => {
            print_config_summary(&settings);
            Ok(())
        }
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let backend = LambdaRenderBackend::from_settings(&settings.render).await;
    let render = RenderService::new(
        Arc::new(backend),
        settings.render.target.clone(),
        settings.render.timeout,
    )
    .with_validation(settings.validation.enabled);

    let state = AppState::new(
        Arc::new(render),
        RenderRequest::from(&settings.form),
        settings.poll.interval,
    );
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|source| InfraError::Bind {
            addr: settings.server.addr,
            source,
        })?;
    info!(
        addr = %settings.server.addr,
        function = %settings.render.function_name,
        region = %settings.render.region,
        "render-video listening"
    );

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => return flatten_server_result(joined),
        () = shutdown_signal() => {}
    }

    info!(
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "shutting down"
    );
    shutdown.cancel();

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!("graceful shutdown timed out; dropping open connections");
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(InfraError::Server(err).into()),
        Err(err) => Err(err.into()),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn print_config_summary(settings: &Settings) {
    let render = &settings.render;
    println!("server.addr            {}", settings.server.addr);
    println!("render.region          {}", render.region);
    println!("render.function_name   {}", render.function_name);
    println!("render.remotion_version {}", render.remotion_version);
    println!("render.composition     {}", render.target.composition);
    println!("render.serve_url       {}", render.target.serve_url);
    println!("render.codec           {}", render.target.codec);
    println!("render.timeout         {}s", render.timeout.as_secs());
    println!(
        "render.credentials     {}",
        match render.credentials.as_ref() {
            Some(credentials) => format!("static ({})", credentials.access_key_id),
            None => "default provider chain".to_string(),
        }
    );
    println!("poll.interval          {}ms", settings.poll.interval.as_millis());
    println!("validation.enabled     {}", settings.validation.enabled);
}
