#![deny(clippy::all, clippy::pedantic)]

use std::time::Duration;

use httpmock::MockServer;
use render_video_protocol::{JobHandle, PollError, RenderSession, SessionState};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::args::{Cli, Commands, JobArgs, RenderArgs};
use crate::client::{CliError, Ctx, build_ctx_from_cli};
use crate::commands::{follow, submit_render};

fn ctx(server: &MockServer) -> Ctx {
    Ctx::new(&server.base_url()).expect("ctx")
}

fn koala() -> RenderArgs {
    RenderArgs {
        main_text: "Koala 聊开源".into(),
        sub_text: "陪伴你成长的技术频道".into(),
        logo_url: "https://valid/logo.png".into(),
        primary_color: "#f6e58d".into(),
    }
}

fn polling(handle: &JobHandle) -> RenderSession {
    RenderSession::resume(handle.clone()).expect("resume")
}

#[test]
fn build_ctx_errors_without_site() {
    let cli = Cli {
        site: None,
        interval_ms: 1000,
        command: Commands::Progress(JobArgs {
            render_id: "r1".into(),
            bucket_name: "b1".into(),
        }),
    };

    let err = build_ctx_from_cli(&cli).expect_err("missing site should fail");
    assert!(matches!(err, CliError::MissingSite));
}

#[test]
fn site_path_is_ignored_for_endpoints() -> Result<(), CliError> {
    let ctx = Ctx::new("https://example.com/some/page")?;
    assert_eq!(
        ctx.url("/api/create-video")?.as_str(),
        "https://example.com/api/create-video"
    );
    Ok(())
}

#[tokio::test]
async fn submit_posts_the_form_values() -> Result<(), CliError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/create-video").json_body(json!({
            "mainText": "Koala 聊开源",
            "subText": "陪伴你成长的技术频道",
            "logoUrl": "https://valid/logo.png",
            "primaryColor": "#f6e58d"
        }));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"bucketName":"bucket1","renderId":"render1"}"#);
    });

    let mut session = RenderSession::new();
    let handle = submit_render(&ctx(&server), &mut session, koala()).await?;

    assert_eq!(handle, JobHandle::new("bucket1", "render1"));
    assert_eq!(session.state().name(), "polling");
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn empty_render_id_fails_the_submission() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/api/create-video");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"bucketName":"bucket1","renderId":""}"#);
    });

    let mut session = RenderSession::new();
    let err = submit_render(&ctx(&server), &mut session, koala())
        .await
        .expect_err("empty render id");

    assert!(matches!(err, CliError::Session(_)));
    assert_eq!(session.state().name(), "failed");
}

#[tokio::test]
async fn structured_server_errors_are_surfaced() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/api/create-video");
        then.status(504)
            .header("content-type", "application/json")
            .body(r#"{"error":{"code":"upstream_timeout","message":"The render function did not answer in time"}}"#);
    });

    let mut session = RenderSession::new();
    let err = submit_render(&ctx(&server), &mut session, koala())
        .await
        .expect_err("timeout");

    match err {
        CliError::Api { status, code, .. } => {
            assert_eq!(status.as_u16(), 504);
            assert_eq!(code, "upstream_timeout");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.state().name(), "failed");
}

#[tokio::test]
async fn follow_stops_when_the_render_is_done() -> Result<(), CliError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/get-video-progress")
            .query_param("renderId", "render1")
            .query_param("bucketName", "bucket1");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"overallProgress":1,"done":true,"outputFile":"https://cdn/out.mp4","outKey":"renders/render1/out.mp4"}"#);
    });

    let handle = JobHandle::new("bucket1", "render1");
    let mut session = polling(&handle);
    let snapshot = follow(
        &ctx(&server),
        &mut session,
        handle,
        Duration::from_millis(1),
        CancellationToken::new(),
    )
    .await?;

    assert_eq!(snapshot.output_file.as_deref(), Some("https://cdn/out.mp4"));
    assert_eq!(snapshot.download_name().as_deref(), Some("out.mp4"));
    assert_eq!(session.state().name(), "done");
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn fatal_render_error_fails_the_session() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/get-video-progress");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"overallProgress":0.4,"done":false,"fatalErrorEncountered":true,"errors":[{"message":"Composition crashed"}]}"#);
    });

    let handle = JobHandle::new("bucket1", "render1");
    let mut session = polling(&handle);
    let err = follow(
        &ctx(&server),
        &mut session,
        handle,
        Duration::from_millis(1),
        CancellationToken::new(),
    )
    .await
    .expect_err("fatal");

    assert!(matches!(err, CliError::RenderFailed(ref message) if message == "Composition crashed"));
    assert!(matches!(session.state(), SessionState::Failed { .. }));
}

#[tokio::test]
async fn rejected_progress_query_is_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/get-video-progress");
        then.status(502)
            .header("content-type", "application/json")
            .body(r#"{"error":{"code":"upstream_rejected","message":"No render with ID found"}}"#);
    });

    let handle = JobHandle::new("bucket1", "missing");
    let mut session = polling(&handle);
    let err = follow(
        &ctx(&server),
        &mut session,
        handle,
        Duration::from_millis(1),
        CancellationToken::new(),
    )
    .await
    .expect_err("rejected");

    assert!(matches!(
        err,
        CliError::Poll(PollError::Upstream { ref code, .. }) if code == "upstream_rejected"
    ));
    assert_eq!(session.state().name(), "failed");
    mock.assert();
}

#[tokio::test]
async fn cancelled_follow_issues_no_queries() {
    let server = MockServer::start();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let handle = JobHandle::new("bucket1", "render1");
    let mut session = polling(&handle);
    let err = follow(
        &ctx(&server),
        &mut session,
        handle.clone(),
        Duration::from_millis(1),
        cancel,
    )
    .await
    .expect_err("cancelled");

    assert!(matches!(err, CliError::Cancelled));
    assert_eq!(
        session.state(),
        &SessionState::Cancelled {
            handle: Some(handle)
        }
    );
}
