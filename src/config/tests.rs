use std::io::Write;

use serial_test::serial;

use super::*;

#[test]
fn defaults_target_the_deployed_renderer() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.render.region, "ap-southeast-2");
    assert_eq!(
        settings.render.function_name,
        "remotion-render-4-0-182-mem2048mb-disk2048mb-120sec"
    );
    assert_eq!(settings.render.remotion_version, "4.0.182");
    assert_eq!(settings.render.target.composition, "IntroAnimtaion");
    assert_eq!(settings.render.target.codec, Codec::H264);
    assert_eq!(
        settings.render.target.serve_url.as_str(),
        DEFAULT_RENDER_SERVE_URL
    );
    assert_eq!(settings.poll.interval, Duration::from_secs(1));
    assert!(!settings.validation.enabled);
    assert!(settings.render.credentials.is_none());
    assert_eq!(settings.form.primary_color, "#f6e58d");
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.render.region = Some("us-east-1".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        render: RenderOverrides {
            region: Some("eu-central-1".to_string()),
            codec: Some("vp9".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.render.region, "eu-central-1");
    assert_eq!(settings.render.target.codec, Codec::Vp9);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn unknown_codec_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.codec = Some("mkv".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid codec");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.codec",
            ..
        }
    ));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let mut raw = RawSettings::default();
    raw.poll.interval_millis = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid interval");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "poll.interval_millis",
            ..
        }
    ));
}

#[test]
fn credentials_must_be_paired() {
    let mut raw = RawSettings::default();
    raw.render.access_key_id = Some("AKIA".to_string());

    let err = Settings::from_raw(raw).expect_err("unpaired key");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.access_key_id",
            ..
        }
    ));
}

#[test]
fn remotion_credentials_fill_missing_keys() {
    let mut raw = RawSettings::default();
    raw.apply_credential_fallback(|name| match name {
        "REMOTION_AWS_ACCESS_KEY_ID" => Some("AKIAREMOTION".to_string()),
        "REMOTION_AWS_SECRET_ACCESS_KEY" => Some("secret".to_string()),
        _ => None,
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    let credentials = settings.render.credentials.expect("credentials");
    assert_eq!(credentials.access_key_id, "AKIAREMOTION");
    assert!(format!("{credentials:?}").contains("<redacted>"));
}

#[test]
fn configured_credentials_win_over_fallback() {
    let mut raw = RawSettings::default();
    raw.render.access_key_id = Some("AKIACONFIG".to_string());
    raw.render.secret_access_key = Some("configured".to_string());
    raw.apply_credential_fallback(|_| Some("ignored".to_string()));

    let settings = Settings::from_raw(raw).expect("valid settings");
    let credentials = settings.render.credentials.expect("credentials");
    assert_eq!(credentials.access_key_id, "AKIACONFIG");
    assert_eq!(credentials.secret_access_key, "configured");
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["render-video"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn blank_remotion_version_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.remotion_version = Some("  ".to_string());

    let err = Settings::from_raw(raw).expect_err("blank version");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.remotion_version",
            ..
        }
    ));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "render-video",
        "serve",
        "--server-port",
        "8080",
        "--render-function-name",
        "custom-fn",
        "--render-remotion-version",
        "4.0.200",
        "--validation-enabled",
        "yes",
        "--poll-interval-millis",
        "500",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_port, Some(8080));
            assert_eq!(
                serve.overrides.render.function_name.as_deref(),
                Some("custom-fn")
            );
            assert_eq!(
                serve.overrides.render.remotion_version.as_deref(),
                Some("4.0.200")
            );
            assert_eq!(serve.overrides.validation_enabled, Some(true));
            assert_eq!(serve.overrides.poll_interval_millis, Some(500));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_check_config_arguments() {
    let args = CliArgs::parse_from([
        "render-video",
        "check-config",
        "--render-composition",
        "Other",
    ]);

    match args.command.expect("check-config command") {
        Command::CheckConfig(check) => {
            assert_eq!(check.render.composition.as_deref(), Some("Other"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
#[serial]
fn environment_overrides_config_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp config");
    writeln!(
        file,
        "[render]\nregion = \"us-west-2\"\ncomposition = \"FromFile\"\n\n[poll]\ninterval_millis = 250"
    )
    .expect("write config");

    // SAFETY: serialised with the other environment-mutating tests.
    unsafe {
        std::env::set_var("RENDER_VIDEO__RENDER__REGION", "eu-west-1");
    }

    let cli = CliArgs {
        config_file: Some(file.path().to_path_buf()),
        command: None,
    };
    let result = load(&cli);

    unsafe {
        std::env::remove_var("RENDER_VIDEO__RENDER__REGION");
    }

    let settings = result.expect("settings");
    assert_eq!(settings.render.region, "eu-west-1");
    assert_eq!(settings.render.target.composition, "FromFile");
    assert_eq!(settings.poll.interval, Duration::from_millis(250));
}

#[test]
#[serial]
fn missing_explicit_config_file_fails() {
    let cli = CliArgs {
        config_file: Some("/nonexistent/render-video.toml".into()),
        command: None,
    };

    let err = load(&cli).expect_err("missing file");
    assert!(matches!(err, LoadError::Build(_)));
}
