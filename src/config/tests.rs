use std::path::Path;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.cache.capacity.get(), 1000);
    assert_eq!(settings.cache.page_ttl, Duration::from_secs(300));
    assert_eq!(settings.cache.widget_ttl, Duration::from_secs(43_200));
    assert!(settings.cache.enable_widget_cache);
    assert_eq!(settings.catalog.fixture_path, Path::new("catalog.toml"));
    assert!(matches!(settings.logging.format, LogFormat::Compact));
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
fn zero_cache_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.capacity = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity must fail");
    assert!(matches!(err, LoadError::Invalid { key: "cache.capacity", .. }));
}

#[test]
fn zero_page_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.page_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.page_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown level must fail");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn cache_overrides_disable_widget_cache() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_enable_widget_cache: Some(false),
        cache_widget_ttl_seconds: Some(60),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(!settings.cache.enable_widget_cache);
    assert_eq!(settings.cache.widget_ttl, Duration::from_secs(60));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["stacks"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "stacks",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--catalog-fixture-path",
        "/srv/catalog.toml",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.catalog.fixture_path.as_deref(),
                Some(Path::new("/srv/catalog.toml"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_resolve_arguments() {
    let args = CliArgs::parse_from([
        "stacks",
        "resolve",
        "CarouselLoadMore",
        "--param",
        "queryType=TRENDING",
        "-p",
        "q=a=b",
    ]);

    match args.command.expect("resolve command") {
        Command::Resolve(resolve) => {
            assert_eq!(resolve.component, "CarouselLoadMore");
            assert_eq!(
                resolve.params,
                vec![
                    ("queryType".to_string(), "TRENDING".to_string()),
                    ("q".to_string(), "a=b".to_string()),
                ]
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn resolve_rejects_params_without_separator() {
    let result = CliArgs::try_parse_from(["stacks", "resolve", "SearchFacets", "--param", "novalue"]);
    assert!(result.is_err());
}
