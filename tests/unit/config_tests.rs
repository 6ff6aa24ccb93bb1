// ==========================
// tests/unit/config_tests.rs
// ==========================
//! Unit tests for the configuration module
use guardian_backend::config::{ConfigError, RateLimitSettings, Settings};
use guardian_tests::test_utils::TEST_SECRET;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_settings_default() {
    let settings = Settings::default();

    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.storage.path, PathBuf::from("data"));
    assert_eq!(settings.rate_limit.max_attempts, 5);
    assert_eq!(settings.rate_limit.window_secs, 300);
    assert_eq!(settings.rate_limit.block_duration_secs, 900);
    assert_eq!(settings.session.default_idle_timeout_minutes, 30);
    assert_eq!(settings.token.ttl_secs, 3600);

    // No signing secret by default, so defaults alone never validate.
    assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_from_file_then_validate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("guardian.toml");
    fs::write(
        &path,
        format!(
            r#"
log_level = "debug"

[server]
host = "0.0.0.0"
port = 9090

[token]
secret = "{TEST_SECRET}"
ttl_secs = 600

[rate_limit]
max_attempts = 3
"#
        ),
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.server.bind_addr().unwrap().port(), 9090);
    assert_eq!(settings.token.ttl_secs, 600);
    assert_eq!(settings.rate_limit.max_attempts, 3);
    // Unspecified keys keep their defaults.
    assert_eq!(settings.rate_limit.window_secs, 300);
    assert_eq!(settings.log_level.as_str(), "debug");
}

#[test]
fn test_builder_rejects_bad_values() {
    let err = Settings::builder()
        .token_secret(TEST_SECRET)
        .rate_limit(RateLimitSettings {
            max_attempts: 0,
            ..RateLimitSettings::default()
        })
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("max_attempts"));

    assert!(Settings::builder()
        .token_secret(TEST_SECRET)
        .log_level("chatty")
        .build()
        .is_err());
}
