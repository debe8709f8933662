//! Configuration loading and validation tests.
//!
//! Tests TOML parsing, environment variable overrides, partial configs, and validation.

use logwarden_core::config::LogwardenConfig;
use serial_test::serial;

#[test]
fn test_parse_full_config() {
    // Given: A complete TOML config
    let toml_str = r#"
[general]
log_level = "debug"
log_format = "pretty"
pid_file = "/var/run/logwarden.pid"

[monitor]
log_file_path = "/var/log/nginx/access.log"
extra_log_paths = ["/var/log/auth.log"]
poll_interval_secs = 30
alert_threshold = 7
ml_enabled = true
model_path = "/var/lib/logwarden/model.json"
min_training_samples = 200
contamination = 0.1
max_consecutive_failures = 4
aggregate_windows = true
entry_store_path = "/var/lib/logwarden/entries.jsonl"
rules_path = "/etc/logwarden/rules"
"#;

    // When: Parsing config
    let config = LogwardenConfig::parse(toml_str).expect("config should parse");

    // Then: Every field is taken from the file
    config.validate().expect("config should be valid");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.pid_file, "/var/run/logwarden.pid");
    assert_eq!(
        config.monitor.watch_paths(),
        vec!["/var/log/nginx/access.log", "/var/log/auth.log"]
    );
    assert_eq!(config.monitor.alert_threshold, 7);
    assert_eq!(config.monitor.max_consecutive_failures, 4);
    assert!(config.monitor.aggregate_windows);
}

#[test]
fn test_parse_partial_config_with_defaults() {
    // Given: Only the threshold is set
    let config = LogwardenConfig::parse("[monitor]\nalert_threshold = 2\n").unwrap();

    // Then: Everything else falls back to defaults
    assert_eq!(config.monitor.alert_threshold, 2);
    assert_eq!(config.monitor.poll_interval_secs, 60);
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn test_zero_threshold_fails_validation() {
    let config = LogwardenConfig::parse("[monitor]\nalert_threshold = 0\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("alert_threshold"));
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    assert!(LogwardenConfig::parse("[monitor\nalert_threshold = 2").is_err());
}

#[tokio::test]
async fn test_missing_config_file() {
    let result = LogwardenConfig::load("/nonexistent/logwarden.toml").await;
    assert!(result.unwrap_err().to_string().contains("not found"));
}

#[tokio::test]
#[serial]
async fn test_load_applies_env_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logwarden.toml");
    std::fs::write(&path, "[monitor]\nalert_threshold = 2\n").unwrap();

    // SAFETY: serialized with every other env-mutating test
    unsafe { std::env::set_var("LOGWARDEN_MONITOR_ALERT_THRESHOLD", "9") };
    let result = LogwardenConfig::load(&path).await;
    unsafe { std::env::remove_var("LOGWARDEN_MONITOR_ALERT_THRESHOLD") };

    assert_eq!(result.unwrap().monitor.alert_threshold, 9);
}
