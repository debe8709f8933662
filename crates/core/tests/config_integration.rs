//! logwarden.toml 통합 설정 테스트
//!
//! - logwarden.toml.example 파싱 테스트
//! - 부분 설정 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use logwarden_core::config::{LogwardenConfig, MonitorConfig};
use logwarden_core::error::{ConfigError, LogwardenError};

const EXAMPLE: &str = include_str!("../../../logwarden.toml.example");

/// 환경변수를 설정한 채로 클로저를 실행하고 원래 값을 복원합니다.
fn with_env<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    let original = std::env::var(key).ok();
    // SAFETY: 호출하는 테스트는 serial로 직렬화됩니다.
    unsafe {
        std::env::set_var(key, value);
    }

    let result = f();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
    result
}

// =============================================================================
// logwarden.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = LogwardenConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.general.pid_file, "/var/run/logwarden/logwarden.pid");
}

#[test]
fn example_config_passes_validation() {
    let config = LogwardenConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_monitor_section() {
    let config = LogwardenConfig::parse(EXAMPLE).expect("should parse");
    let monitor = &config.monitor;

    assert_eq!(monitor.log_file_path, "/var/log/syslog");
    assert_eq!(monitor.extra_log_paths, vec!["/var/log/auth.log"]);
    assert_eq!(monitor.poll_interval_secs, 60);
    assert_eq!(monitor.alert_threshold, 5);
    assert!(monitor.ml_enabled);
    assert_eq!(monitor.min_training_samples, 100);
    assert!((monitor.contamination - 0.05).abs() < f64::EPSILON);
    assert_eq!(monitor.max_consecutive_failures, 10);
    assert!(!monitor.aggregate_windows);
    assert!(monitor.rules_path.is_empty());
}

#[test]
fn example_config_matches_code_defaults_where_shared() {
    let example = LogwardenConfig::parse(EXAMPLE).expect("should parse");
    let defaults = MonitorConfig::default();

    assert_eq!(example.monitor.log_file_path, defaults.log_file_path);
    assert_eq!(example.monitor.poll_interval_secs, defaults.poll_interval_secs);
    assert_eq!(example.monitor.alert_threshold, defaults.alert_threshold);
    assert_eq!(example.monitor.model_path, defaults.model_path);
    assert_eq!(
        example.monitor.max_consecutive_failures,
        defaults.max_consecutive_failures
    );
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
"#;
    let config = LogwardenConfig::parse(toml).expect("should parse");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.monitor.alert_threshold, 5);
    config.validate().expect("should validate");
}

#[test]
fn partial_config_monitor_only() {
    let toml = r#"
[monitor]
log_file_path = "/srv/app/app.log"
alert_threshold = 3
ml_enabled = false
"#;
    let config = LogwardenConfig::parse(toml).expect("should parse");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.monitor.log_file_path, "/srv/app/app.log");
    assert_eq!(config.monitor.alert_threshold, 3);
    assert!(!config.monitor.ml_enabled);
    config.validate().expect("should validate");
}

#[test]
fn zero_threshold_parses_but_fails_validation() {
    let config = LogwardenConfig::parse("[monitor]\nalert_threshold = 0").expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        LogwardenError::Config(ConfigError::InvalidValue { ref field, .. })
            if field == "monitor.alert_threshold"
    ));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;
    let result = with_env("LOGWARDEN_GENERAL_LOG_LEVEL", "error", || {
        let mut config = LogwardenConfig::parse(toml).expect("should parse");
        config.apply_env_overrides();
        config.general.log_level
    });
    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let result = with_env("LOGWARDEN_MONITOR_POLL_INTERVAL_SECS", "15", || {
        let mut config = LogwardenConfig::parse(EXAMPLE).expect("should parse");
        config.apply_env_overrides();
        config.monitor.poll_interval_secs
    });
    assert_eq!(result, 15);
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let result = with_env("LOGWARDEN_MONITOR_AGGREGATE_WINDOWS", "true", || {
        let mut config = LogwardenConfig::parse(EXAMPLE).expect("should parse");
        config.apply_env_overrides();
        config.monitor.aggregate_windows
    });
    assert!(result);
}

#[test]
#[serial_test::serial]
fn env_override_unparseable_number_keeps_toml_value() {
    let result = with_env("LOGWARDEN_MONITOR_ALERT_THRESHOLD", "many", || {
        let mut config = LogwardenConfig::parse("[monitor]\nalert_threshold = 7")
            .expect("should parse");
        config.apply_env_overrides();
        config.monitor.alert_threshold
    });
    assert_eq!(result, 7);
}

// =============================================================================
// 에러 케이스
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = LogwardenConfig::parse("").expect("should parse");
    assert_eq!(config.monitor.log_file_path, "/var/log/syslog");
}

#[test]
fn comments_only_parses_with_defaults() {
    let config = LogwardenConfig::parse("# nothing here\n# still nothing\n").expect("should parse");
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = LogwardenConfig::parse("[monitor\nalert_threshold = ");
    assert!(matches!(
        result,
        Err(LogwardenError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[test]
fn wrong_type_for_numeric_field() {
    let result = LogwardenConfig::parse("[monitor]\npoll_interval_secs = \"soon\"");
    assert!(matches!(
        result,
        Err(LogwardenError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let result = LogwardenConfig::from_file("/tmp/logwarden_test_nonexistent_12345.toml").await;
    assert!(matches!(
        result,
        Err(LogwardenError::Config(ConfigError::FileNotFound { .. }))
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_from_disk_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logwarden.toml");
    std::fs::write(&path, EXAMPLE).expect("write config");

    let config = LogwardenConfig::load(&path).await.expect("should load");
    assert_eq!(config.monitor.alert_threshold, 5);
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logwarden.toml");
    std::fs::write(&path, "[monitor]\npoll_interval_secs = 0\n").expect("write config");

    let result = LogwardenConfig::load(&path).await;
    assert!(matches!(
        result,
        Err(LogwardenError::Config(ConfigError::InvalidValue { .. }))
    ));
}

#[test]
fn serialize_and_reparse_roundtrip() {
    let original = LogwardenConfig::parse(EXAMPLE).expect("should parse");
    let serialized = toml::to_string(&original).expect("should serialize");
    let reparsed = LogwardenConfig::parse(&serialized).expect("should reparse");
    assert_eq!(reparsed.monitor.watch_paths(), original.monitor.watch_paths());
    assert_eq!(reparsed.monitor.alert_threshold, original.monitor.alert_threshold);
}
