//! 설정 관리 -- logwarden.toml 파싱 및 런타임 설정
//!
//! [`LogwardenConfig`]는 데몬과 모니터 루프가 사용하는 최상위 설정입니다.
//! 시작 시점에 한 번 로드/검증되며, 이후 코어에는 불변 값으로 전달됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGWARDEN_MONITOR_ALERT_THRESHOLD=10` 형식)
//! 3. 설정 파일 (`logwarden.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logwarden_core::error::LogwardenError> {
//! use logwarden_core::config::LogwardenConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogwardenConfig::load("logwarden.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogwardenConfig::parse("[monitor]\nalert_threshold = 3")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogwardenError};

/// 이상 모델 학습에 필요한 최소 샘플 수
pub const MIN_TRAINING_SAMPLES: usize = 10;

/// 폴링 주기 상한 (초)
const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

/// Logwarden 통합 설정
///
/// `logwarden.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogwardenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 모니터 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl LogwardenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogwardenError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            LogwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWARDEN_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWARDEN_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "LOGWARDEN_GENERAL_PID_FILE");

        // Monitor
        override_string(
            &mut self.monitor.log_file_path,
            "LOGWARDEN_MONITOR_LOG_FILE_PATH",
        );
        override_csv(
            &mut self.monitor.extra_log_paths,
            "LOGWARDEN_MONITOR_EXTRA_LOG_PATHS",
        );
        override_u64(
            &mut self.monitor.poll_interval_secs,
            "LOGWARDEN_MONITOR_POLL_INTERVAL_SECS",
        );
        override_u32(
            &mut self.monitor.alert_threshold,
            "LOGWARDEN_MONITOR_ALERT_THRESHOLD",
        );
        override_bool(&mut self.monitor.ml_enabled, "LOGWARDEN_MONITOR_ML_ENABLED");
        override_string(&mut self.monitor.model_path, "LOGWARDEN_MONITOR_MODEL_PATH");
        override_usize(
            &mut self.monitor.min_training_samples,
            "LOGWARDEN_MONITOR_MIN_TRAINING_SAMPLES",
        );
        override_u32(
            &mut self.monitor.max_consecutive_failures,
            "LOGWARDEN_MONITOR_MAX_CONSECUTIVE_FAILURES",
        );
        override_bool(
            &mut self.monitor.aggregate_windows,
            "LOGWARDEN_MONITOR_AGGREGATE_WINDOWS",
        );
        override_string(
            &mut self.monitor.entry_store_path,
            "LOGWARDEN_MONITOR_ENTRY_STORE_PATH",
        );
        override_string(&mut self.monitor.rules_path, "LOGWARDEN_MONITOR_RULES_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogwardenError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.monitor.validate()
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 사용하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 감시할 로그 파일
    pub log_file_path: String,
    /// 추가로 감시할 로그 파일
    pub extra_log_paths: Vec<String>,
    /// 폴링 주기 (초)
    pub poll_interval_secs: u64,
    /// 알림을 발송할 의심 엔트리 수
    pub alert_threshold: u32,
    /// 이상 모델 사용 여부
    pub ml_enabled: bool,
    /// 이상 모델 파일 경로
    pub model_path: String,
    /// 모델 학습에 필요한 최소 샘플 수
    pub min_training_samples: usize,
    /// 학습 데이터 중 이상으로 간주할 비율
    pub contamination: f64,
    /// 연속 파일 접근 실패 허용 횟수 (초과 시 종료)
    pub max_consecutive_failures: u32,
    /// 모든 파일이 하나의 위협 윈도우를 공유할지 여부
    pub aggregate_windows: bool,
    /// 분류된 엔트리를 기록할 JSON Lines 파일 (빈 문자열이면 기록하지 않음)
    pub entry_store_path: String,
    /// 추가 탐지 규칙 YAML 파일 (빈 문자열이면 내장 규칙만 사용)
    pub rules_path: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_file_path: "/var/log/syslog".to_owned(),
            extra_log_paths: Vec::new(),
            poll_interval_secs: 60,
            alert_threshold: 5,
            ml_enabled: true,
            model_path: "/var/lib/logwarden/anomaly_model.json".to_owned(),
            min_training_samples: 100,
            contamination: 0.05,
            max_consecutive_failures: 10,
            aggregate_windows: false,
            entry_store_path: String::new(),
            rules_path: String::new(),
        }
    }
}

impl MonitorConfig {
    /// 감시 대상 파일 목록 (`log_file_path` 먼저)
    pub fn watch_paths(&self) -> Vec<&str> {
        std::iter::once(self.log_file_path.as_str())
            .chain(self.extra_log_paths.iter().map(String::as_str))
            .collect()
    }

    /// 모니터 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogwardenError> {
        if self.log_file_path.trim().is_empty() {
            return Err(invalid("monitor.log_file_path", "must not be empty"));
        }

        let mut seen = HashSet::new();
        for path in self.watch_paths() {
            if path.trim().is_empty() {
                return Err(invalid("monitor.extra_log_paths", "paths must not be empty"));
            }
            if !seen.insert(path) {
                return Err(invalid(
                    "monitor.extra_log_paths",
                    format!("path '{path}' is listed more than once"),
                ));
            }
        }

        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(invalid(
                "monitor.poll_interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }

        if self.alert_threshold == 0 {
            return Err(invalid("monitor.alert_threshold", "must be greater than 0"));
        }

        if self.max_consecutive_failures == 0 {
            return Err(invalid(
                "monitor.max_consecutive_failures",
                "must be greater than 0",
            ));
        }

        if self.ml_enabled {
            if self.model_path.trim().is_empty() {
                return Err(invalid(
                    "monitor.model_path",
                    "must not be empty when ml is enabled",
                ));
            }

            if self.min_training_samples < MIN_TRAINING_SAMPLES {
                return Err(invalid(
                    "monitor.min_training_samples",
                    format!("must be at least {MIN_TRAINING_SAMPLES}"),
                ));
            }

            if !(self.contamination > 0.0 && self.contamination <= 0.5) {
                return Err(invalid(
                    "monitor.contamination",
                    "must be in the range (0, 0.5]",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogwardenError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
