//! 모니터 루프 설정
//!
//! [`PipelineConfig`]는 core의 [`MonitorConfig`](logwarden_core::config::MonitorConfig)를
//! 기반으로 파이프라인 내부에서만 쓰는 확장 설정을 더합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_core::config::LogwardenConfig;
//! use logwarden_log_pipeline::config::PipelineConfig;
//!
//! let core_config = LogwardenConfig::default();
//! let config = PipelineConfig::from_core(&core_config.monitor);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use logwarden_core::config::{MIN_TRAINING_SAMPLES, MonitorConfig};

use crate::error::LogPipelineError;
use crate::tailer::DEFAULT_MAX_BYTES_PER_POLL;

/// 모니터 루프 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 감시할 파일 목록 (첫 번째가 주 파일)
    pub watch_paths: Vec<PathBuf>,
    /// 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 알림 임계값
    pub alert_threshold: u32,
    /// 이상 모델 사용 여부
    pub ml_enabled: bool,
    /// 자동 학습에 필요한 정상 메시지 수
    pub min_training_samples: usize,
    /// 오염률
    pub contamination: f64,
    /// 연속 실패 허용 횟수
    pub max_consecutive_failures: u32,
    /// 모든 파일이 하나의 윈도우를 공유하는지 여부
    pub aggregate_windows: bool,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 한 번의 폴링에서 읽을 최대 바이트
    pub max_bytes_per_poll: u64,
    /// 시작 시 기존 내용을 건너뛰고 파일 끝부터 읽을지 여부
    pub start_at_end: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_core(&MonitorConfig::default())
    }
}

impl PipelineConfig {
    /// core의 `MonitorConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &MonitorConfig) -> Self {
        Self {
            watch_paths: core.watch_paths().into_iter().map(PathBuf::from).collect(),
            poll_interval_secs: core.poll_interval_secs,
            alert_threshold: core.alert_threshold,
            ml_enabled: core.ml_enabled,
            min_training_samples: core.min_training_samples,
            contamination: core.contamination,
            max_consecutive_failures: core.max_consecutive_failures,
            aggregate_windows: core.aggregate_windows,
            max_bytes_per_poll: DEFAULT_MAX_BYTES_PER_POLL,
            start_at_end: false,
        }
    }

    /// 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MIN_BYTES_PER_POLL: u64 = 4096;

        if self.watch_paths.is_empty() {
            return Err(config_error("watch_paths", "at least one file must be watched"));
        }
        if self.watch_paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(config_error("watch_paths", "watch path must not be empty"));
        }
        if self.poll_interval_secs == 0 {
            return Err(config_error("poll_interval_secs", "must be greater than 0"));
        }
        if self.alert_threshold == 0 {
            return Err(config_error("alert_threshold", "must be greater than 0"));
        }
        if self.max_consecutive_failures == 0 {
            return Err(config_error(
                "max_consecutive_failures",
                "must be greater than 0",
            ));
        }
        if self.max_bytes_per_poll < MIN_BYTES_PER_POLL {
            return Err(config_error(
                "max_bytes_per_poll",
                format!("must be at least {MIN_BYTES_PER_POLL}"),
            ));
        }
        if self.ml_enabled {
            if self.min_training_samples < MIN_TRAINING_SAMPLES {
                return Err(config_error(
                    "min_training_samples",
                    format!("must be at least {MIN_TRAINING_SAMPLES}"),
                ));
            }
            if !(self.contamination > 0.0 && self.contamination <= 0.5) {
                return Err(config_error("contamination", "must be in (0, 0.5]"));
            }
        }
        Ok(())
    }
}

fn config_error(field: &str, reason: impl Into<String>) -> LogPipelineError {
    LogPipelineError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 감시 파일 목록을 설정합니다.
    pub fn watch_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.watch_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// 감시 파일을 하나 추가합니다.
    pub fn watch_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.watch_paths.push(path.into());
        self
    }

    /// 폴링 간격(초)을 설정합니다.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// 알림 임계값을 설정합니다.
    pub fn alert_threshold(mut self, threshold: u32) -> Self {
        self.config.alert_threshold = threshold;
        self
    }

    /// 이상 모델 사용 여부를 설정합니다.
    pub fn ml_enabled(mut self, enabled: bool) -> Self {
        self.config.ml_enabled = enabled;
        self
    }

    /// 자동 학습 표본 수를 설정합니다.
    pub fn min_training_samples(mut self, samples: usize) -> Self {
        self.config.min_training_samples = samples;
        self
    }

    /// 오염률을 설정합니다.
    pub fn contamination(mut self, contamination: f64) -> Self {
        self.config.contamination = contamination;
        self
    }

    /// 연속 실패 허용 횟수를 설정합니다.
    pub fn max_consecutive_failures(mut self, failures: u32) -> Self {
        self.config.max_consecutive_failures = failures;
        self
    }

    /// 윈도우 공유 여부를 설정합니다.
    pub fn aggregate_windows(mut self, aggregate: bool) -> Self {
        self.config.aggregate_windows = aggregate;
        self
    }

    /// 폴링당 최대 읽기 바이트를 설정합니다.
    pub fn max_bytes_per_poll(mut self, bytes: u64) -> Self {
        self.config.max_bytes_per_poll = bytes;
        self
    }

    /// 파일 끝에서 시작할지 설정합니다.
    pub fn start_at_end(mut self, start_at_end: bool) -> Self {
        self.config.start_at_end = start_at_end;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
