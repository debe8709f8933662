//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for LogwardenError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logwarden_core::error::{ConfigError, LogwardenError, PipelineError, StorageError};

/// 로그 파이프라인 도메인 에러
///
/// 파일 테일링, 룰 로딩, 모델 학습, 모니터 루프 등 파이프라인 내부의
/// 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 감시 중인 파일에 접근할 수 없음 (없음, 권한, 읽기 실패)
    #[error("file access error: {path}: {reason}")]
    FileAccess {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 이상 모델을 사용할 수 없음 (미학습 또는 학습 데이터 부족)
    #[error("anomaly model unavailable: {0}")]
    ModelUnavailable(String),

    /// 연속 실패 횟수 초과로 모니터 루프 중단
    #[error("monitor escalated: {path}: {failures} consecutive failures")]
    Escalated {
        /// 실패한 파일 경로
        path: String,
        /// 연속 실패 횟수
        failures: u32,
    },

    /// 룰 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 룰 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 룰 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 룰 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 저장소 협력자 에러
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for LogwardenError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                LogwardenError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Storage(e) => LogwardenError::Storage(e),
            LogPipelineError::Escalated { .. } => {
                LogwardenError::Pipeline(PipelineError::Aborted(err.to_string()))
            }
            other => LogwardenError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
