//! 에러 타입 -- 도메인별 에러 정의
//!
//! 라인 단위/엔트리 단위 에러는 발생한 호출 밖으로 전파되지 않습니다.
//! 여기 정의된 타입은 설정 검증, 저장소/알림 협력자 호출,
//! 반복되는 인프라 장애처럼 호출자가 알아야 하는 상황만 표현합니다.

/// Logwarden 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogwardenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 알림 전송 에러
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
///
/// 시작 시점에 한 번 검증되며, 첫 폴링 주기 이전에 실패합니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 반복된 인프라 장애로 인한 종료
    #[error("pipeline aborted: {0}")]
    Aborted(String),
}

/// 스토리지 에러 (엔트리 저장소, 모델 저장소)
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 쓰기 실패
    #[error("write failed: {0}")]
    Write(String),

    /// 읽기 실패
    #[error("read failed: {0}")]
    Read(String),

    /// 직렬화/역직렬화 실패
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// 알림 전송 에러
///
/// 전송 실패는 기록만 되고 같은 주기 안에서 재시도하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// 전송 채널이 닫힘
    #[error("notifier unavailable: {0}")]
    Unavailable(String),

    /// 전송 실패
    #[error("send failed: {0}")]
    SendFailed(String),
}
