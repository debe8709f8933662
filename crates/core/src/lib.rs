//! # logwarden-core
//!
//! Logwarden의 모든 크레이트가 공유하는 기반 타입을 정의합니다.
//!
//! - [`types`]: 로그 엔트리, 로그 레벨, 위협 카테고리, 심각도
//! - [`event`]: 임계값 알림 이벤트
//! - [`pipeline`]: 저장소/알림 협력자 trait
//! - [`config`]: `logwarden.toml` 설정 로딩과 검증
//! - [`error`]: 도메인 에러 계층
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, DispatchError, LogwardenError, PipelineError, StorageError};

// 설정
pub use config::{GeneralConfig, LogwardenConfig, MonitorConfig};

// 이벤트
pub use event::{AlertEvent, EventMetadata};

// 협력자 trait
pub use pipeline::{EntryStore, Notifier};

// 도메인 타입
pub use types::{LogEntry, LogLevel, Severity, ThreatCategory};
