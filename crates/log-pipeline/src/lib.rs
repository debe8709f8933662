//! Logwarden 로그 파이프라인
//!
//! 추가 전용 로그 파일을 테일링하고, 규칙과 이상 탐지 모델로 각 라인을 분류한 뒤,
//! 누적된 의심 활동이 임계값을 넘으면 알림 이벤트를 하나 발송합니다.
//!
//! # 모듈 구성
//!
//! - [`parser`]: 타임스탬프/레벨/메시지를 뽑는 라인 문법과 주소 추출
//! - [`rule`]: 위협 카테고리 정규식 규칙 (내장 + YAML 추가 규칙)
//! - [`anomaly`]: TF-IDF + 아이솔레이션 포레스트 이상 탐지 모델
//! - [`pipeline`]: 파싱/규칙/모델을 묶은 라인 분류기
//! - [`tailer`]: 로테이션을 감지하는 오프셋 기반 파일 테일러
//! - [`alert`]: 임계값 윈도우와 알림 생성
//! - [`monitor`]: 주기 실행 루프 (폴링, 저장, 알림, 모델 부트스트랩)
//! - [`store`]: 저장소/알림/모델 저장소 참조 구현
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Tailer -> ClassificationPipeline -> EntryStore
//!                  |                 \
//!        LineParser/RuleMatcher/      ThresholdAlerter -> Notifier
//!           AnomalyModel
//! ```

pub mod alert;
pub mod anomaly;
pub mod config;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod store;
pub mod tailer;

pub mod parser;
pub mod rule;

// --- 주요 타입 re-export ---

// 모니터 루프
pub use monitor::{CycleReport, MonitorLoop, MonitorLoopBuilder, MonitorStats, train_from_file};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 분류
pub use anomaly::{AnomalyModel, AnomalyScore, ModelParams};
pub use parser::{LineParser, ParseOutcome, ParsedLine};
pub use pipeline::ClassificationPipeline;
pub use rule::{RuleLoader, RuleMatcher};

// 테일러
pub use tailer::{TailCursor, Tailer};

// 알림
pub use alert::{ThreatWindow, ThresholdAlerter};

// 협력자
pub use store::{
    FileModelStore, JsonLinesStore, MemoryModelStore, MemoryNotifier, MemoryStore, ModelStore,
    TracingNotifier,
};
