//! 이벤트 -- 임계값 알림기가 생성해 알림 협력자에게 넘기는 단위
//!
//! [`EventMetadata`]는 발생 시각, 생성 모듈, 추적 ID를 담고
//! [`AlertEvent`]는 직전 발송 이후 누적된 위협 윈도우의 요약입니다.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::{Severity, ThreatCategory};

/// 로그 파이프라인 모듈명
pub const MODULE_LOG_PIPELINE: &str = "log-pipeline";

/// 이벤트 메타데이터 -- 모든 이벤트에 공통으로 포함되는 추적 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명
    pub source_module: String,
    /// 분산 추적 ID
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self::new(source_module, uuid::Uuid::new_v4().to_string())
    }
}

/// 위협 알림 이벤트
///
/// 윈도우가 임계값에 도달할 때마다 정확히 하나씩 생성됩니다.
/// 생성 직후 윈도우는 비워지므로 같은 활동이 두 번 보고되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// 이벤트 고유 ID (UUID v4)
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 윈도우가 속한 소스 (파일 경로, 집계 모드에서는 `"aggregate"`)
    pub source: String,
    /// 윈도우에 누적된 의심 엔트리 수
    pub suspicious_count: u64,
    /// 카테고리별 위협 수
    pub threat_counts: BTreeMap<ThreatCategory, u64>,
    /// 규칙에는 걸리지 않고 이상 모델로만 잡힌 엔트리 수
    pub anomaly_count: u64,
    /// 빈도순 상위 출발지 주소
    pub top_sources: Vec<(IpAddr, u64)>,
    /// 윈도우 내 가장 높은 심각도
    pub severity: Severity,
}

impl AlertEvent {
    /// 카테고리별 위협 수의 합계
    ///
    /// 엔트리 하나가 여러 카테고리에 매칭될 수 있으므로 `suspicious_count`보다 클 수 있습니다.
    pub fn total_threats(&self) -> u64 {
        self.threat_counts.values().sum()
    }

    /// 알림 제목
    pub fn title(&self) -> String {
        format!("{} suspicious log entries detected", self.suspicious_count)
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AlertEvent[{}] [{}] {} in {}",
            &self.id[..8.min(self.id.len())],
            self.severity,
            self.title(),
            self.source,
        )?;
        if !self.threat_counts.is_empty() {
            let parts: Vec<String> = self
                .threat_counts
                .iter()
                .map(|(category, count)| format!("{category}={count}"))
                .collect();
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}
