//! 임계값 알림 -- 분류된 엔트리 흐름을 개별 알림 이벤트로 바꿉니다.
//!
//! [`ThresholdAlerter`]는 직전 발송 이후의 의심 활동을 [`ThreatWindow`]에 누적하다가
//! 의심 엔트리 수가 임계값에 도달하면 [`AlertEvent`] 하나를 만들고 윈도우를 비웁니다.
//! 같은 활동이 두 번 보고되지 않으므로 알림 폭주가 생기지 않습니다.
//!
//! # 상태
//! ```text
//! ACCUMULATING --(suspicious_count >= threshold)--> DISPATCHED --(reset)--> ACCUMULATING
//! ```
//! 윈도우에는 시간 제한이 없습니다. 임계값에 도달할 때까지 계속 누적됩니다.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use logwarden_core::event::{AlertEvent, EventMetadata, MODULE_LOG_PIPELINE};
use logwarden_core::types::{LogEntry, Severity, ThreatCategory};

use crate::error::LogPipelineError;
use crate::rule::builtin::default_severity;

/// 윈도우가 추적하는 출발지 주소 최대 개수
pub const MAX_TRACKED_SOURCES: usize = 1024;

/// 알림에 포함할 상위 출발지 수
pub const TOP_SOURCES: usize = 5;

/// 이상 모델로만 잡힌 윈도우의 심각도
const ANOMALY_ONLY_SEVERITY: Severity = Severity::Low;

/// 위협 윈도우 -- 마지막 발송 이후 누적된 의심 활동
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreatWindow {
    /// 의심 엔트리 수
    pub suspicious_count: u64,
    /// 카테고리별 매칭 수
    pub threat_counts: BTreeMap<ThreatCategory, u64>,
    /// 규칙 매칭 없이 이상 모델로만 잡힌 엔트리 수
    pub anomaly_count: u64,
    source_counts: HashMap<IpAddr, u64>,
}

impl ThreatWindow {
    /// 의심 엔트리를 누적합니다. 정상 엔트리는 무시하고 `false`를 반환합니다.
    pub fn record(&mut self, entry: &LogEntry) -> bool {
        if !entry.is_suspicious() {
            return false;
        }

        self.suspicious_count += 1;
        for category in &entry.threat_categories {
            *self.threat_counts.entry(*category).or_default() += 1;
        }
        if entry.threat_categories.is_empty() && entry.is_anomalous {
            self.anomaly_count += 1;
        }

        if let Some(addr) = entry.source_address {
            if let Some(count) = self.source_counts.get_mut(&addr) {
                *count += 1;
            } else if self.source_counts.len() < MAX_TRACKED_SOURCES {
                self.source_counts.insert(addr, 1);
            }
        }
        true
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.suspicious_count == 0
    }

    /// 빈도순 상위 출발지 주소 (동률은 주소 오름차순)
    pub fn top_sources(&self, limit: usize) -> Vec<(IpAddr, u64)> {
        let mut sources: Vec<(IpAddr, u64)> =
            self.source_counts.iter().map(|(a, c)| (*a, *c)).collect();
        sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sources.truncate(limit);
        sources
    }

    /// 추적 중인 출발지 주소 수
    pub fn tracked_sources(&self) -> usize {
        self.source_counts.len()
    }
}

/// 임계값 알림기
pub struct ThresholdAlerter {
    threshold: u64,
    source: String,
    window: ThreatWindow,
    severities: BTreeMap<ThreatCategory, Severity>,
    alerts_emitted: u64,
}

impl ThresholdAlerter {
    /// 새 알림기를 생성합니다.
    ///
    /// # Errors
    /// 임계값이 0이면 `Config` 에러를 반환합니다.
    pub fn new(threshold: u32, source: impl Into<String>) -> Result<Self, LogPipelineError> {
        if threshold == 0 {
            return Err(LogPipelineError::Config {
                field: "alert_threshold".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(Self {
            threshold: u64::from(threshold),
            source: source.into(),
            window: ThreatWindow::default(),
            severities: ThreatCategory::ALL
                .into_iter()
                .map(|c| (c, default_severity(c)))
                .collect(),
            alerts_emitted: 0,
        })
    }

    /// 카테고리별 심각도 표를 설정합니다 (추가 규칙 반영용).
    pub fn with_severities(mut self, severities: BTreeMap<ThreatCategory, Severity>) -> Self {
        self.severities.extend(severities);
        self
    }

    /// 엔트리 하나를 관측합니다.
    ///
    /// 이 엔트리로 임계값에 도달하면 알림을 만들고 윈도우를 비웁니다.
    pub fn observe_entry(&mut self, entry: &LogEntry) -> Option<AlertEvent> {
        if !self.window.record(entry) {
            return None;
        }
        if self.window.suspicious_count >= self.threshold {
            Some(self.dispatch())
        } else {
            None
        }
    }

    /// 엔트리 묶음을 관측합니다.
    ///
    /// 묶음 전체를 누적한 뒤 임계값을 확인하므로 호출당 알림은 최대 하나입니다.
    pub fn observe(&mut self, entries: &[LogEntry]) -> Option<AlertEvent> {
        for entry in entries {
            self.window.record(entry);
        }
        if self.window.suspicious_count >= self.threshold {
            Some(self.dispatch())
        } else {
            None
        }
    }

    /// 현재 윈도우
    pub fn window(&self) -> &ThreatWindow {
        &self.window
    }

    /// 알림 임계값
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// 지금까지 생성한 알림 수
    pub fn alerts_emitted(&self) -> u64 {
        self.alerts_emitted
    }

    fn dispatch(&mut self) -> AlertEvent {
        let window = std::mem::take(&mut self.window);

        let severity = window
            .threat_counts
            .keys()
            .map(|c| {
                self.severities
                    .get(c)
                    .copied()
                    .unwrap_or_else(|| default_severity(*c))
            })
            .max()
            .unwrap_or(ANOMALY_ONLY_SEVERITY);

        let event = AlertEvent {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_LOG_PIPELINE),
            source: self.source.clone(),
            suspicious_count: window.suspicious_count,
            top_sources: window.top_sources(TOP_SOURCES),
            threat_counts: window.threat_counts,
            anomaly_count: window.anomaly_count,
            severity,
        };
        self.alerts_emitted += 1;

        tracing::info!(
            source = %event.source,
            suspicious = event.suspicious_count,
            severity = %event.severity,
            alert_id = %event.id,
            "alert threshold reached"
        );

        event
    }
}
