//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않은 경우 매크로는 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logwarden_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 위협 카테고리 레이블 키
pub const LABEL_CATEGORY: &str = "category";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Monitor 메트릭 ────────────────────────────────────────────────

/// 파일에서 읽은 라인 수 (counter)
pub const MONITOR_LINES_READ_TOTAL: &str = "logwarden_monitor_lines_read_total";

/// 분류된 엔트리 수 (counter)
pub const MONITOR_ENTRIES_CLASSIFIED_TOTAL: &str = "logwarden_monitor_entries_classified_total";

/// 의심 엔트리 수 (counter)
pub const MONITOR_SUSPICIOUS_TOTAL: &str = "logwarden_monitor_suspicious_total";

/// 카테고리별 규칙 매칭 수 (counter, label: category)
pub const MONITOR_RULE_MATCHES_TOTAL: &str = "logwarden_monitor_rule_matches_total";

/// 이상 모델 판정 수 (counter)
pub const MONITOR_ANOMALIES_TOTAL: &str = "logwarden_monitor_anomalies_total";

/// 발송된 알림 수 (counter, label: result)
pub const MONITOR_ALERTS_TOTAL: &str = "logwarden_monitor_alerts_total";

/// 실패한 폴링 주기 수 (counter)
pub const MONITOR_CYCLE_FAILURES_TOTAL: &str = "logwarden_monitor_cycle_failures_total";

/// 저장소 쓰기 실패 수 (counter)
pub const MONITOR_STORAGE_FAILURES_TOTAL: &str = "logwarden_monitor_storage_failures_total";

/// 폴링 주기 소요 시간 (histogram, 초)
pub const MONITOR_CYCLE_DURATION_SECONDS: &str = "logwarden_monitor_cycle_duration_seconds";

/// 이상 모델 학습 수 (counter)
pub const MODEL_TRAININGS_TOTAL: &str = "logwarden_model_trainings_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더가 설치된 뒤 호출해야 반영됩니다. 반복 호출해도 무해합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        MONITOR_LINES_READ_TOTAL,
        "Total number of complete lines read from monitored files"
    );
    describe_counter!(
        MONITOR_ENTRIES_CLASSIFIED_TOTAL,
        "Total number of log entries classified"
    );
    describe_counter!(
        MONITOR_SUSPICIOUS_TOTAL,
        "Total number of entries classified as suspicious"
    );
    describe_counter!(
        MONITOR_RULE_MATCHES_TOTAL,
        "Rule matches per threat category"
    );
    describe_counter!(
        MONITOR_ANOMALIES_TOTAL,
        "Entries flagged by the anomaly model only"
    );
    describe_counter!(
        MONITOR_ALERTS_TOTAL,
        "Alert events handed to the notifier, by result"
    );
    describe_counter!(
        MONITOR_CYCLE_FAILURES_TOTAL,
        "Poll cycles that failed on file access"
    );
    describe_counter!(
        MONITOR_STORAGE_FAILURES_TOTAL,
        "Entries the storage collaborator failed to append"
    );
    describe_histogram!(
        MONITOR_CYCLE_DURATION_SECONDS,
        "Duration of a single poll cycle in seconds"
    );
    describe_counter!(
        MODEL_TRAININGS_TOTAL,
        "Number of anomaly model trainings"
    );
}
