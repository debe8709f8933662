//! 통합 테스트 -- 테일링부터 알림 발송까지의 전체 흐름 검증

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use logwarden_core::types::{LogLevel, ThreatCategory};
use logwarden_log_pipeline::{
    ClassificationPipeline, JsonLinesStore, MemoryNotifier, MemoryStore, MonitorLoop,
    PipelineConfigBuilder, RuleLoader, RuleMatcher, TailCursor, Tailer, ThresholdAlerter,
};

const SQLI: &str = "2024-01-15 10:30:00 WARNING q=1' UNION SELECT password FROM users from 203.0.113.7";

fn append(path: &Path, content: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

fn monitor_for(path: &Path, threshold: u32) -> (MonitorLoop, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let config = PipelineConfigBuilder::new()
        .watch_paths([path])
        .alert_threshold(threshold)
        .ml_enabled(false)
        .build()
        .unwrap();
    let monitor = MonitorLoop::builder()
        .config(config)
        .entry_store(store.clone())
        .notifier(notifier.clone())
        .build()
        .unwrap();
    (monitor, store, notifier)
}

/// 세 줄의 SQL 인젝션이 임계값 3에서 알림 하나로 이어지는지 검증
#[tokio::test]
async fn three_injections_produce_one_alert() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    append(&path, &format!("{SQLI}\n{SQLI}\n{SQLI}\n"));

    let (mut monitor, store, notifier) = monitor_for(&path, 3);
    monitor.run_once().await.unwrap();

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].suspicious_count, 3);
    assert_eq!(
        events[0].threat_counts.iter().collect::<Vec<_>>(),
        vec![(&ThreatCategory::SqlInjection, &3)]
    );
    assert_eq!(events[0].top_sources, vec![("203.0.113.7".parse().unwrap(), 3)]);
    assert_eq!(store.len(), 3);
    assert_eq!(monitor.pending_counts(), vec![0]);
}

/// 정상 라인 하나 뒤의 `SELECT ... WHERE 1=1 --` 세 줄이 카테고리 집계 하나로 묶이는지 검증
#[tokio::test]
async fn tautology_queries_after_normal_request_alert_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    append(
        &path,
        "2024-01-01 10:00:00 INFO normal request\n\
         2024-01-01 10:00:01 WARNING SELECT * FROM users WHERE 1=1 --\n\
         2024-01-01 10:00:02 WARNING SELECT * FROM users WHERE 1=1 --\n\
         2024-01-01 10:00:03 WARNING SELECT * FROM users WHERE 1=1 --\n",
    );

    let (mut monitor, store, notifier) = monitor_for(&path, 3);
    let report = monitor.run_once().await.unwrap();
    assert_eq!(report.lines_read, 4);
    assert_eq!(report.suspicious, 3);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].suspicious_count, 3);
    assert_eq!(
        events[0].threat_counts.iter().collect::<Vec<_>>(),
        vec![(&ThreatCategory::SqlInjection, &3)]
    );
    assert_eq!(store.len(), 4);
    assert_eq!(store.entries()[0].level, LogLevel::Info);
    assert!(!store.entries()[0].is_suspicious());
}

#[tokio::test]
async fn empty_file_produces_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.log");
    append(&path, "");

    let (mut monitor, store, notifier) = monitor_for(&path, 1);
    let report = monitor.run_once().await.unwrap();
    assert_eq!(report.lines_read, 0);
    assert!(store.is_empty());
    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn truncation_rewinds_and_rereads_new_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rotating.log");
    append(&path, "2024-01-15 10:00:00 INFO first line of the old file\n");

    let (mut monitor, store, _) = monitor_for(&path, 5);
    monitor.run_once().await.unwrap();

    // copytruncate 흉내: 더 짧은 새 내용으로 교체
    std::fs::write(&path, "2024-01-15 11:00:00 INFO new\n").unwrap();
    let report = monitor.run_once().await.unwrap();
    assert_eq!(report.lines_read, 1);

    let messages: Vec<String> = store.entries().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["first line of the old file", "new"]);
}

#[tokio::test]
async fn partial_line_is_completed_on_next_poll() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.log");
    append(&path, "2024-01-15 10:00:00 INFO comp");

    let tailer = Tailer::new();
    let (lines, cursor) = tailer.poll(&TailCursor::new(&path)).await.unwrap();
    assert!(lines.is_empty());
    assert_eq!(cursor.byte_offset, 0);

    append(&path, "lete\n");
    let (lines, cursor) = tailer.poll(&cursor).await.unwrap();
    assert_eq!(lines, vec!["2024-01-15 10:00:00 INFO complete"]);
    assert!(cursor.byte_offset <= cursor.last_size);
}

#[tokio::test]
async fn repeated_poll_without_new_data_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steady.log");
    append(&path, &format!("{SQLI}\n"));

    let (mut monitor, store, notifier) = monitor_for(&path, 2);
    for _ in 0..3 {
        monitor.run_once().await.unwrap();
    }
    assert_eq!(store.len(), 1);
    assert!(notifier.events().is_empty());
    assert_eq!(monitor.pending_counts(), vec![1]);
}

#[tokio::test]
async fn alert_spans_cycles_until_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slow.log");
    let (mut monitor, _, notifier) = monitor_for(&path, 2);

    append(&path, &format!("{SQLI}\n"));
    monitor.run_once().await.unwrap();
    assert!(notifier.events().is_empty());

    append(&path, "2024-01-15 10:31:00 ERROR su: authentication failure for root\n");
    monitor.run_once().await.unwrap();

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].suspicious_count, 2);
    assert!(events[0].threat_counts.contains_key(&ThreatCategory::PrivilegeEscalation));
}

#[test]
fn classification_of_mixed_lines() {
    let pipeline = ClassificationPipeline::with_builtin_rules().unwrap();

    let entry = pipeline.classify(
        "2024-01-15 10:30:00 ERROR GET /../../etc/passwd <script>alert(1)</script> from 10.1.2.3",
    );
    assert_eq!(entry.level, LogLevel::Error);
    assert_eq!(
        entry.threat_categories,
        BTreeSet::from([ThreatCategory::DirectoryTraversal, ThreatCategory::Xss])
    );
    assert_eq!(entry.source_address, Some("10.1.2.3".parse().unwrap()));
    // 모델이 없으므로 점수 없음
    assert_eq!(entry.anomaly_score, None);
    assert!(entry.is_suspicious());

    let garbage = pipeline.classify("no structure here at all");
    assert_eq!(garbage.level, LogLevel::Unknown);
    assert_eq!(garbage.timestamp, None);
    assert_eq!(garbage.message, "no structure here at all");
    assert!(!garbage.is_suspicious());
}

#[test]
fn custom_rules_extend_the_builtin_table() {
    let yaml = r#"
rules:
  - id: wp_login
    category: failed-login
    pattern: 'POST /wp-login\.php'
    severity: high
"#;
    let rules = RuleMatcher::with_extra_rules(RuleLoader::parse_yaml(yaml, "custom.yml").unwrap())
        .unwrap();
    let pipeline = ClassificationPipeline::new(rules).unwrap();

    let entry = pipeline.classify("2024-01-15 10:30:00 INFO post /WP-LOGIN.php 200");
    assert_eq!(
        entry.threat_categories,
        BTreeSet::from([ThreatCategory::FailedLogin])
    );
}

#[test]
fn zero_threshold_is_rejected() {
    assert!(ThresholdAlerter::new(0, "app").is_err());
    assert!(PipelineConfigBuilder::new().alert_threshold(0).build().is_err());
}

#[tokio::test]
async fn jsonl_store_receives_all_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let out = dir.path().join("entries.jsonl");
    append(&path, &format!("{SQLI}\n2024-01-15 10:00:00 INFO ok\n"));

    let config = PipelineConfigBuilder::new()
        .watch_paths([&path])
        .ml_enabled(false)
        .build()
        .unwrap();
    let mut monitor = MonitorLoop::builder()
        .config(config)
        .entry_store(Arc::new(JsonLinesStore::open(&out).unwrap()))
        .notifier(Arc::new(MemoryNotifier::new()))
        .build()
        .unwrap();
    monitor.run_once().await.unwrap();

    let stored = std::fs::read_to_string(&out).unwrap();
    assert_eq!(stored.lines().count(), 2);
    assert!(stored.contains("\"sql-injection\""));
}
