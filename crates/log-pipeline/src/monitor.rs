//! 모니터 루프 -- 감시 파일을 주기적으로 폴링해 분류하고 알림을 발송합니다.
//!
//! # 한 주기의 흐름
//! ```text
//! for file in watch_paths:
//!     Tailer::poll -> ClassificationPipeline::classify_line -> EntryStore::append
//!                                                           -> ThresholdAlerter::observe_entry -> Notifier::send
//! ```
//!
//! 커서, 윈도우, 모델은 모두 루프가 단독으로 소유하므로 잠금이 필요 없습니다.
//! 정지 요청은 주기 경계에서만 확인하며, 진행 중인 주기는 항상 끝까지 실행됩니다.
//!
//! 파일 접근 실패는 기록 후 다음 주기에 재시도합니다. 한 파일이
//! `max_consecutive_failures`번 연속으로 실패하면 [`LogPipelineError::Escalated`]로
//! 루프가 종료됩니다. 저장/전송 실패는 기록만 하고 윈도우는 되돌리지 않습니다.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use logwarden_core::event::AlertEvent;
use logwarden_core::metrics as m;
use logwarden_core::pipeline::{EntryStore, Notifier};
use logwarden_core::types::LogEntry;

use crate::alert::ThresholdAlerter;
use crate::anomaly::{AnomalyModel, ModelParams};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::pipeline::ClassificationPipeline;
use crate::rule::RuleMatcher;
use crate::store::{ModelStore, TracingNotifier};
use crate::tailer::{TailCursor, Tailer};

/// 집계 모드 윈도우의 소스 이름
pub const AGGREGATE_SOURCE: &str = "aggregate";

/// 누적 모니터 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// 완료된 주기 수
    pub cycles: u64,
    /// 읽은 라인 수
    pub lines_read: u64,
    /// 의심 엔트리 수
    pub suspicious: u64,
    /// 이상 모델로만 잡힌 엔트리 수
    pub anomalies: u64,
    /// 생성된 알림 수
    pub alerts_emitted: u64,
    /// 전송에 실패한 알림 수
    pub alert_send_failures: u64,
    /// 저장에 실패한 엔트리 수
    pub storage_failures: u64,
    /// 파일 접근 실패 횟수
    pub file_failures: u64,
}

/// 주기 한 번의 결과
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// 이번 주기에 읽은 라인 수
    pub lines_read: usize,
    /// 이번 주기의 의심 엔트리 수
    pub suspicious: usize,
    /// 이번 주기에 생성된 알림
    pub alerts: Vec<AlertEvent>,
    /// 접근에 실패한 파일 수
    pub failed_files: usize,
}

struct WatchedFile {
    cursor: TailCursor,
    consecutive_failures: u32,
}

enum TrainingState {
    Disabled,
    Ready,
    Collecting(Vec<String>),
}

/// 모니터 루프
pub struct MonitorLoop {
    config: PipelineConfig,
    pipeline: ClassificationPipeline,
    tailer: Tailer,
    files: Vec<WatchedFile>,
    alerters: Vec<ThresholdAlerter>,
    store: Option<Arc<dyn EntryStore>>,
    notifier: Arc<dyn Notifier>,
    model_store: Option<Arc<dyn ModelStore>>,
    training: TrainingState,
    stats: MonitorStats,
}

impl MonitorLoop {
    /// 새 빌더를 생성합니다.
    pub fn builder() -> MonitorLoopBuilder {
        MonitorLoopBuilder::new()
    }

    /// 정지 요청이 올 때까지 고정 간격으로 주기를 실행합니다.
    ///
    /// 첫 주기는 즉시 실행됩니다.
    ///
    /// # Errors
    /// 한 파일이 연속 실패 허용 횟수에 도달하면 `Escalated`를 반환합니다.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), LogPipelineError> {
        // 임베더가 설치한 레코더에 메트릭 설명 등록
        m::describe_all();

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            files = self.files.len(),
            interval_secs = self.config.poll_interval_secs,
            threshold = self.config.alert_threshold,
            aggregate = self.config.aggregate_windows,
            model = self.pipeline.has_model(),
            "monitor loop started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "monitor loop escalated");
                return Err(e);
            }
        }

        tracing::info!(
            cycles = self.stats.cycles,
            lines = self.stats.lines_read,
            alerts = self.stats.alerts_emitted,
            "monitor loop stopped"
        );
        Ok(())
    }

    /// 모든 감시 파일에 대해 주기 한 번을 실행합니다.
    ///
    /// 실패한 파일이 있어도 나머지 파일은 이번 주기에 처리됩니다.
    pub async fn run_once(&mut self) -> Result<CycleReport, LogPipelineError> {
        let started = Instant::now();
        let mut report = CycleReport::default();
        let mut escalated = None;

        for index in 0..self.files.len() {
            let result = self.tailer.poll(&self.files[index].cursor).await;
            match result {
                Ok((lines, cursor)) => {
                    let file = &mut self.files[index];
                    if file.consecutive_failures > 0 {
                        tracing::info!(
                            path = %cursor.path.display(),
                            after_failures = file.consecutive_failures,
                            "file access recovered"
                        );
                    }
                    file.consecutive_failures = 0;
                    file.cursor = cursor;
                    self.process_lines(index, &lines, &mut report);
                }
                Err(e) => {
                    report.failed_files += 1;
                    self.stats.file_failures += 1;
                    metrics::counter!(m::MONITOR_CYCLE_FAILURES_TOTAL).increment(1);

                    let file = &mut self.files[index];
                    file.consecutive_failures += 1;
                    tracing::warn!(
                        path = %file.cursor.path.display(),
                        failures = file.consecutive_failures,
                        error = %e,
                        "poll failed"
                    );
                    if file.consecutive_failures >= self.config.max_consecutive_failures
                        && escalated.is_none()
                    {
                        escalated = Some(LogPipelineError::Escalated {
                            path: file.cursor.path.display().to_string(),
                            failures: file.consecutive_failures,
                        });
                    }
                }
            }
        }

        self.maybe_train().await;

        self.stats.cycles += 1;
        metrics::histogram!(m::MONITOR_CYCLE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(
            lines = report.lines_read,
            suspicious = report.suspicious,
            alerts = report.alerts.len(),
            "cycle complete"
        );

        match escalated {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    fn process_lines(&mut self, index: usize, lines: &[String], report: &mut CycleReport) {
        if lines.is_empty() {
            return;
        }
        let source = self.files[index].cursor.path.display().to_string();
        let alerter_index = if self.config.aggregate_windows { 0 } else { index };

        metrics::counter!(m::MONITOR_LINES_READ_TOTAL).increment(lines.len() as u64);
        report.lines_read += lines.len();
        self.stats.lines_read += lines.len() as u64;

        for line in lines {
            let entry = self.pipeline.classify_line(&source, line);
            metrics::counter!(m::MONITOR_ENTRIES_CLASSIFIED_TOTAL).increment(1);
            self.record_classification(&entry, report);

            if let Some(store) = &self.store
                && let Err(e) = store.append(&entry)
            {
                self.stats.storage_failures += 1;
                metrics::counter!(m::MONITOR_STORAGE_FAILURES_TOTAL).increment(1);
                tracing::warn!(store = store.name(), error = %e, "failed to store entry");
            }

            if let Some(event) = self.alerters[alerter_index].observe_entry(&entry) {
                self.dispatch(event, report);
            }

            if let TrainingState::Collecting(corpus) = &mut self.training
                && !entry.is_suspicious()
            {
                corpus.push(entry.message);
            }
        }
    }

    fn record_classification(&mut self, entry: &LogEntry, report: &mut CycleReport) {
        for category in &entry.threat_categories {
            metrics::counter!(m::MONITOR_RULE_MATCHES_TOTAL, m::LABEL_CATEGORY => category.as_str())
                .increment(1);
        }
        if !entry.is_suspicious() {
            return;
        }
        report.suspicious += 1;
        self.stats.suspicious += 1;
        metrics::counter!(m::MONITOR_SUSPICIOUS_TOTAL).increment(1);

        if entry.threat_categories.is_empty() {
            self.stats.anomalies += 1;
            metrics::counter!(m::MONITOR_ANOMALIES_TOTAL).increment(1);
        }
    }

    fn dispatch(&mut self, event: AlertEvent, report: &mut CycleReport) {
        self.stats.alerts_emitted += 1;
        match self.notifier.send(&event) {
            Ok(()) => {
                metrics::counter!(m::MONITOR_ALERTS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
            }
            Err(e) => {
                self.stats.alert_send_failures += 1;
                metrics::counter!(m::MONITOR_ALERTS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                tracing::warn!(
                    notifier = self.notifier.name(),
                    alert_id = %event.id,
                    error = %e,
                    "failed to send alert"
                );
            }
        }
        report.alerts.push(event);
    }

    async fn maybe_train(&mut self) {
        let ready = matches!(
            &self.training,
            TrainingState::Collecting(corpus) if corpus.len() >= self.config.min_training_samples
        );
        if !ready {
            return;
        }
        let TrainingState::Collecting(corpus) =
            std::mem::replace(&mut self.training, TrainingState::Ready)
        else {
            return;
        };

        let params = ModelParams::with_contamination(self.config.contamination);
        let samples = corpus.len();
        let trained = tokio::task::spawn_blocking(move || AnomalyModel::train(&corpus, params))
            .await
            .unwrap_or_else(|e| Err(LogPipelineError::ModelUnavailable(e.to_string())));

        match trained {
            Ok(model) => {
                metrics::counter!(m::MODEL_TRAININGS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
                if let Some(model_store) = &self.model_store
                    && let Err(e) = model_store.save(&model)
                {
                    tracing::warn!(error = %e, "failed to persist anomaly model");
                }
                self.pipeline.install_model(model);
            }
            Err(e) => {
                metrics::counter!(m::MODEL_TRAININGS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                tracing::warn!(samples, error = %e, "anomaly model training failed, collecting again");
                self.training = TrainingState::Collecting(Vec::new());
            }
        }
    }

    /// 누적 통계
    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// 분류 파이프라인
    pub fn pipeline(&self) -> &ClassificationPipeline {
        &self.pipeline
    }

    /// 설정
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 파일별 현재 커서
    pub fn cursors(&self) -> impl Iterator<Item = &TailCursor> {
        self.files.iter().map(|f| &f.cursor)
    }

    /// 자동 학습용으로 모은 정상 메시지 수 (수집 중이 아니면 `None`)
    pub fn training_progress(&self) -> Option<usize> {
        match &self.training {
            TrainingState::Collecting(corpus) => Some(corpus.len()),
            TrainingState::Disabled | TrainingState::Ready => None,
        }
    }

    /// 현재 윈도우의 의심 엔트리 수 (파일 순서, 집계 모드에서는 하나)
    pub fn pending_counts(&self) -> Vec<u64> {
        self.alerters
            .iter()
            .map(|a| a.window().suspicious_count)
            .collect()
    }
}

/// 모니터 루프 빌더
pub struct MonitorLoopBuilder {
    config: PipelineConfig,
    rules: Option<RuleMatcher>,
    model: Option<AnomalyModel>,
    store: Option<Arc<dyn EntryStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    model_store: Option<Arc<dyn ModelStore>>,
}

impl MonitorLoopBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            rules: None,
            model: None,
            store: None,
            notifier: None,
            model_store: None,
        }
    }

    /// 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 규칙 테이블을 지정합니다. 지정하지 않으면 내장 규칙을 사용합니다.
    pub fn rules(mut self, rules: RuleMatcher) -> Self {
        self.rules = Some(rules);
        self
    }

    /// 학습된 모델을 지정합니다. 모델 저장소보다 우선합니다.
    pub fn model(mut self, model: AnomalyModel) -> Self {
        self.model = Some(model);
        self
    }

    /// 엔트리 저장소를 지정합니다.
    pub fn entry_store(mut self, store: Arc<dyn EntryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 알림 전송 구현을 지정합니다. 기본값은 [`TracingNotifier`]입니다.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// 모델 저장소를 지정합니다.
    pub fn model_store(mut self, model_store: Arc<dyn ModelStore>) -> Self {
        self.model_store = Some(model_store);
        self
    }

    /// 모니터 루프를 빌드합니다.
    ///
    /// 모델이 주어지지 않았고 이상 탐지가 켜져 있으면 모델 저장소에서 읽어오고,
    /// 저장된 모델도 없으면 스트림의 정상 메시지로 학습할 때까지 수집합니다.
    pub fn build(self) -> Result<MonitorLoop, LogPipelineError> {
        self.config.validate()?;

        let rules = match self.rules {
            Some(rules) => rules,
            None => RuleMatcher::with_builtin_rules()?,
        };
        let severities = rules.severities().clone();
        let mut pipeline = ClassificationPipeline::new(rules)?;

        let mut training = TrainingState::Disabled;
        if self.config.ml_enabled {
            let model = match self.model {
                Some(model) => Some(model),
                None => self.model_store.as_ref().and_then(|store| match store.load() {
                    Ok(model) => model,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to load anomaly model, will retrain");
                        None
                    }
                }),
            };
            training = match model.filter(AnomalyModel::is_trained) {
                Some(model) => {
                    pipeline.install_model(model);
                    TrainingState::Ready
                }
                None => {
                    tracing::info!(
                        samples = self.config.min_training_samples,
                        "no anomaly model available, collecting training samples"
                    );
                    TrainingState::Collecting(Vec::new())
                }
            };
        }

        let files: Vec<WatchedFile> = self
            .config
            .watch_paths
            .iter()
            .map(|path| WatchedFile {
                cursor: initial_cursor(path, self.config.start_at_end),
                consecutive_failures: 0,
            })
            .collect();

        let alerter = |source: String| {
            ThresholdAlerter::new(self.config.alert_threshold, source)
                .map(|a| a.with_severities(severities.clone()))
        };
        let alerters = if self.config.aggregate_windows {
            vec![alerter(AGGREGATE_SOURCE.to_owned())?]
        } else {
            self.config
                .watch_paths
                .iter()
                .map(|p| alerter(p.display().to_string()))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(MonitorLoop {
            tailer: Tailer::new().with_max_bytes_per_poll(self.config.max_bytes_per_poll),
            config: self.config,
            pipeline,
            files,
            alerters,
            store: self.store,
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(TracingNotifier)),
            model_store: self.model_store,
            training,
            stats: MonitorStats::default(),
        })
    }
}

impl Default for MonitorLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 시작 커서를 만듭니다. 끝에서 시작하더라도 파일이 아직 없으면 처음부터 읽습니다.
fn initial_cursor(path: &Path, start_at_end: bool) -> TailCursor {
    if start_at_end && let Ok(cursor) = TailCursor::at_end(path) {
        return cursor;
    }
    TailCursor::new(path)
}

/// 파일 전체를 읽어 정상 메시지로 모델을 학습합니다.
///
/// 규칙에 매칭되는 라인은 학습 코퍼스에서 제외됩니다.
pub async fn train_from_file(
    path: impl AsRef<Path>,
    rules: RuleMatcher,
    params: ModelParams,
) -> Result<AnomalyModel, LogPipelineError> {
    let path = path.as_ref();
    let pipeline = ClassificationPipeline::new(rules)?;
    let tailer = Tailer::new();

    let mut cursor = TailCursor::new(path);
    let mut corpus = Vec::new();
    let mut skipped = 0usize;
    loop {
        let (lines, next) = tailer.poll(&cursor).await?;
        let done = next.byte_offset == cursor.byte_offset || next.byte_offset >= next.last_size;
        for line in &lines {
            let entry = pipeline.classify_line("", line);
            if entry.threat_categories.is_empty() {
                corpus.push(entry.message);
            } else {
                skipped += 1;
            }
        }
        cursor = next;
        if done {
            break;
        }
    }

    tracing::info!(
        path = %path.display(),
        samples = corpus.len(),
        skipped,
        "training corpus collected"
    );
    tokio::task::spawn_blocking(move || AnomalyModel::train(&corpus, params))
        .await
        .map_err(|e| LogPipelineError::ModelUnavailable(e.to_string()))?
}
