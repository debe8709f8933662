//! 분류 파이프라인 -- 원시 라인 하나를 분류된 [`LogEntry`]로 바꿉니다.
//!
//! # 처리 순서
//! ```text
//! raw line -> LineParser -> RuleMatcher -> (규칙 매칭 없음) -> AnomalyModel
//!                  |               |                              |
//!          timestamp/level   threat categories            anomaly score/flag
//! ```
//!
//! 파싱은 실패하지 않고, 모델이 없으면 이상 점수 없이 진행합니다.
//! 따라서 [`ClassificationPipeline::classify`]는 어떤 입력에도 엔트리를 돌려줍니다.

use logwarden_core::types::LogEntry;

use crate::anomaly::AnomalyModel;
use crate::error::LogPipelineError;
use crate::parser::{LineParser, ParseOutcome, extract_address};
use crate::rule::RuleMatcher;

/// 분류 파이프라인
///
/// 불변 규칙 테이블과 선택적인 이상 모델 외에는 상태가 없으므로
/// 여러 스레드에서 공유해도 안전합니다.
pub struct ClassificationPipeline {
    parser: LineParser,
    rules: RuleMatcher,
    model: AnomalyModel,
}

impl ClassificationPipeline {
    /// 주어진 규칙 테이블로 파이프라인을 생성합니다. 모델은 학습 전 상태입니다.
    pub fn new(rules: RuleMatcher) -> Result<Self, LogPipelineError> {
        Ok(Self {
            parser: LineParser::with_defaults()?,
            rules,
            model: AnomalyModel::default(),
        })
    }

    /// 내장 규칙만으로 파이프라인을 생성합니다.
    pub fn with_builtin_rules() -> Result<Self, LogPipelineError> {
        Self::new(RuleMatcher::with_builtin_rules()?)
    }

    /// 이상 모델을 설정합니다.
    pub fn with_model(mut self, model: AnomalyModel) -> Self {
        self.model = model;
        self
    }

    /// 실행 중에 학습된 모델로 교체합니다.
    pub fn install_model(&mut self, model: AnomalyModel) {
        tracing::info!(
            samples = model.training_samples(),
            threshold = ?model.threshold(),
            "anomaly model installed"
        );
        self.model = model;
    }

    /// 현재 이상 모델
    pub fn model(&self) -> &AnomalyModel {
        &self.model
    }

    /// 학습된 모델 보유 여부
    pub fn has_model(&self) -> bool {
        self.model.is_trained()
    }

    /// 규칙 테이블
    pub fn rules(&self) -> &RuleMatcher {
        &self.rules
    }

    /// 소스 없이 라인을 분류합니다.
    pub fn classify(&self, raw_line: &str) -> LogEntry {
        self.classify_line("", raw_line)
    }

    /// 라인을 분류합니다.
    ///
    /// 규칙이 하나라도 매칭되면 이상 모델은 호출하지 않습니다.
    pub fn classify_line(&self, source: &str, raw_line: &str) -> LogEntry {
        let outcome = self.parser.parse(raw_line);
        if let ParseOutcome::Parsed { grammar, .. } = &outcome {
            tracing::trace!(grammar, "line parsed");
        }
        let parsed = outcome.into_line();

        let threat_categories = self.rules.classify(&parsed.message);

        let (anomaly_score, is_anomalous) = if threat_categories.is_empty() {
            match self.model.score(&parsed.message) {
                Ok(score) => (Some(score.score), score.is_anomalous),
                Err(_) => (None, false),
            }
        } else {
            (None, false)
        };

        LogEntry {
            source: source.to_owned(),
            timestamp: parsed.timestamp,
            level: parsed.level,
            message: parsed.message,
            raw_line: raw_line.to_owned(),
            source_address: extract_address(raw_line),
            threat_categories,
            anomaly_score,
            is_anomalous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::ModelParams;
    use logwarden_core::types::{LogLevel, ThreatCategory};

    fn pipeline() -> ClassificationPipeline {
        ClassificationPipeline::with_builtin_rules().unwrap()
    }

    fn benign_corpus() -> Vec<String> {
        [
            "User alice logged in from office network",
            "Health check completed successfully",
            "Cache refreshed for tenant default",
            "Scheduled backup finished without errors",
        ]
        .iter()
        .flat_map(|t| std::iter::repeat_n(t.to_string(), 5))
        .collect()
    }

    #[test]
    fn pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClassificationPipeline>();
    }

    #[test]
    fn sql_injection_line_is_classified() {
        let entry = pipeline().classify(
            "2024-01-15 10:00:00 ERROR SQL error: SELECT * FROM users WHERE id='1' OR '1'='1'",
        );
        assert_eq!(entry.level, LogLevel::Error);
        assert!(entry.timestamp.is_some());
        assert!(entry.threat_categories.contains(&ThreatCategory::SqlInjection));
        assert!(entry.is_suspicious());
    }

    #[test]
    fn benign_line_without_model_has_no_score() {
        let entry = pipeline().classify("2024-01-15 10:00:00 INFO User logged in successfully");
        assert!(entry.threat_categories.is_empty());
        assert_eq!(entry.anomaly_score, None);
        assert!(!entry.is_anomalous);
        assert!(!entry.is_suspicious());
    }

    #[test]
    fn raw_line_is_preserved() {
        let raw = "totally unstructured <noise> 10.1.1.1";
        let entry = pipeline().classify_line("/var/log/app.log", raw);
        assert_eq!(entry.raw_line, raw);
        assert_eq!(entry.message, raw);
        assert_eq!(entry.level, LogLevel::Unknown);
        assert_eq!(entry.timestamp, None);
        assert_eq!(entry.source, "/var/log/app.log");
        assert_eq!(entry.source_address, Some("10.1.1.1".parse().unwrap()));
    }

    #[test]
    fn model_is_consulted_only_without_rule_match() {
        let model = AnomalyModel::train(&benign_corpus(), ModelParams::default()).unwrap();
        let pipeline = pipeline().with_model(model);
        assert!(pipeline.has_model());

        let matched = pipeline.classify("Failed password for root from 10.0.0.5 port 22");
        assert_eq!(matched.anomaly_score, None);
        assert!(!matched.is_anomalous);

        let unmatched = pipeline.classify("Health check completed successfully");
        assert!(unmatched.anomaly_score.is_some());
        assert!(!unmatched.is_anomalous);
    }

    #[test]
    fn install_model_replaces_untrained_model() {
        let mut pipeline = pipeline();
        assert!(!pipeline.has_model());
        let model = AnomalyModel::train(&benign_corpus(), ModelParams::default()).unwrap();
        pipeline.install_model(model);
        assert!(pipeline.has_model());
        assert!(pipeline.classify("anything at all").anomaly_score.is_some());
    }

    #[test]
    fn classification_is_deterministic() {
        let pipeline = pipeline();
        let line = "2024-01-15 10:00:00 WARNING GET /../../etc/passwd from 203.0.113.4";
        assert_eq!(pipeline.classify(line), pipeline.classify(line));
    }
}
