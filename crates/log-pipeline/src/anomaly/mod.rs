//! 이상 탐지 모델 -- 규칙이 놓친 비정상 메시지를 찾습니다.
//!
//! TF-IDF 벡터화([`vectorizer`]) 결과를 아이솔레이션 포레스트([`forest`])로
//! 점수화합니다. 판정 임계값은 학습 시점에 한 번 계산되어 고정되므로,
//! 이후 입력에 따라 움직이지 않습니다.
//!
//! # 임계값
//! 학습 점수의 `(1 - contamination)` 분위수로 보정한 뒤, 학습 샘플 최고 점수
//! 아래로 내려가지 않도록 끌어올립니다. 학습에 쓴 메시지는 다시 점수화해도
//! 이상으로 판정되지 않습니다.
//!
//! 모델은 전역 상태가 아닌 평범한 값입니다. 학습되지 않은 모델은
//! 점수를 요청받으면 [`LogPipelineError::ModelUnavailable`]을 돌려줍니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_log_pipeline::anomaly::{AnomalyModel, ModelParams};
//!
//! let model = AnomalyModel::train(&corpus, ModelParams::default())?;
//! let score = model.score("kernel: unexpected opcode at 0xdeadbeef")?;
//! if score.is_anomalous { /* ... */ }
//! ```

pub mod forest;
pub mod vectorizer;

pub use forest::{ForestParams, IsolationForest};
pub use vectorizer::TfidfVectorizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use logwarden_core::config::MIN_TRAINING_SAMPLES;

use crate::error::LogPipelineError;

/// 어휘 최대 크기
pub const MAX_FEATURES: usize = 100;

/// 기본 오염 비율
pub const DEFAULT_CONTAMINATION: f64 = 0.05;

/// 임계값 비교 허용 오차 (학습 샘플이 임계값과 같은 점수를 받을 때 이상으로 뒤집히지 않도록)
const SCORE_EPSILON: f64 = 1e-9;

/// 모델 하이퍼파라미터
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// 학습 데이터 중 이상으로 간주할 비율 (0, 0.5]
    pub contamination: f64,
    /// 어휘 최대 크기
    pub max_features: usize,
    /// 포레스트 파라미터
    pub forest: ForestParams,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            max_features: MAX_FEATURES,
            forest: ForestParams::default(),
        }
    }
}

impl ModelParams {
    /// 오염 비율을 지정한 기본 파라미터
    pub fn with_contamination(contamination: f64) -> Self {
        Self {
            contamination,
            ..Self::default()
        }
    }
}

/// 이상 점수
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    /// 점수 (높을수록 이상)
    pub score: f64,
    /// 고정 임계값을 넘었는지 여부
    pub is_anomalous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedModel {
    vectorizer: TfidfVectorizer,
    forest: IsolationForest,
    threshold: f64,
    trained_at: DateTime<Utc>,
    training_samples: usize,
}

/// 이상 탐지 모델
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyModel {
    params: ModelParams,
    fitted: Option<FittedModel>,
}

impl AnomalyModel {
    /// 학습되지 않은 모델을 생성합니다.
    pub fn untrained(params: ModelParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    /// 정상 메시지 코퍼스로 모델을 학습합니다.
    ///
    /// # Errors
    /// - 코퍼스가 최소 학습 샘플 수보다 작은 경우 `ModelUnavailable`
    /// - 코퍼스에서 토큰을 하나도 얻지 못한 경우 `ModelUnavailable`
    /// - `contamination`이 (0, 0.5] 범위를 벗어난 경우 `Config`
    pub fn train(corpus: &[String], params: ModelParams) -> Result<Self, LogPipelineError> {
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(LogPipelineError::Config {
                field: "contamination".to_owned(),
                reason: "must be in the range (0, 0.5]".to_owned(),
            });
        }

        if corpus.len() < MIN_TRAINING_SAMPLES {
            return Err(LogPipelineError::ModelUnavailable(format!(
                "need at least {MIN_TRAINING_SAMPLES} training samples, got {}",
                corpus.len()
            )));
        }

        let vectorizer = TfidfVectorizer::fit(corpus, params.max_features)?;
        if vectorizer.dimensions() == 0 {
            return Err(LogPipelineError::ModelUnavailable(
                "training corpus has no usable tokens".to_owned(),
            ));
        }

        let samples: Vec<Vec<f64>> = corpus
            .iter()
            .map(|doc| vectorizer.densify(&vectorizer.transform(doc)))
            .collect();
        let forest = IsolationForest::fit(&samples, params.forest);

        let mut training_scores: Vec<f64> = samples.iter().map(|s| forest.score(s)).collect();
        let calibrated = quantile(&mut training_scores, 1.0 - params.contamination);
        let max_training_score = training_scores.last().copied().unwrap_or(calibrated);
        let threshold = calibrated.max(max_training_score);

        tracing::info!(
            samples = corpus.len(),
            features = vectorizer.dimensions(),
            trees = forest.num_trees(),
            calibrated,
            threshold,
            "anomaly model trained"
        );

        Ok(Self {
            params,
            fitted: Some(FittedModel {
                vectorizer,
                forest,
                threshold,
                trained_at: Utc::now(),
                training_samples: corpus.len(),
            }),
        })
    }

    /// 메시지의 이상 점수를 계산합니다.
    pub fn score(&self, message: &str) -> Result<AnomalyScore, LogPipelineError> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            LogPipelineError::ModelUnavailable("model has not been trained".to_owned())
        })?;

        let dense = fitted
            .vectorizer
            .densify(&fitted.vectorizer.transform(message));
        let score = fitted.forest.score(&dense);
        Ok(AnomalyScore {
            score,
            is_anomalous: score > fitted.threshold + SCORE_EPSILON,
        })
    }

    /// 학습 여부
    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    /// 고정된 판정 임계값
    pub fn threshold(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.threshold)
    }

    /// 학습 시각
    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.fitted.as_ref().map(|f| f.trained_at)
    }

    /// 학습에 사용된 샘플 수
    pub fn training_samples(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.training_samples)
    }

    /// 하이퍼파라미터
    pub fn params(&self) -> &ModelParams {
        &self.params
    }
}

impl Default for AnomalyModel {
    fn default() -> Self {
        Self::untrained(ModelParams::default())
    }
}

/// 선형 보간 분위수. `values`는 정렬됩니다.
fn quantile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::INFINITY;
    }
    values.sort_by(f64::total_cmp);
    let position = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    values[lower] + (values[upper] - values[lower]) * fraction
}
