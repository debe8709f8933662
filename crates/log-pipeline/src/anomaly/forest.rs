//! 아이솔레이션 포레스트
//!
//! 무작위 축 분할 트리 여러 개로 각 샘플이 고립되기까지의 평균 경로 길이를
//! 측정합니다. 경로가 짧을수록 이상치에 가깝습니다.
//!
//! 점수: `s(x) = 2^(-E[h(x)] / c(ψ))`, 범위 (0, 1], 높을수록 이상.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// 오일러-마스케로니 상수
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// 포레스트 하이퍼파라미터
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// 트리 수
    pub num_trees: usize,
    /// 트리당 서브샘플 크기 (ψ)
    pub sample_size: usize,
    /// 난수 시드
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            num_trees: 100,
            sample_size: 256,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, sample: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let value = sample.get(*feature).copied().unwrap_or(0.0);
                if value <= *threshold {
                    left.path_length(sample, depth + 1)
                } else {
                    right.path_length(sample, depth + 1)
                }
            }
        }
    }
}

/// 학습된 아이솔레이션 포레스트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    /// 실제 사용된 서브샘플 크기 (`min(ψ, n)`)
    sample_size: usize,
}

impl IsolationForest {
    /// 밀집 벡터 샘플로 포레스트를 학습합니다.
    ///
    /// 같은 시드와 같은 입력이면 항상 같은 포레스트가 만들어집니다.
    pub fn fit(samples: &[Vec<f64>], params: ForestParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let sample_size = params.sample_size.min(samples.len()).max(1);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..params.num_trees)
            .map(|_| {
                let indices: Vec<usize> =
                    rand::seq::index::sample(&mut rng, samples.len(), sample_size.min(samples.len()))
                        .into_iter()
                        .collect();
                build_node(samples, indices, 0, max_depth, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// 이상 점수를 계산합니다. 높을수록 이상.
    pub fn score(&self, sample: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normaliser = average_path_length(self.sample_size);
        if normaliser <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / normaliser)
    }

    /// 트리 수
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

fn build_node(
    samples: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let dimensions = samples.first().map_or(0, Vec::len);
    let mut features: Vec<usize> = (0..dimensions).collect();
    features.shuffle(rng);

    // 값이 모두 같은 특성은 분할할 수 없으므로 다음 후보로 넘어감
    for feature in features {
        let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = samples[i][feature];
            (lo.min(v), hi.max(v))
        });
        if max <= min {
            continue;
        }

        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| samples[i][feature] <= threshold);

        return Node::Split {
            feature,
            threshold,
            left: Box::new(build_node(samples, left, depth + 1, max_depth, rng)),
            right: Box::new(build_node(samples, right, depth + 1, max_depth, rng)),
        };
    }

    Node::Leaf {
        size: indices.len(),
    }
}

/// 크기 `n`인 이진 탐색 트리에서 실패 탐색의 평균 경로 길이 `c(n)`
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
