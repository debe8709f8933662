//! TF-IDF 벡터화
//!
//! 메시지를 소문자로 바꾼 뒤 두 글자 이상의 단어 토큰(`\w\w+`)으로 나누고,
//! 학습 코퍼스에서 가장 자주 등장한 `max_features`개 용어로 어휘를 만듭니다.
//! 벡터는 `tf * idf`를 L2 정규화한 희소 벡터입니다.
//!
//! IDF는 스무딩된 형태 `ln((1 + n) / (1 + df)) + 1`을 사용합니다.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// 토큰 패턴 (유니코드 단어 문자 2개 이상)
const TOKEN_PATTERN: &str = r"\w\w+";

/// 희소 벡터 -- (특성 인덱스, 값), 인덱스 오름차순
pub type SparseVector = Vec<(usize, f64)>;

/// 학습된 TF-IDF 벡터화기
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// 용어 → 특성 인덱스 (용어 사전순으로 부여)
    vocabulary: BTreeMap<String, usize>,
    /// 특성 인덱스별 IDF 가중치
    idf: Vec<f64>,
    #[serde(skip, default = "token_regex")]
    tokenizer: Option<Regex>,
}

fn token_regex() -> Option<Regex> {
    Regex::new(TOKEN_PATTERN).ok()
}

impl TfidfVectorizer {
    /// 코퍼스로 어휘와 IDF를 학습합니다.
    pub fn fit(corpus: &[String], max_features: usize) -> Result<Self, LogPipelineError> {
        let tokenizer = Regex::new(TOKEN_PATTERN)?;

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in corpus {
            let tokens = tokenize(&tokenizer, doc);
            let mut seen = std::collections::HashSet::new();
            for token in tokens {
                if seen.insert(token.clone()) {
                    *doc_freq.entry(token.clone()).or_default() += 1;
                }
                *term_counts.entry(token).or_default() += 1;
            }
        }

        // 빈도 내림차순, 동률은 사전순
        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n_docs = corpus.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(terms.len());
        for (index, term) in terms.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Ok(Self {
            vocabulary,
            idf,
            tokenizer: Some(tokenizer),
        })
    }

    /// 특성 수 (어휘 크기)
    pub fn dimensions(&self) -> usize {
        self.idf.len()
    }

    /// 어휘에 포함된 용어인지 확인합니다.
    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// 메시지를 L2 정규화된 희소 벡터로 변환합니다.
    ///
    /// 어휘에 없는 용어만 있는 메시지는 빈 벡터가 됩니다.
    pub fn transform(&self, message: &str) -> SparseVector {
        let Some(tokenizer) = self.tokenizer.as_ref() else {
            return SparseVector::new();
        };

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(tokenizer, message) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut vector {
                *value /= norm;
            }
        }
        vector
    }

    /// 희소 벡터를 밀집 벡터로 펼칩니다.
    pub fn densify(&self, sparse: &SparseVector) -> Vec<f64> {
        let mut dense = vec![0.0; self.dimensions()];
        for &(index, value) in sparse {
            dense[index] = value;
        }
        dense
    }
}

fn tokenize(tokenizer: &Regex, text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    tokenizer
        .find_iter(&lowered)
        .map(|m| m.as_str().to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        [
            "User alice logged in",
            "User bob logged in",
            "User alice logged out",
            "Health check ok",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn vocabulary_is_capped() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), 3).unwrap();
        assert_eq!(vectorizer.dimensions(), 3);
        // 가장 빈번한 용어: user(3), logged(3), alice(2) / in(2)
        assert!(vectorizer.contains_term("user"));
        assert!(vectorizer.contains_term("logged"));
        assert!(vectorizer.contains_term("alice"));
        assert!(!vectorizer.contains_term("check"));
    }

    #[test]
    fn single_character_tokens_are_ignored() {
        let docs = vec!["a b c dd".to_owned()];
        let vectorizer = TfidfVectorizer::fit(&docs, 100).unwrap();
        assert_eq!(vectorizer.dimensions(), 1);
        assert!(vectorizer.contains_term("dd"));
    }

    #[test]
    fn tokens_are_lowercased() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        assert_eq!(
            vectorizer.transform("USER ALICE"),
            vectorizer.transform("user alice")
        );
    }

    #[test]
    fn vectors_are_unit_length() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        let vector = vectorizer.transform("User alice logged in twice");
        let norm: f64 = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_terms_produce_empty_vector() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        assert!(vectorizer.transform("zzz qqq").is_empty());
        assert!(vectorizer.transform("").is_empty());
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        let dense = vectorizer.densify(&vectorizer.transform("user health"));
        let user = dense[vectorizer.vocabulary["user"]];
        let health = dense[vectorizer.vocabulary["health"]];
        assert!(health > user);
    }

    #[test]
    fn survives_serde_round_trip() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), 100).unwrap();
        let json = serde_json::to_string(&vectorizer).unwrap();
        let restored: TfidfVectorizer = serde_json::from_str(&json).unwrap();
        let a = restored.transform("User bob logged in");
        let b = vectorizer.transform("User bob logged in");
        assert_eq!(a.len(), b.len());
        for ((ia, va), (ib, vb)) in a.iter().zip(&b) {
            assert_eq!(ia, ib);
            assert!((va - vb).abs() < 1e-12);
        }
    }
}
