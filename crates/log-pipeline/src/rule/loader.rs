//! 규칙 파일 로더 -- YAML 규칙 파일을 디스크에서 로드합니다.
//!
//! 규칙 파일은 최상위 `rules:` 목록을 가집니다. 경로가 디렉토리이면
//! 그 안의 `.yml`/`.yaml` 파일을 모두 읽으며, 개별 파일 파싱 실패는
//! 경고 로그를 남기고 건너뜁니다.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::LogPipelineError;

use super::types::RuleDef;

/// 규칙 파일 로더 설정
const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULES_COUNT: usize = 10_000;

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleDef>,
}

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// 파일 또는 디렉토리에서 규칙을 로드합니다.
    pub async fn load_path(path: impl AsRef<Path>) -> Result<Vec<RuleDef>, LogPipelineError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read metadata: {e}"),
            })?;

        if metadata.is_dir() {
            Self::load_directory(path).await
        } else {
            Self::load_file(path).await
        }
    }

    /// 디렉토리에서 모든 YAML 규칙 파일을 로드합니다.
    ///
    /// 파일 이름 순서로 처리하며, 먼저 나온 ID가 우선합니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 규칙 수가 `MAX_RULES_COUNT`를 초과하는 경우
    pub async fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<RuleDef>, LogPipelineError> {
        let dir = dir.as_ref();

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: dir.display().to_string(),
                reason: format!("failed to read directory: {e}"),
            })?;

        let mut paths = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("failed to read directory entry: {e}"),
                })?
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if is_yaml {
                paths.push(path);
            }
        }
        paths.sort();

        let mut rules = Vec::new();
        let mut seen_ids = HashSet::new();

        for path in paths {
            match Self::load_file(&path).await {
                Ok(defs) => {
                    for def in defs {
                        if !seen_ids.insert(def.id.clone()) {
                            tracing::warn!(
                                rule_id = %def.id,
                                path = %path.display(),
                                "duplicate rule id, skipping"
                            );
                            continue;
                        }
                        rules.push(def);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load rule file, skipping"
                    );
                }
            }

            if rules.len() > MAX_RULES_COUNT {
                return Err(LogPipelineError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("too many rules: max {MAX_RULES_COUNT}"),
                });
            }
        }

        tracing::info!(
            dir = %dir.display(),
            count = rules.len(),
            "loaded detection rules"
        );

        Ok(rules)
    }

    /// 단일 YAML 파일에서 규칙을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<RuleDef>, LogPipelineError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하여 규칙 목록을 생성합니다.
    ///
    /// 모든 규칙을 검증하며, 하나라도 잘못되면 파일 전체가 거부됩니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Vec<RuleDef>, LogPipelineError> {
        let file: RuleFile =
            serde_yaml::from_str(yaml_str).map_err(|e| LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        if file.rules.len() > MAX_RULES_COUNT {
            return Err(LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("too many rules: max {MAX_RULES_COUNT}"),
            });
        }

        for def in &file.rules {
            def.validate()?;
        }

        Ok(file.rules)
    }
}
