//! 탐지 규칙 데이터 타입
//!
//! [`RuleDef`]는 YAML 규칙 파일에서 역직렬화되는 선언이고,
//! [`Rule`]은 정규식이 컴파일되어 매칭에 바로 쓸 수 있는 형태입니다.

use logwarden_core::types::{Severity, ThreatCategory};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// 컴파일된 정규식 크기 상한
const MAX_REGEX_SIZE: usize = 1024 * 1024;

/// 규칙 ID 최대 길이
const MAX_RULE_ID_LEN: usize = 256;

/// 규칙 선언 -- YAML 규칙 파일의 한 항목
///
/// # YAML 스키마
/// ```yaml
/// rules:
///   - id: wp_login_bruteforce
///     category: failed-login
///     pattern: 'POST /wp-login\.php .* 200'
///     severity: medium
///     description: WordPress login form hammering
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    /// 규칙 고유 ID
    pub id: String,
    /// 위협 카테고리
    pub category: ThreatCategory,
    /// 정규식 패턴 (대소문자 구분 없이 컴파일됨)
    pub pattern: String,
    /// 심각도 (생략하면 카테고리 기본값)
    #[serde(default)]
    pub severity: Option<Severity>,
    /// 규칙 상태
    #[serde(default)]
    pub status: RuleStatus,
    /// 규칙 설명
    #[serde(default)]
    pub description: String,
}

impl RuleDef {
    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.id.is_empty() {
            return Err(LogPipelineError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(LogPipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
            });
        }

        if self.pattern.trim().is_empty() {
            return Err(LogPipelineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule pattern must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// 정규식을 컴파일하여 [`Rule`]을 만듭니다.
    pub fn compile(&self) -> Result<Rule, LogPipelineError> {
        self.validate()?;
        Rule::new(
            self.id.clone(),
            self.category,
            &self.pattern,
            self.severity
                .unwrap_or_else(|| super::builtin::default_severity(self.category)),
        )
    }
}

/// 규칙 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// 활성화 (기본값)
    #[default]
    Enabled,
    /// 비활성화 -- 로딩은 되지만 규칙 테이블에 들어가지 않음
    Disabled,
}

/// 컴파일된 규칙
#[derive(Debug, Clone)]
pub struct Rule {
    /// 규칙 ID
    pub id: String,
    /// 위협 카테고리
    pub category: ThreatCategory,
    /// 대소문자 구분 없는 정규식
    pub pattern: Regex,
    /// 심각도
    pub severity: Severity,
}

impl Rule {
    /// 패턴을 대소문자 구분 없이 컴파일합니다.
    pub fn new(
        id: impl Into<String>,
        category: ThreatCategory,
        pattern: &str,
        severity: Severity,
    ) -> Result<Self, LogPipelineError> {
        let id = id.into();
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(MAX_REGEX_SIZE)
            .build()
            .map_err(|e| LogPipelineError::RuleValidation {
                rule_id: id.clone(),
                reason: format!("invalid pattern: {e}"),
            })?;

        Ok(Self {
            id,
            category,
            pattern: regex,
            severity,
        })
    }

    /// 메시지가 규칙에 매칭되는지 확인합니다.
    pub fn is_match(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_def() -> RuleDef {
        RuleDef {
            id: "wp_login".to_owned(),
            category: ThreatCategory::FailedLogin,
            pattern: r"POST /wp-login\.php".to_owned(),
            severity: None,
            status: RuleStatus::Enabled,
            description: String::new(),
        }
    }

    #[test]
    fn valid_rule_passes_validation() {
        sample_def().validate().unwrap();
    }

    #[test]
    fn empty_id_fails_validation() {
        let mut def = sample_def();
        def.id = String::new();
        assert!(def.validate().is_err());
    }

    #[test]
    fn too_long_id_fails_validation() {
        let mut def = sample_def();
        def.id = "x".repeat(300);
        assert!(def.validate().is_err());
    }

    #[test]
    fn blank_pattern_fails_validation() {
        let mut def = sample_def();
        def.pattern = "   ".to_owned();
        assert!(def.validate().is_err());
    }

    #[test]
    fn invalid_regex_fails_compile() {
        let mut def = sample_def();
        def.pattern = "(unclosed".to_owned();
        let err = def.compile().unwrap_err();
        assert!(matches!(err, LogPipelineError::RuleValidation { .. }));
    }

    #[test]
    fn compile_uses_category_default_severity() {
        let rule = sample_def().compile().unwrap();
        assert_eq!(rule.severity, Severity::Medium);

        let mut def = sample_def();
        def.severity = Some(Severity::Critical);
        assert_eq!(def.compile().unwrap().severity, Severity::Critical);
    }

    #[test]
    fn compiled_rule_is_case_insensitive() {
        let rule = sample_def().compile().unwrap();
        assert!(rule.is_match("post /WP-LOGIN.php HTTP/1.1"));
        assert!(!rule.is_match("GET /index.html"));
    }

    #[test]
    fn rule_status_default_is_enabled() {
        assert_eq!(RuleStatus::default(), RuleStatus::Enabled);
    }

    #[test]
    fn rule_from_yaml() {
        let yaml = r#"
id: ssh_root_login
category: privilege-escalation
pattern: 'Accepted .* for root'
severity: high
status: disabled
"#;
        let def: RuleDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.category, ThreatCategory::PrivilegeEscalation);
        assert_eq!(def.severity, Some(Severity::High));
        assert_eq!(def.status, RuleStatus::Disabled);
    }
}
