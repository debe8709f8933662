//! 규칙 매처 -- 메시지를 위협 카테고리 집합으로 분류합니다.
//!
//! [`RuleMatcher`]는 시작 시점에 한 번 컴파일된 불변 규칙 테이블을 보유합니다.
//! 매칭은 순수 함수이며, 한 메시지가 여러 카테고리에 동시에 매칭될 수 있습니다.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use logwarden_core::types::{Severity, ThreatCategory};

use super::builtin::{BUILTIN_PATTERNS, builtin_rule_id, default_severity};
use super::types::{Rule, RuleDef, RuleStatus};
use crate::error::LogPipelineError;

/// 규칙 매처
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rules: Vec<Rule>,
    /// 카테고리별 최고 심각도
    severities: BTreeMap<ThreatCategory, Severity>,
}

impl RuleMatcher {
    /// 내장 규칙만으로 매처를 생성합니다.
    pub fn with_builtin_rules() -> Result<Self, LogPipelineError> {
        Self::with_extra_rules(Vec::new())
    }

    /// 내장 규칙에 추가 규칙을 더해 매처를 생성합니다.
    ///
    /// 비활성화된 규칙은 건너뜁니다. ID가 중복되거나 패턴이 잘못된
    /// 규칙이 있으면 전체 생성이 실패합니다.
    pub fn with_extra_rules(extra: Vec<RuleDef>) -> Result<Self, LogPipelineError> {
        let mut rules = Vec::with_capacity(BUILTIN_PATTERNS.len() + extra.len());

        for (index, (category, pattern)) in BUILTIN_PATTERNS.iter().enumerate() {
            rules.push(Rule::new(
                builtin_rule_id(*category, index),
                *category,
                pattern,
                default_severity(*category),
            )?);
        }

        let mut seen_ids: HashSet<String> = rules.iter().map(|r| r.id.clone()).collect();
        for def in extra {
            if def.status == RuleStatus::Disabled {
                tracing::debug!(rule_id = %def.id, "skipping disabled rule");
                continue;
            }
            if !seen_ids.insert(def.id.clone()) {
                return Err(LogPipelineError::RuleValidation {
                    rule_id: def.id,
                    reason: "duplicate rule id".to_owned(),
                });
            }
            rules.push(def.compile()?);
        }

        let mut severities = BTreeMap::new();
        for rule in &rules {
            severities
                .entry(rule.category)
                .and_modify(|s: &mut Severity| *s = (*s).max(rule.severity))
                .or_insert(rule.severity);
        }

        Ok(Self { rules, severities })
    }

    /// 메시지에 매칭되는 모든 카테고리를 반환합니다.
    ///
    /// 정상 로그는 빈 집합을 반환합니다.
    pub fn classify(&self, message: &str) -> BTreeSet<ThreatCategory> {
        let mut categories = BTreeSet::new();
        for rule in &self.rules {
            if categories.contains(&rule.category) {
                continue;
            }
            if rule.is_match(message) {
                categories.insert(rule.category);
            }
        }
        categories
    }

    /// 카테고리별 심각도 표
    pub fn severities(&self) -> &BTreeMap<ThreatCategory, Severity> {
        &self.severities
    }

    /// 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> RuleMatcher {
        RuleMatcher::with_builtin_rules().unwrap()
    }

    fn single(category: ThreatCategory) -> BTreeSet<ThreatCategory> {
        BTreeSet::from([category])
    }

    #[test]
    fn benign_message_has_no_categories() {
        assert!(matcher().classify("User logged in successfully").is_empty());
        assert!(matcher().classify("").is_empty());
    }

    #[test]
    fn failed_login() {
        assert_eq!(
            matcher().classify("Failed password for admin from 10.0.0.5 port 22 ssh2"),
            single(ThreatCategory::FailedLogin)
        );
        assert_eq!(
            matcher().classify("Invalid user oracle from 203.0.113.9"),
            single(ThreatCategory::FailedLogin)
        );
    }

    #[test]
    fn sql_injection() {
        assert_eq!(
            matcher().classify("GET /search?q=1 UNION SELECT password"),
            single(ThreatCategory::SqlInjection)
        );
        assert!(
            matcher()
                .classify("login user='admin' or '1'='1'")
                .contains(&ThreatCategory::SqlInjection)
        );
    }

    #[test]
    fn xss() {
        assert_eq!(
            matcher().classify("GET /?q=<script>alert(1)</script>"),
            single(ThreatCategory::Xss)
        );
        assert_eq!(
            matcher().classify("<img src=x onerror=steal()>"),
            single(ThreatCategory::Xss)
        );
    }

    #[test]
    fn directory_traversal() {
        assert_eq!(
            matcher().classify("GET /static/../../etc/passwd"),
            single(ThreatCategory::DirectoryTraversal)
        );
        assert_eq!(
            matcher().classify("GET /static/%2E%2E/secret"),
            single(ThreatCategory::DirectoryTraversal)
        );
    }

    #[test]
    fn unauthorized_access() {
        assert_eq!(
            matcher().classify("Access denied for user bob"),
            single(ThreatCategory::UnauthorizedAccess)
        );
        assert_eq!(
            matcher().classify("HTTP/1.1 403 Forbidden"),
            single(ThreatCategory::UnauthorizedAccess)
        );
    }

    #[test]
    fn port_scan() {
        assert_eq!(
            matcher().classify("Port scan detected from 198.51.100.7"),
            single(ThreatCategory::PortScan)
        );
        assert_eq!(
            matcher().classify("SYN stealth scan detected"),
            single(ThreatCategory::PortScan)
        );
    }

    #[test]
    fn privilege_escalation() {
        assert_eq!(
            matcher().classify("deploy : sudo su root"),
            single(ThreatCategory::PrivilegeEscalation)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            matcher().classify("union all SeLeCt * from users"),
            matcher().classify("UNION ALL SELECT * FROM USERS")
        );
    }

    #[test]
    fn all_matching_categories_are_returned() {
        let categories =
            matcher().classify("GET /../../etc/passwd?q=<script>x</script> 403 Forbidden");
        assert_eq!(
            categories,
            BTreeSet::from([
                ThreatCategory::Xss,
                ThreatCategory::DirectoryTraversal,
                ThreatCategory::UnauthorizedAccess,
            ])
        );
    }

    #[test]
    fn sql_injection_and_xss_are_both_reported() {
        let categories =
            matcher().classify("GET /item?id=1 UNION SELECT name FROM users <script>alert(1)</script>");
        assert_eq!(
            categories,
            BTreeSet::from([ThreatCategory::SqlInjection, ThreatCategory::Xss])
        );
    }

    #[test]
    fn extra_rules_extend_the_table() {
        let def = RuleDef {
            id: "wp_login".to_owned(),
            category: ThreatCategory::FailedLogin,
            pattern: r"POST /wp-login\.php".to_owned(),
            severity: Some(Severity::High),
            status: RuleStatus::Enabled,
            description: String::new(),
        };
        let matcher = RuleMatcher::with_extra_rules(vec![def]).unwrap();
        assert_eq!(matcher.rule_count(), BUILTIN_PATTERNS.len() + 1);
        assert_eq!(
            matcher.classify("POST /wp-login.php HTTP/1.1"),
            single(ThreatCategory::FailedLogin)
        );
        // 추가 규칙이 카테고리 심각도를 끌어올림
        assert_eq!(matcher.severities()[&ThreatCategory::FailedLogin], Severity::High);
    }

    #[test]
    fn disabled_extra_rules_are_skipped() {
        let def = RuleDef {
            id: "noisy".to_owned(),
            category: ThreatCategory::PortScan,
            pattern: "connection".to_owned(),
            severity: None,
            status: RuleStatus::Disabled,
            description: String::new(),
        };
        let matcher = RuleMatcher::with_extra_rules(vec![def]).unwrap();
        assert!(matcher.classify("connection established").is_empty());
    }

    #[test]
    fn duplicate_extra_rule_ids_are_rejected() {
        let def = RuleDef {
            id: "dup".to_owned(),
            category: ThreatCategory::Xss,
            pattern: "x".to_owned(),
            severity: None,
            status: RuleStatus::Enabled,
            description: String::new(),
        };
        let result = RuleMatcher::with_extra_rules(vec![def.clone(), def]);
        assert!(matches!(
            result,
            Err(LogPipelineError::RuleValidation { .. })
        ));
    }
}
