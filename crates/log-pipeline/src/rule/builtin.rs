//! 내장 탐지 규칙 테이블
//!
//! 카테고리마다 3~5개의 패턴을 둡니다. 모든 패턴은 대소문자 구분 없이
//! 컴파일되며 시작 시점에 한 번만 빌드됩니다.

use logwarden_core::types::{Severity, ThreatCategory};

/// (카테고리, 패턴) 목록
pub const BUILTIN_PATTERNS: &[(ThreatCategory, &str)] = &[
    // 로그인 실패
    (ThreatCategory::FailedLogin, r"Failed password for .+ from ([\d.]+)"),
    (ThreatCategory::FailedLogin, r"authentication failure.*rhost="),
    (ThreatCategory::FailedLogin, r"Invalid user .+ from"),
    (ThreatCategory::FailedLogin, r"Failed login attempt.*from"),
    (ThreatCategory::FailedLogin, r"FAILED LOGIN.*FROM"),
    // SQL 인젝션
    (
        ThreatCategory::SqlInjection,
        r"union.*select|select.*from.*where|drop.*table|insert.*into|delete.*from",
    ),
    (ThreatCategory::SqlInjection, r"'.*or.*'.*=.*'|'.*or.*1.*=.*1"),
    (ThreatCategory::SqlInjection, r"exec.*xp_|execute.*sp_|';.*--"),
    (ThreatCategory::SqlInjection, r"char.*\(|concat.*\(|load_file"),
    // XSS
    (ThreatCategory::Xss, r"<script[^>]*>.*?</script>"),
    (ThreatCategory::Xss, r"javascript:"),
    (ThreatCategory::Xss, r"onerror\s*="),
    (ThreatCategory::Xss, r"onload\s*="),
    (ThreatCategory::Xss, r"<iframe[^>]*>"),
    // 디렉토리 순회
    (ThreatCategory::DirectoryTraversal, r"\.\./"),
    (ThreatCategory::DirectoryTraversal, r"\.\.\\"),
    (ThreatCategory::DirectoryTraversal, r"%2e%2e/"),
    (ThreatCategory::DirectoryTraversal, r"\.\.%2f"),
    // 권한 없는 접근
    (ThreatCategory::UnauthorizedAccess, r"access denied"),
    (ThreatCategory::UnauthorizedAccess, r"unauthorized access"),
    (ThreatCategory::UnauthorizedAccess, r"permission denied"),
    (ThreatCategory::UnauthorizedAccess, r"403 Forbidden"),
    (ThreatCategory::UnauthorizedAccess, r"401 Unauthorized"),
    // 포트 스캔
    (ThreatCategory::PortScan, r"SYN.*scan.*detected"),
    (ThreatCategory::PortScan, r"Port\s+scan.*from"),
    (ThreatCategory::PortScan, r"Multiple connection attempts.*from"),
    // 권한 상승
    (ThreatCategory::PrivilegeEscalation, r"sudo.*su\s+root"),
    (ThreatCategory::PrivilegeEscalation, r"privilege.*escalation"),
    (ThreatCategory::PrivilegeEscalation, r"root.*access.*granted"),
    (ThreatCategory::PrivilegeEscalation, r"su:\s+authentication\s+failure"),
];

/// 카테고리 기본 심각도
pub fn default_severity(category: ThreatCategory) -> Severity {
    match category {
        ThreatCategory::PrivilegeEscalation => Severity::Critical,
        ThreatCategory::SqlInjection | ThreatCategory::Xss | ThreatCategory::DirectoryTraversal => {
            Severity::High
        }
        ThreatCategory::FailedLogin
        | ThreatCategory::UnauthorizedAccess
        | ThreatCategory::PortScan => Severity::Medium,
    }
}

/// 내장 규칙 ID (`builtin:<category>:<index>`)
pub fn builtin_rule_id(category: ThreatCategory, index: usize) -> String {
    format!("builtin:{category}:{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_three_to_five_patterns() {
        for category in ThreatCategory::ALL {
            let count = BUILTIN_PATTERNS
                .iter()
                .filter(|(c, _)| *c == category)
                .count();
            assert!((3..=5).contains(&count), "{category}: {count}");
        }
    }

    #[test]
    fn all_builtin_patterns_compile() {
        for (category, pattern) in BUILTIN_PATTERNS {
            regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .unwrap_or_else(|e| panic!("{category}: {pattern}: {e}"));
        }
    }

    #[test]
    fn builtin_rule_id_format() {
        assert_eq!(
            builtin_rule_id(ThreatCategory::SqlInjection, 2),
            "builtin:sql-injection:2"
        );
    }
}
