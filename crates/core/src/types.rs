//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 파이프라인이 생성하고 저장소/알림 협력자에게 값으로 넘기는 데이터 구조를 정의합니다.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 로그 레벨
///
/// 파싱에 실패했거나 레벨 토큰이 없는 라인은 `Unknown`입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    #[default]
    Unknown,
}

impl LogLevel {
    /// 레벨 토큰을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며, 흔한 약어(`WARN`, `CRIT`, `FATAL` 등)도 허용합니다.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Some(Self::Debug),
            "INFO" | "NOTICE" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" | "ERR" => Some(Self::Error),
            "CRITICAL" | "CRIT" | "FATAL" | "ALERT" | "EMERG" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 대문자 레벨 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 위협 카테고리 -- 알려진 공격 시그니처 분류
///
/// `Ord` 구현은 알림 요약에서 카테고리를 안정적인 순서로 나열하기 위해 사용됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatCategory {
    /// 로그인 실패
    FailedLogin,
    /// SQL 인젝션
    SqlInjection,
    /// 크로스 사이트 스크립팅
    Xss,
    /// 디렉토리 순회
    DirectoryTraversal,
    /// 권한 없는 접근
    UnauthorizedAccess,
    /// 포트 스캔
    PortScan,
    /// 권한 상승
    PrivilegeEscalation,
}

impl ThreatCategory {
    /// 모든 카테고리 (선언 순서)
    pub const ALL: [ThreatCategory; 7] = [
        Self::FailedLogin,
        Self::SqlInjection,
        Self::Xss,
        Self::DirectoryTraversal,
        Self::UnauthorizedAccess,
        Self::PortScan,
        Self::PrivilegeEscalation,
    ];

    /// kebab-case 식별자 (`sql-injection` 등)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailedLogin => "failed-login",
            Self::SqlInjection => "sql-injection",
            Self::Xss => "xss",
            Self::DirectoryTraversal => "directory-traversal",
            Self::UnauthorizedAccess => "unauthorized-access",
            Self::PortScan => "port-scan",
            Self::PrivilegeEscalation => "privilege-escalation",
        }
    }

    /// 사람이 읽는 이름
    pub fn title(&self) -> &'static str {
        match self {
            Self::FailedLogin => "Failed Login Attempts",
            Self::SqlInjection => "SQL Injection",
            Self::Xss => "Cross-Site Scripting (XSS)",
            Self::DirectoryTraversal => "Directory Traversal",
            Self::UnauthorizedAccess => "Unauthorized Access",
            Self::PortScan => "Port Scanning",
            Self::PrivilegeEscalation => "Privilege Escalation",
        }
    }

    /// 문자열에서 카테고리를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며 `-`와 `_`를 같은 구분자로 취급합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 정보성 이벤트
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 -- 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 로그 엔트리
///
/// 입력 라인 하나당 한 번 생성되며, 분류가 끝난 뒤에는 변경되지 않습니다.
/// 생성한 파이프라인 호출이 소유하고, 이후 저장소/알림 단계로 값으로 넘겨집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 원본 소스 (감시 중인 파일 경로)
    pub source: String,
    /// 파싱된 타임스탬프 (추출할 수 없으면 `None`)
    pub timestamp: Option<DateTime<Utc>>,
    /// 로그 레벨
    pub level: LogLevel,
    /// 메시지 본문
    pub message: String,
    /// 원본 라인 (항상 보존)
    pub raw_line: String,
    /// 라인에서 추출한 출발지 주소
    pub source_address: Option<IpAddr>,
    /// 매칭된 위협 카테고리 (정상 로그는 비어 있음)
    pub threat_categories: BTreeSet<ThreatCategory>,
    /// 이상 점수 (모델을 사용하지 않았으면 `None`)
    pub anomaly_score: Option<f64>,
    /// 이상 모델 판정
    pub is_anomalous: bool,
}

impl LogEntry {
    /// 의심 엔트리 여부
    ///
    /// 위협 카테고리가 하나 이상이거나 이상 모델이 이상으로 판정한 경우 `true`입니다.
    pub fn is_suspicious(&self) -> bool {
        !self.threat_categories.is_empty() || self.is_anomalous
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp {
            Some(ts) => write!(f, "[{}] ", ts.format("%Y-%m-%d %H:%M:%S"))?,
            None => write!(f, "[-] ")?,
        }
        write!(f, "{} {}", self.level, self.message)?;
        if !self.threat_categories.is_empty() {
            let labels: Vec<&str> = self.threat_categories.iter().map(|c| c.as_str()).collect();
            write!(f, " (threats: {})", labels.join(", "))?;
        }
        Ok(())
    }
}
