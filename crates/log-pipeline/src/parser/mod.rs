//! 로그 라인 파싱 -- 최선 노력(best-effort) 구조 추출
//!
//! [`LineParser`]는 등록된 문법을 순서대로 시도하여 라인에서 타임스탬프, 레벨,
//! 메시지를 추출합니다. 어떤 문법에도 맞지 않는 라인은 에러가 아니라
//! [`ParseOutcome::Degraded`]로 표현되며, 라인 전체가 메시지가 됩니다.
//!
//! # 지원 형식 (먼저 매칭된 문법 우선)
//! - `2024-01-15 10:00:00 ERROR message` ([`PlainTimestampGrammar`])
//! - `2024-01-15T10:00:00Z [ERROR] message` ([`IsoTimestampGrammar`])
//! - `[2024-01-15 10:00:00] ERROR: message` ([`BracketedTimestampGrammar`])
//! - `Jan 15 10:00:00 host sshd[123]: message` ([`BsdSyslogGrammar`])
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_log_pipeline::parser::LineParser;
//!
//! let parser = LineParser::with_defaults()?;
//! let outcome = parser.parse("2024-01-15 10:00:00 ERROR disk full");
//! assert!(!outcome.is_degraded());
//! ```

pub mod address;
pub mod syslog;
pub mod text;

pub use address::extract_address;
pub use syslog::BsdSyslogGrammar;
pub use text::{BracketedTimestampGrammar, IsoTimestampGrammar, PlainTimestampGrammar};

use chrono::{DateTime, Utc};
use logwarden_core::types::LogLevel;

use crate::error::LogPipelineError;

/// 파싱된 라인의 구조화된 부분
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// 타임스탬프 (문법이 타임스탬프를 포함하지 않으면 `None`)
    pub timestamp: Option<DateTime<Utc>>,
    /// 로그 레벨
    pub level: LogLevel,
    /// 메시지 본문
    pub message: String,
}

/// 파싱 결과
///
/// 파싱은 실패하지 않습니다. 인식할 수 없는 라인은 `Degraded`로 표현됩니다.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// 문법 중 하나에 매칭됨
    Parsed {
        /// 매칭된 문법 이름
        grammar: &'static str,
        /// 추출된 필드
        line: ParsedLine,
    },
    /// 어떤 문법에도 맞지 않음 -- 라인 전체가 메시지
    Degraded(ParsedLine),
}

impl ParseOutcome {
    /// 문법 매칭 실패 여부
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// 추출된 필드를 꺼냅니다.
    pub fn into_line(self) -> ParsedLine {
        match self {
            Self::Parsed { line, .. } | Self::Degraded(line) => line,
        }
    }
}

/// 라인 문법 -- 하나의 로그 형식을 인식합니다.
pub trait LineGrammar: Send + Sync {
    /// 문법 이름 (디버그 로깅용)
    fn name(&self) -> &'static str;

    /// 라인이 이 형식이면 필드를 추출합니다.
    fn parse(&self, line: &str) -> Option<ParsedLine>;
}

/// 라인 파서 -- 등록된 문법을 순서대로 시도합니다.
pub struct LineParser {
    grammars: Vec<Box<dyn LineGrammar>>,
}

impl LineParser {
    /// 문법 없이 파서를 생성합니다. 모든 라인이 `Degraded`가 됩니다.
    pub fn new() -> Self {
        Self {
            grammars: Vec::new(),
        }
    }

    /// 기본 문법 세트로 파서를 생성합니다.
    pub fn with_defaults() -> Result<Self, LogPipelineError> {
        Ok(Self::new()
            .register(Box::new(PlainTimestampGrammar::new()?))
            .register(Box::new(IsoTimestampGrammar::new()?))
            .register(Box::new(BracketedTimestampGrammar::new()?))
            .register(Box::new(BsdSyslogGrammar::new()?)))
    }

    /// 문법을 등록합니다. 등록 순서대로 시도됩니다.
    pub fn register(mut self, grammar: Box<dyn LineGrammar>) -> Self {
        self.grammars.push(grammar);
        self
    }

    /// 라인을 파싱합니다.
    pub fn parse(&self, line: &str) -> ParseOutcome {
        for grammar in &self.grammars {
            if let Some(parsed) = grammar.parse(line) {
                return ParseOutcome::Parsed {
                    grammar: grammar.name(),
                    line: parsed,
                };
            }
        }

        ParseOutcome::Degraded(ParsedLine {
            timestamp: None,
            level: LogLevel::Unknown,
            message: line.to_owned(),
        })
    }

    /// 등록된 문법 이름 목록
    pub fn registered_grammars(&self) -> Vec<&'static str> {
        self.grammars.iter().map(|g| g.name()).collect()
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// 타임스탬프 뒤에 오는 텍스트에서 레벨 토큰을 분리합니다.
///
/// `ERROR`, `[ERROR]`, `ERROR:` 형태를 인식합니다. 첫 토큰이 레벨이 아니면
/// `Unknown` 레벨과 함께 나머지 전체를 메시지로 돌려줍니다.
pub(crate) fn split_level(rest: &str) -> (LogLevel, String) {
    let rest = rest.trim_start();
    let (token, remainder) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim_start()),
        None => (rest, ""),
    };

    let bare = token
        .trim_end_matches(':')
        .trim_start_matches('[')
        .trim_end_matches(']');

    match LogLevel::from_token(bare) {
        Some(level) => (level, remainder.to_owned()),
        None => (LogLevel::Unknown, rest.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> LineParser {
        LineParser::with_defaults().unwrap()
    }

    #[test]
    fn empty_parser_degrades_everything() {
        let parser = LineParser::new();
        let outcome = parser.parse("2024-01-15 10:00:00 ERROR disk full");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_line().message, "2024-01-15 10:00:00 ERROR disk full");
    }

    #[test]
    fn with_defaults_registers_all_grammars() {
        let grammars = parser().registered_grammars();
        assert_eq!(
            grammars,
            vec!["plain-timestamp", "iso-timestamp", "bracketed-timestamp", "bsd-syslog"]
        );
    }

    #[test]
    fn primary_format_is_parsed() {
        let outcome = parser().parse("2024-01-15 10:00:00 ERROR Database connection failed");
        let ParseOutcome::Parsed { grammar, line } = outcome else {
            panic!("expected parsed outcome");
        };
        assert_eq!(grammar, "plain-timestamp");
        assert_eq!(line.level, LogLevel::Error);
        assert_eq!(line.message, "Database connection failed");
        assert_eq!(
            line.timestamp.unwrap().to_rfc3339(),
            "2024-01-15T10:00:00+00:00"
        );
    }

    #[test]
    fn free_text_degrades() {
        let outcome = parser().parse("hello world, nothing structured here");
        assert!(outcome.is_degraded());
        let line = outcome.into_line();
        assert_eq!(line.level, LogLevel::Unknown);
        assert_eq!(line.timestamp, None);
        assert_eq!(line.message, "hello world, nothing structured here");
    }

    #[test]
    fn empty_line_degrades() {
        let line = parser().parse("").into_line();
        assert_eq!(line.message, "");
        assert_eq!(line.level, LogLevel::Unknown);
    }

    #[test]
    fn split_level_variants() {
        assert_eq!(
            split_level("ERROR boom"),
            (LogLevel::Error, "boom".to_owned())
        );
        assert_eq!(
            split_level("[warn] disk 91%"),
            (LogLevel::Warning, "disk 91%".to_owned())
        );
        assert_eq!(
            split_level("INFO: started"),
            (LogLevel::Info, "started".to_owned())
        );
        assert_eq!(
            split_level("GET /index.html 200"),
            (LogLevel::Unknown, "GET /index.html 200".to_owned())
        );
        assert_eq!(split_level("DEBUG"), (LogLevel::Debug, String::new()));
        assert_eq!(split_level(""), (LogLevel::Unknown, String::new()));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_arbitrary_text_does_not_panic(line in "\\PC{0,300}") {
                let _ = parser().parse(&line);
            }

            #[test]
            fn degraded_keeps_whole_line(line in "[a-z ]{0,80}") {
                // 숫자가 없으므로 어떤 타임스탬프 문법에도 맞지 않습니다.
                let outcome = parser().parse(&line);
                prop_assert!(outcome.is_degraded());
                prop_assert_eq!(outcome.into_line().message, line);
            }
        }
    }
}
