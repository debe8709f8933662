//! 타임스탬프로 시작하는 텍스트 로그 문법
//!
//! 애플리케이션 로그에서 흔한 세 가지 형태를 인식합니다. 타임스탬프가
//! 달력상 유효하지 않으면 (예: 13월) 해당 문법은 매칭되지 않은 것으로 취급합니다.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use regex::Regex;

use super::{LineGrammar, ParsedLine, split_level};
use crate::error::LogPipelineError;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `YYYY-MM-DD HH:MM:SS[.fff] LEVEL message`
pub struct PlainTimestampGrammar {
    pattern: Regex,
}

impl PlainTimestampGrammar {
    /// 새 문법을 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(
                r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})(?:[.,](\d{1,9}))?(?:\s+(.*))?$",
            )?,
        })
    }
}

impl LineGrammar for PlainTimestampGrammar {
    fn name(&self) -> &'static str {
        "plain-timestamp"
    }

    fn parse(&self, line: &str) -> Option<ParsedLine> {
        let caps = self.pattern.captures(line)?;
        let timestamp = parse_naive(&caps[1], caps.get(2).map(|m| m.as_str()))?;
        let (level, message) = split_level(caps.get(3).map_or("", |m| m.as_str()));
        Some(ParsedLine {
            timestamp: Some(timestamp),
            level,
            message,
        })
    }
}

/// `YYYY-MM-DDTHH:MM:SS[.fff][Z|±HH:MM] [LEVEL] message`
pub struct IsoTimestampGrammar {
    pattern: Regex,
}

impl IsoTimestampGrammar {
    /// 새 문법을 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(
                r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?)(Z|[+-]\d{2}:?\d{2})?(?:\s+(.*))?$",
            )?,
        })
    }

    fn parse_timestamp(datetime: &str, zone: Option<&str>) -> Option<DateTime<Utc>> {
        match zone {
            None | Some("Z") => {
                NaiveDateTime::parse_from_str(datetime, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }
            Some(offset) => {
                let offset = offset.replace(':', "");
                DateTime::parse_from_str(&format!("{datetime}{offset}"), "%Y-%m-%dT%H:%M:%S%.f%z")
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }
}

impl LineGrammar for IsoTimestampGrammar {
    fn name(&self) -> &'static str {
        "iso-timestamp"
    }

    fn parse(&self, line: &str) -> Option<ParsedLine> {
        let caps = self.pattern.captures(line)?;
        let timestamp = Self::parse_timestamp(&caps[1], caps.get(2).map(|m| m.as_str()))?;
        let (level, message) = split_level(caps.get(3).map_or("", |m| m.as_str()));
        Some(ParsedLine {
            timestamp: Some(timestamp),
            level,
            message,
        })
    }
}

/// `[YYYY-MM-DD HH:MM:SS] LEVEL: message`
pub struct BracketedTimestampGrammar {
    pattern: Regex,
}

impl BracketedTimestampGrammar {
    /// 새 문법을 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(
                r"^\[(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2}:\d{2})(?:[.,](\d{1,9}))?\](?:\s*(.*))?$",
            )?,
        })
    }
}

impl LineGrammar for BracketedTimestampGrammar {
    fn name(&self) -> &'static str {
        "bracketed-timestamp"
    }

    fn parse(&self, line: &str) -> Option<ParsedLine> {
        let caps = self.pattern.captures(line)?;
        let datetime = format!("{} {}", &caps[1], &caps[2]);
        let timestamp = parse_naive(&datetime, caps.get(3).map(|m| m.as_str()))?;
        let (level, message) = split_level(caps.get(4).map_or("", |m| m.as_str()));
        Some(ParsedLine {
            timestamp: Some(timestamp),
            level,
            message,
        })
    }
}

/// `YYYY-MM-DD HH:MM:SS`와 선택적 소수 초를 UTC로 해석합니다.
fn parse_naive(datetime: &str, fraction: Option<&str>) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(datetime, DATE_TIME_FORMAT).ok()?;
    let naive = match fraction {
        Some(digits) => {
            // 9자리로 맞춰 나노초로 환산
            let nanos: u32 = format!("{digits:0<9}").parse().ok()?;
            naive.with_nanosecond(nanos)?
        }
        None => naive,
    };
    Some(naive.and_utc())
}
