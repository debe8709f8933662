//! BSD syslog (RFC 3164) 라인 문법
//!
//! 형식: `MMM DD HH:MM:SS hostname tag[pid]: message`
//!
//! 원격 syslog 데몬이 파일로 떨어뜨린 라인에는 PRI 필드가 없으므로
//! 여기서는 PRI 없이 시작하는 형태만 다룹니다. 레벨 정보가 없어 항상
//! `Unknown` 레벨이 됩니다.

use chrono::{Datelike, NaiveDateTime, Utc};
use regex::Regex;

use logwarden_core::types::LogLevel;

use super::{LineGrammar, ParsedLine};
use crate::error::LogPipelineError;

/// BSD syslog 문법
pub struct BsdSyslogGrammar {
    pattern: Regex,
}

impl BsdSyslogGrammar {
    /// 새 문법을 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(
                r"^([A-Z][a-z]{2})\s+(\d{1,2})\s+(\d{2}:\d{2}:\d{2})\s+(\S+)\s+([^\s:\[]+)(?:\[(\d+)\])?:\s*(.*)$",
            )?,
        })
    }

    /// BSD syslog 타임스탬프를 파싱합니다.
    ///
    /// 연도 정보가 없으므로 현재 연도를 가정합니다.
    fn parse_timestamp(month: &str, day: &str, time: &str) -> Option<chrono::DateTime<Utc>> {
        let current_year = Utc::now().year();
        let with_year = format!("{current_year} {month} {day} {time}");
        NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl LineGrammar for BsdSyslogGrammar {
    fn name(&self) -> &'static str {
        "bsd-syslog"
    }

    fn parse(&self, line: &str) -> Option<ParsedLine> {
        let caps = self.pattern.captures(line)?;
        let timestamp = Self::parse_timestamp(&caps[1], &caps[2], &caps[3])?;
        Some(ParsedLine {
            timestamp: Some(timestamp),
            level: LogLevel::Unknown,
            message: caps[7].to_owned(),
        })
    }
}
