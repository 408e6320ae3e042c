//! Five-field cron schedules for recurring windows
//!
//! Parsing and matching are done by `croner`, the parser behind
//! `tokio-cron-scheduler`. Seconds and years are not accepted, so an
//! expression is always minute, hour, day-of-month, month and day-of-week.
//! When both day fields are restricted a day matches if either of them
//! matches.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use croner::errors::CronError;
use croner::parser::{CronParser, Seconds, Year};
use croner::Cron;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid cron expression '{expression}': {source}")]
pub struct CronParseError {
    expression: String,
    #[source]
    source: CronError,
}

/// Parsed cron expression. Serializes as its source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CronExpr {
    source: String,
    cron: Cron,
}

fn parser() -> CronParser {
    CronParser::builder()
        .seconds(Seconds::Disallowed)
        .year(Year::Disallowed)
        .build()
}

impl CronExpr {
    pub fn parse(expression: &str) -> Result<Self, CronParseError> {
        let source = expression.trim().to_string();
        let cron = parser().parse(&source).map_err(|source_error| CronParseError {
            expression: source.clone(),
            source: source_error,
        })?;
        Ok(Self { source, cron })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the local minute of `at` is an occurrence.
    pub fn matches<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        self.cron.is_time_matching(at).unwrap_or(false)
    }
}

impl PartialEq for CronExpr {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CronExpr {}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for CronExpr {
    type Err = CronParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronExpr::parse(s)
    }
}

impl TryFrom<String> for CronExpr {
    type Error = CronParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CronExpr::parse(&value)
    }
}

impl From<CronExpr> for String {
    fn from(expr: CronExpr) -> Self {
        expr.source
    }
}
