//! Date normalization
//!
//! Incoming payloads carry dates as RFC 3339 text, MySQL-style datetime text,
//! bare calendar dates or epoch milliseconds. Everything is coerced into a
//! `DateTime<Utc>`, which is the canonical instant used across the crate.
//! Storage literals (`YYYY-MM-DD HH:MM:SS`, UTC) are rendered from that instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Largest absolute epoch offset representable by an ECMAScript date, in milliseconds.
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// Naive datetime layouts accepted in addition to RFC 3339. Interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Layout of the literal written into SQL `DATETIME` columns.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors raised while coercing or rendering dates
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    /// Input was present but does not denote a calendar instant
    #[error("Failed to parse date: {0}")]
    Parse(String),

    /// A canonical instant could not be rendered as a storage literal
    #[error("Failed to convert to storage datetime: {0}")]
    Format(String),
}

/// A date value as it can arrive from a client or from Rust code
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    /// Textual timestamp (RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, ...)
    Text(String),
    /// Milliseconds since the Unix epoch
    EpochMillis(f64),
    /// An already-typed instant
    Instant(DateTime<Utc>),
}

impl DateInput {
    /// Interpret a raw JSON value as a date input.
    ///
    /// `null` maps to `None`. Booleans, arrays and objects are rejected.
    pub fn from_json(value: &Value) -> Result<Option<Self>, DateError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(DateInput::Text(s.clone()))),
            Value::Number(n) => n
                .as_f64()
                .map(|ms| Some(DateInput::EpochMillis(ms)))
                .ok_or_else(|| DateError::Parse(format!("invalid epoch value {}", n))),
            other => Err(DateError::Parse(format!(
                "invalid date type: {}",
                json_type_name(other)
            ))),
        }
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        DateInput::Text(value)
    }
}

impl From<i64> for DateInput {
    fn from(value: i64) -> Self {
        DateInput::EpochMillis(value as f64)
    }
}

impl From<f64> for DateInput {
    fn from(value: f64) -> Self {
        DateInput::EpochMillis(value)
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(value: DateTime<Utc>) -> Self {
        DateInput::Instant(value)
    }
}

/// Parse a date input into a canonical UTC instant.
///
/// Empty or whitespace-only text yields `Ok(None)`.
pub fn parse_date(input: &DateInput) -> Result<Option<DateTime<Utc>>, DateError> {
    match input {
        DateInput::Text(text) if text.trim().is_empty() => Ok(None),
        DateInput::Text(text) => parse_text(text).map(Some),
        DateInput::EpochMillis(ms) => from_epoch_millis(*ms).map(Some),
        DateInput::Instant(instant) => Ok(Some(*instant)),
    }
}

/// Parse an optional raw JSON value. Absent, `null` and `""` yield `Ok(None)`.
pub fn parse_json_date(value: Option<&Value>) -> Result<Option<DateTime<Utc>>, DateError> {
    match value {
        None => Ok(None),
        Some(value) => match DateInput::from_json(value)? {
            Some(input) => parse_date(&input),
            None => Ok(None),
        },
    }
}

/// Canonical textual form of an instant: `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn to_iso_string(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render an instant as a `YYYY-MM-DD HH:MM:SS` UTC literal
pub fn to_storage_literal(instant: Option<&DateTime<Utc>>) -> Option<String> {
    instant.map(|i| i.format(STORAGE_FORMAT).to_string())
}

/// Render canonical instant text as a storage literal.
///
/// Empty text yields `Ok(None)`; text that is not an instant fails with
/// [`DateError::Format`].
pub fn storage_literal_from_iso(text: &str) -> Result<Option<String>, DateError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let instant = parse_text(text).map_err(|_| DateError::Format(format!("invalid instant '{}'", text)))?;
    Ok(to_storage_literal(Some(&instant)))
}

/// Read back a storage literal as an instant
pub fn from_storage_literal(literal: &str) -> Result<DateTime<Utc>, DateError> {
    NaiveDateTime::parse_from_str(literal, STORAGE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| DateError::Parse(format!("invalid storage literal '{}'", literal)))
}

/// Whole days between two instants, rounded up, regardless of order
pub fn date_diff_days(a: &DateTime<Utc>, b: &DateTime<Utc>) -> i64 {
    let elapsed = (*b - *a).num_milliseconds().abs();
    (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// True when `target` lies strictly in the past
pub fn is_overdue(target: &DateTime<Utc>) -> bool {
    is_overdue_at(target, &Utc::now())
}

/// True when `target` is now or later
pub fn is_valid_future_date(target: &DateTime<Utc>) -> bool {
    is_valid_future_date_at(target, &Utc::now())
}

pub fn is_overdue_at(target: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
    target < now
}

pub fn is_valid_future_date_at(target: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
    target >= now
}

fn parse_text(raw: &str) -> Result<DateTime<Utc>, DateError> {
    let text = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(DateError::Parse(format!("invalid date value '{}'", raw)))
}

fn from_epoch_millis(ms: f64) -> Result<DateTime<Utc>, DateError> {
    if !ms.is_finite() || ms.abs() > MAX_EPOCH_MILLIS {
        return Err(DateError::Parse(format!("invalid epoch value {}", ms)));
    }
    DateTime::from_timestamp_millis(ms.trunc() as i64)
        .ok_or_else(|| DateError::Parse(format!("epoch value {} out of range", ms)))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
