//! Typed coercion and the emptiness predicate shared by JSON and XML views.

use crate::context::AssertContext;
use crate::reporter::FailureKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use std::fmt::Debug;

/// Layout used by `time` assertions when the caller supplies none.
pub const DEFAULT_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of parsing a raw body.
#[derive(Debug, Clone)]
pub(crate) enum Parsed<T> {
    /// Zero-length or whitespace-only source.
    Blank,
    /// Successfully parsed document.
    Document(T),
    /// Non-empty source that failed to parse, with the parser message.
    Malformed(String),
}

impl<T> Parsed<T> {
    pub(crate) fn document(&self) -> Option<&T> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Returns true when the source has no bytes other than whitespace.
pub(crate) fn is_blank(raw: &[u8]) -> bool {
    raw.iter().all(u8::is_ascii_whitespace)
}

/// The single emptiness rule for JSON documents.
///
/// A source is empty when it is blank, when it parses to `null`, `{}`, `[]`
/// or `""`, or when it does not parse at all. The last clause means a
/// malformed body satisfies `empty()`: upstream parse errors are masked
/// rather than reported through emptiness checks.
pub(crate) fn is_effectively_empty(parsed: &Parsed<Value>) -> bool {
    match parsed {
        Parsed::Blank | Parsed::Malformed(_) => true,
        Parsed::Document(value) => match value {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        },
    }
}

/// Short description of a value for failure messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) => format!("array of {} item(s)", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}

pub(crate) fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| integral_f64(n.as_f64()?)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| integral_f64(n.as_f64()?).and_then(|i| u64::try_from(i).ok())),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Only JSON booleans and the literal strings `true` and `false` convert.
pub(crate) fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

/// Parses a string value with a `chrono` layout.
///
/// Layouts carrying an offset compare in UTC; date-only layouts compare at
/// midnight and time-only layouts are read on 1970-01-01.
pub(crate) fn to_time(value: &Value, layout: &str) -> Option<NaiveDateTime> {
    let Value::String(s) = value else {
        return None;
    };
    if let Ok(dt) = DateTime::parse_from_str(s, layout) {
        return Some(dt.naive_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
        return Some(naive);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = NaiveTime::parse_from_str(s, layout).ok()?;
    NaiveDate::from_ymd_opt(1970, 1, 1).map(|date| date.and_time(time))
}

#[allow(clippy::cast_possible_truncation)]
fn integral_f64(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Logs a path assertion skipped because its body did not parse.
pub(crate) fn skip_unparsed(path: &str, reason: &str) {
    tracing::trace!(path, reason, "skipping assertion on unparsed body");
}

/// Runs one typed comparison and reports the outcome.
///
/// `resolved` is `Err` with the parse message when the document itself is
/// malformed; that was reported when the view was built, so the check is
/// skipped. Missing paths, failed coercions and mismatching values are
/// reported as distinct failure kinds.
pub(crate) fn check<T, F>(
    ctx: &AssertContext,
    resolved: Result<Option<Value>, String>,
    path: &str,
    type_name: &str,
    expected: &T,
    coerce: F,
) where
    T: PartialEq + Debug,
    F: FnOnce(&Value) -> Option<T>,
{
    let value = match resolved {
        Err(parse_error) => {
            skip_unparsed(path, &parse_error);
            return;
        }
        Ok(None) => {
            ctx.soft(
                FailureKind::PathMissing,
                format!("path '{path}' does not exist (expected {type_name} {expected:?})"),
            );
            return;
        }
        Ok(Some(value)) => value,
    };

    match coerce(&value) {
        None => ctx.soft(
            FailureKind::TypeMismatch,
            format!(
                "path '{path}': cannot read {} as {type_name}",
                describe(&value)
            ),
        ),
        Some(actual) if actual != *expected => ctx.soft(
            FailureKind::ValueMismatch,
            format!("path '{path}': expected {expected:?}, got {actual:?}"),
        ),
        Some(_) => {}
    }
}
