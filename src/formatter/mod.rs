//! Conversion of [`Value`]s into single-line text.
//!
//! Dates render as ISO-8601, structured values are either flattened into
//! `key=value ` pairs or serialised as JSON, and scalars use their canonical
//! text. Every newline in the result is replaced with U+2028 so one entry
//! never spans more than one transport line.

mod timestamp;

use std::{fmt::Write as _, io};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{error::LogError, value::Value};

pub use timestamp::{TimestampSource, TimestampValue};

/// Replacement for `\n` inside formatted values.
pub const LINE_SEPARATOR: char = '\u{2028}';

/// Trait for turning log values into message text.
///
/// Implementors must be thread-safe (`Send + Sync`) because the logger may
/// be shared across threads.
pub trait ValueFormatter: Send + Sync {
    /// Format `value` into a single line.
    fn format(&self, value: &Value) -> Result<String, LogError>;
}

/// Formatter implementing the flatten/JSON rules.
#[derive(Copy, Clone, Debug)]
pub struct DefaultFormatter {
    flatten: bool,
}

impl Default for DefaultFormatter {
    fn default() -> Self {
        Self { flatten: true }
    }
}

impl DefaultFormatter {
    /// Create a formatter; `flatten = false` selects JSON for structures.
    pub fn new(flatten: bool) -> Self {
        Self { flatten }
    }

    pub fn flatten(&self) -> bool {
        self.flatten
    }
}

impl ValueFormatter for DefaultFormatter {
    fn format(&self, value: &Value) -> Result<String, LogError> {
        let text = match value {
            Value::DateTime(dt) => iso8601(dt),
            Value::List(_) | Value::Map(_) if self.flatten => flatten(value),
            Value::List(_) | Value::Map(_) => to_json(value)?,
            scalar => scalar_text(scalar),
        };
        Ok(escape_newlines(text))
    }
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso8601(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn escape_newlines(text: String) -> String {
    if text.contains('\n') {
        text.chars()
            .map(|c| if c == '\n' { LINE_SEPARATOR } else { c })
            .collect()
    } else {
        text
    }
}

/// JSON formatter writing floats with [`number_text`].
///
/// Non-finite values never reach it; `Value` serialises them as `null`.
struct NumberTextFormatter;

impl serde_json::ser::Formatter for NumberTextFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(number_text(value).as_bytes())
    }
}

fn to_json(value: &Value) -> Result<String, LogError> {
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, NumberTextFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| LogError::Format(e.to_string()))?;
    String::from_utf8(out).map_err(|e| LogError::Format(e.to_string()))
}

/// Flatten a structured value into `path=value ` pairs.
pub fn flatten(value: &Value) -> String {
    let mut out = String::new();
    flatten_into(&mut out, "", value);
    out
}

fn flatten_into(out: &mut String, prefix: &str, value: &Value) {
    let mut visit = |key: &str, child: &Value| {
        let path = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}.{key}")
        };
        if child.is_structured() {
            flatten_into(out, &path, child);
        } else {
            let _ = write!(out, "{path}={} ", leaf_text(child));
        }
    };
    match value {
        Value::Map(entries) => {
            for (key, child) in entries {
                visit(key, child);
            }
        }
        Value::List(items) => {
            for (idx, child) in items.iter().enumerate() {
                visit(&idx.to_string(), child);
            }
        }
        _ => {}
    }
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::DateTime(dt) => iso8601(dt),
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Undefined => "undefined".into(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => number_text(*f),
        Value::String(s) => s.clone(),
        Value::DateTime(dt) => iso8601(dt),
        // Structured values never reach here; callers dispatch them first.
        Value::List(_) | Value::Map(_) => String::new(),
    }
}

/// Shortest decimal form of a float with ECMAScript exponent thresholds.
pub fn number_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if value == 0.0 {
        return "0".into();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let exp = format!("{value:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
        _ => exp,
    }
}
