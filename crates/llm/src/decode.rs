//! Structured-output decoding for free model text.
//!
//! Models wrap JSON in markdown fences, prefix it with prose, or return
//! nothing usable at all. [`decode`] tries progressively looser strategies
//! and never fails loudly: the worst case is [`Decoded::Failed`], which
//! reads as an empty record.

use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;
use tracing::warn;

/// A decoded key/value record.
pub type Record = serde_json::Map<String, JsonValue>;

/// Characters of input shown when logging a decode failure.
const PREVIEW_CHARS: usize = 200;

/// Result of decoding model text.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A JSON object or array was recovered.
    Structured(JsonValue),
    /// Nothing structured could be recovered.
    Failed,
}

/// Lookup of a single field in a decoded output.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// The key exists with a usable value.
    Present(T),
    /// Decoding worked but the key is absent or has the wrong type.
    Missing,
    /// Decoding itself failed.
    Failed,
}

impl<T> Field<T> {
    /// Value if present.
    pub fn present(self) -> Option<T> {
        match self {
            Field::Present(v) => Some(v),
            _ => None,
        }
    }
}

impl Decoded {
    /// Record view: the object's entries, or empty for arrays and failures.
    pub fn record(&self) -> Record {
        match self {
            Decoded::Structured(JsonValue::Object(map)) => map.clone(),
            _ => Record::new(),
        }
    }

    /// Whether no key/value pairs were recovered.
    pub fn is_empty(&self) -> bool {
        match self {
            Decoded::Structured(JsonValue::Object(map)) => map.is_empty(),
            _ => true,
        }
    }

    /// Raw decoded value.
    pub fn value(&self) -> Option<&JsonValue> {
        match self {
            Decoded::Structured(v) => Some(v),
            Decoded::Failed => None,
        }
    }

    fn lookup(&self, key: &str) -> Field<&JsonValue> {
        match self {
            Decoded::Failed => Field::Failed,
            Decoded::Structured(v) => match v.get(key) {
                Some(JsonValue::Null) | None => Field::Missing,
                Some(found) => Field::Present(found),
            },
        }
    }

    /// String field.
    pub fn str_field(&self, key: &str) -> Field<&str> {
        match self.lookup(key) {
            Field::Present(JsonValue::String(s)) => Field::Present(s.as_str()),
            Field::Present(_) | Field::Missing => Field::Missing,
            Field::Failed => Field::Failed,
        }
    }

    /// Integer field. Accepts integral floats and numeric strings.
    pub fn int_field(&self, key: &str) -> Field<i64> {
        match self.lookup(key) {
            Field::Present(value) => match as_integer(value) {
                Some(n) => Field::Present(n),
                None => Field::Missing,
            },
            Field::Missing => Field::Missing,
            Field::Failed => Field::Failed,
        }
    }
}

fn as_integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn fence_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[A-Za-z0-9_+-]*\s*").expect("valid fence regex"))
}

fn fence_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```$").expect("valid fence regex"))
}

fn object_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"))
}

fn array_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"))
}

/// Decode model output into a structured value.
///
/// Strategies, first success wins:
/// 1. strip one markdown fence and surrounding whitespace
/// 2. parse the remainder directly
/// 3. parse the widest `{...}` span
/// 4. parse the widest `[...]` span
///
/// Only objects and arrays count as structured. Pure function apart from
/// a warning log on failure.
pub fn decode(raw: &str) -> Decoded {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!("Received empty text for structured decoding");
        return Decoded::Failed;
    }

    let without_open = fence_open().replace(trimmed, "");
    let text = fence_close().replace(&without_open, "");
    let text = text.trim();

    if let Some(value) = parse_structured(text) {
        return Decoded::Structured(value);
    }

    for span in [object_span(), array_span()] {
        if let Some(m) = span.find(text) {
            if let Some(value) = parse_structured(m.as_str()) {
                return Decoded::Structured(value);
            }
        }
    }

    warn!("Failed to decode structured output: {}", preview(text, PREVIEW_CHARS));
    Decoded::Failed
}

fn parse_structured(text: &str) -> Option<JsonValue> {
    match serde_json::from_str::<JsonValue>(text) {
        Ok(value @ (JsonValue::Object(_) | JsonValue::Array(_))) => Some(value),
        _ => None,
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
