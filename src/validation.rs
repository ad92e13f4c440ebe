//! Live validation of editor input
//!
//! Every edit coming from an editing surface is passed through [`validate`]
//! before it touches the model, so the model never holds an out-of-domain
//! value, not even between keystrokes. Numeric input outside its range is
//! clamped to the nearest bound; input that cannot be interpreted at all is
//! rejected and the caller keeps its previous value.
//!
//! [`check`] is the strict counterpart used when decoding canonical data:
//! there a value outside its domain is a schema problem, not something to
//! silently repair.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::error::SchemaProblem;

/// Declared domain of a single setting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Bool,
    Int {
        min: Option<i64>,
        max: Option<i64>,
        max_length: Option<usize>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
        max_length: Option<usize>,
    },
    Text {
        max_length: Option<usize>,
    },
    Enum {
        allowed: &'static [&'static str],
    },
}

impl Rule {
    pub const fn int(min: i64, max: i64) -> Self {
        Rule::Int { min: Some(min), max: Some(max), max_length: None }
    }

    pub const fn text(max_length: usize) -> Self {
        Rule::Text { max_length: Some(max_length) }
    }

    pub const fn one_of(allowed: &'static [&'static str]) -> Self {
        Rule::Enum { allowed }
    }

    /// Short human-readable name of the expected kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Rule::Bool => "boolean",
            Rule::Int { .. } => "integer",
            Rule::Float { .. } => "number",
            Rule::Text { .. } => "string",
            Rule::Enum { .. } => "string",
        }
    }
}

/// A value that satisfies its rule
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Float(f) => JsonValue::from(*f),
            Value::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Why an edit was not applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty input")]
    Empty,
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' is not true/false")]
    NotABool(String),
    #[error("'{value}' is not one of: {}", .allowed.join(", "))]
    NotAllowed {
        value: String,
        allowed: &'static [&'static str],
    },
}

/// Result of validating one edit
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Input was inside the domain and is committed unchanged
    Accepted(Value),
    /// Input was truncated and/or moved to the nearest bound
    Clamped { value: Value, requested: String },
    /// Input could not be interpreted; the previous value stays
    Rejected(ValidationError),
}

impl Outcome {
    /// The value to commit, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Accepted(value) | Outcome::Clamped { value, .. } => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

/// Constrain raw editor input to `rule`
pub fn validate(raw: &str, rule: &Rule) -> Outcome {
    match *rule {
        Rule::Bool => match raw.trim() {
            "true" => Outcome::Accepted(Value::Bool(true)),
            "false" => Outcome::Accepted(Value::Bool(false)),
            other => Outcome::Rejected(ValidationError::NotABool(other.to_string())),
        },
        Rule::Int { min, max, max_length } => {
            let (text, truncated) = truncate(raw, max_length);
            let text = text.trim();
            if text.is_empty() {
                return Outcome::Rejected(ValidationError::Empty);
            }
            let Some(digits) = plain_decimal(text, false) else {
                return Outcome::Rejected(ValidationError::NotANumber(text.to_string()));
            };
            // Well-formed but too wide for i64: saturate, then clamp as usual
            let (parsed, saturated) = match digits.parse::<i64>() {
                Ok(n) => (n, false),
                Err(_) if digits.starts_with('-') => (i64::MIN, true),
                Err(_) => (i64::MAX, true),
            };
            let mut committed = parsed;
            if let Some(min) = min {
                committed = committed.max(min);
            }
            if let Some(max) = max {
                committed = committed.min(max);
            }
            settle(Value::Int(committed), committed != parsed || saturated || truncated, raw)
        }
        Rule::Float { min, max, max_length } => {
            let (text, truncated) = truncate(raw, max_length);
            let text = text.trim();
            if text.is_empty() {
                return Outcome::Rejected(ValidationError::Empty);
            }
            let parsed = match plain_decimal(text, true).and_then(|t| t.parse::<f64>().ok()) {
                Some(x) if x.is_finite() => x,
                _ => return Outcome::Rejected(ValidationError::NotANumber(text.to_string())),
            };
            let mut committed = parsed;
            if let Some(min) = min {
                committed = committed.max(min);
            }
            if let Some(max) = max {
                committed = committed.min(max);
            }
            settle(Value::Float(committed), committed != parsed || truncated, raw)
        }
        Rule::Text { max_length } => {
            let (text, truncated) = truncate(raw, max_length);
            settle(Value::Text(text.into_owned()), truncated, raw)
        }
        Rule::Enum { allowed } => {
            let text = raw.trim();
            if allowed.contains(&text) {
                Outcome::Accepted(Value::Text(text.to_string()))
            } else {
                Outcome::Rejected(ValidationError::NotAllowed {
                    value: text.to_string(),
                    allowed,
                })
            }
        }
    }
}

/// Strictly check an already-typed canonical value against `rule`
pub fn check(json: &JsonValue, rule: &Rule) -> Result<Value, SchemaProblem> {
    let mismatch = || SchemaProblem::TypeMismatch { expected: rule.kind_name() };

    match *rule {
        Rule::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
        Rule::Int { min, max, .. } => {
            let n = json.as_i64().ok_or_else(mismatch)?;
            if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                return Err(SchemaProblem::OutOfDomain {
                    detail: format!("{n} is outside {}", describe_range(min, max)),
                });
            }
            Ok(Value::Int(n))
        }
        Rule::Float { min, max, .. } => {
            let x = json.as_f64().filter(|x| x.is_finite()).ok_or_else(mismatch)?;
            if min.is_some_and(|min| x < min) || max.is_some_and(|max| x > max) {
                return Err(SchemaProblem::OutOfDomain {
                    detail: format!("{x} is outside {}", describe_range(min, max)),
                });
            }
            Ok(Value::Float(x))
        }
        Rule::Text { max_length } => {
            let s = json.as_str().ok_or_else(mismatch)?;
            if let Some(limit) = max_length {
                let len = s.chars().count();
                if len > limit {
                    return Err(SchemaProblem::OutOfDomain {
                        detail: format!("{len} characters exceeds limit of {limit}"),
                    });
                }
            }
            Ok(Value::Text(s.to_string()))
        }
        Rule::Enum { allowed } => {
            let s = json.as_str().ok_or_else(mismatch)?;
            if !allowed.contains(&s) {
                return Err(SchemaProblem::OutOfDomain {
                    detail: format!("'{s}' is not one of: {}", allowed.join(", ")),
                });
            }
            Ok(Value::Text(s.to_string()))
        }
    }
}

fn settle(value: Value, adjusted: bool, raw: &str) -> Outcome {
    if adjusted {
        Outcome::Clamped { value, requested: raw.to_string() }
    } else {
        Outcome::Accepted(value)
    }
}

/// Keep at most `max_length` characters, dropping from the end
fn truncate(raw: &str, max_length: Option<usize>) -> (Cow<'_, str>, bool) {
    match max_length {
        Some(limit) if raw.chars().count() > limit => {
            (Cow::Owned(raw.chars().take(limit).collect()), true)
        }
        _ => (Cow::Borrowed(raw), false),
    }
}

/// Accept only what a numeric text box produces: optional sign, digits and
/// (for floats) a single decimal point. Rules out exponents, `inf` and `nan`.
fn plain_decimal(text: &str, allow_point: bool) -> Option<&str> {
    let digits = text.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(text);
    let mut seen_digit = false;
    let mut seen_point = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if allow_point && !seen_point => seen_point = true,
            _ => return None,
        }
    }
    seen_digit.then_some(text)
}

fn describe_range<T: fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{min}, {max}]"),
        (Some(min), None) => format!(">= {min}"),
        (None, Some(max)) => format!("<= {max}"),
        (None, None) => "any".to_string(),
    }
}
