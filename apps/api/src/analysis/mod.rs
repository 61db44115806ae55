//! LLM analyzers: turn resume text or a GitHub snapshot into structured,
//! validated assessments.
//!
//! Model output is never trusted: every response goes through a strict
//! validator that yields `Validated::Valid` or `Validated::Malformed`. Scores
//! outside 1-10 are rejected, never clamped.

pub mod github;
pub mod resume;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use thiserror::Error;
use tracing::warn;

use crate::llm_client::{isolate_json, LlmError};

const RAW_LOG_PREVIEW: usize = 500;

/// Outcome of validating one LLM response.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    Valid(T),
    Malformed { raw: String, reason: String },
}

impl<T> Validated<T> {
    /// Runs `check` over the raw response, keeping the raw text on failure.
    pub(crate) fn from_raw(raw: &str, check: impl FnOnce(&str) -> Result<T, String>) -> Self {
        match check(raw) {
            Ok(value) => Validated::Valid(value),
            Err(reason) => Validated::Malformed {
                raw: raw.to_string(),
                reason,
            },
        }
    }

    pub fn into_result(self) -> Result<T, AnalysisError> {
        match self {
            Validated::Valid(value) => Ok(value),
            Validated::Malformed { raw, reason } => {
                let preview: String = raw.chars().take(RAW_LOG_PREVIEW).collect();
                warn!("Malformed LLM response ({reason}): {preview}");
                Err(AnalysisError::Malformed { raw, reason })
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("LLM request failed: {0}")]
    Request(#[from] LlmError),

    #[error("LLM returned a malformed analysis: {reason}")]
    Malformed { raw: String, reason: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Isolates the JSON object in `raw` and deserializes it into the loose
/// intermediate shape `R`.
pub(crate) fn decode<R: DeserializeOwned>(raw: &str) -> Result<R, String> {
    let value: Value = serde_json::from_str(isolate_json(raw))
        .map_err(|e| format!("response is not valid JSON: {e}"))?;
    serde_json::from_value(value)
        .map_err(|e| format!("response does not match the expected shape: {e}"))
}

/// Reads an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("missing required field `{field}`"))
}

/// Non-empty after trimming.
pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, String> {
    let text = required(value, field)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(format!("field `{field}` is empty"));
    }
    Ok(trimmed.to_string())
}

/// A score must be a whole number in 1..=10. `8.0` counts as whole.
pub(crate) fn score(value: Option<&Number>, field: &str) -> Result<u8, String> {
    let number = required(value, field)?;
    let whole = match number.as_i64() {
        Some(n) => Some(n),
        None => number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 1e9)
            .map(|f| f as i64),
    };

    match whole {
        Some(n @ 1..=10) => Ok(n as u8),
        Some(n) => Err(format!("`{field}` score {n} is outside 1-10")),
        None => Err(format!("`{field}` score {number} is not a whole number")),
    }
}

/// A non-negative year count.
pub(crate) fn years(value: Option<&Number>, field: &str) -> Result<f64, String> {
    let years = required(value.and_then(Number::as_f64), field)?;
    if years < 0.0 || !years.is_finite() {
        return Err(format!("`{field}` must be a non-negative number, got {years}"));
    }
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(json: &str) -> Number {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_score_accepts_range_bounds() {
        assert_eq!(score(Some(&number("1")), "s"), Ok(1));
        assert_eq!(score(Some(&number("10")), "s"), Ok(10));
        assert_eq!(score(Some(&number("7.0")), "s"), Ok(7));
    }

    #[test]
    fn test_score_rejects_out_of_range() {
        assert!(score(Some(&number("0")), "s").unwrap_err().contains("outside 1-10"));
        assert!(score(Some(&number("11")), "s").unwrap_err().contains("outside 1-10"));
        assert!(score(Some(&number("-3")), "s").is_err());
    }

    #[test]
    fn test_score_rejects_fractions_and_missing() {
        assert!(score(Some(&number("7.5")), "s")
            .unwrap_err()
            .contains("whole number"));
        assert!(score(None, "s").unwrap_err().contains("missing"));
    }

    #[test]
    fn test_years_rejects_negative() {
        assert_eq!(years(Some(&number("3.5")), "y"), Ok(3.5));
        assert!(years(Some(&number("-1")), "y").is_err());
    }

    #[test]
    fn test_required_text_rejects_blank() {
        assert_eq!(
            required_text(Some("  ok ".to_string()), "f"),
            Ok("ok".to_string())
        );
        assert!(required_text(Some("   ".to_string()), "f").is_err());
        assert!(required_text(None, "f").is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Lists {
        #[serde(default, deserialize_with = "null_as_default")]
        items: Vec<String>,
    }

    #[test]
    fn test_null_list_reads_as_empty() {
        let lists: Lists = decode(r#"{"items": null}"#).unwrap();
        assert!(lists.items.is_empty());
        let lists: Lists = decode("{}").unwrap();
        assert!(lists.items.is_empty());
    }

    #[test]
    fn test_decode_separates_syntax_from_shape_errors() {
        let syntax = decode::<Lists>("{not json").unwrap_err();
        assert!(syntax.contains("not valid JSON"), "{syntax}");
        let shape = decode::<Lists>(r#"{"items": 3}"#).unwrap_err();
        assert!(shape.contains("expected shape"), "{shape}");
    }

    #[test]
    fn test_malformed_keeps_raw_text() {
        let validated: Validated<u8> = Validated::from_raw("garbage", |_| Err("bad".into()));
        match validated.into_result() {
            Err(AnalysisError::Malformed { raw, reason }) => {
                assert_eq!(raw, "garbage");
                assert_eq!(reason, "bad");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
