//! Label reading: the prompt sent with each label photo and the strict
//! parser for the model's answer
//!
//! The answer must be a single JSON object, optionally wrapped in one
//! Markdown code fence. Anything else (prose around the object, several
//! objects, missing fields) is rejected rather than guessed at.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier value the model returns when no instruction number is visible
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Fixed instruction sent alongside every label image
pub const LABEL_PROMPT: &str = r#"You are a specialist in recognizing machine instruction numbers (מספר הוראה) on vacuum chamber (load-lock) labels.

Analyze this image carefully and find the instruction number, usually printed on a label or tag on the machine.

Return ONLY a JSON object with exactly this structure and nothing else:
{
    "identifier": "THE NUMBER YOU FOUND (e.g. 12345 or H-12345)",
    "confidence": "high" | "medium" | "low",
    "location": "where on the image the number is located",
    "additional_info": "any other visible text or identifiers"
}

If you cannot find a clear instruction number, still return the JSON object with "identifier": "NOT_FOUND" and explain why in "additional_info"."#;

/// How sure the model is about the identifier it read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured answer for one label image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelReading {
    pub identifier: String,
    pub confidence: Confidence,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub additional_info: String,
}

/// Optional text fields may be absent or `null`; both read as empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl LabelReading {
    /// The model looked but found no instruction number
    pub fn is_not_found(&self) -> bool {
        self.identifier == NOT_FOUND
    }
}

#[derive(Debug, Error)]
pub enum LabelParseError {
    #[error("Answer is not a single label JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Code fence in answer is not closed")]
    UnterminatedFence,

    #[error("Identifier is empty")]
    EmptyIdentifier,
}

/// Parse the model's free-text answer into a [`LabelReading`]
pub fn parse_label_reading(answer: &str) -> Result<LabelReading, LabelParseError> {
    let body = strip_code_fence(answer.trim())?;

    let mut reading: LabelReading = serde_json::from_str(body)?;
    reading.identifier = reading.identifier.trim().to_string();

    if reading.identifier.is_empty() {
        return Err(LabelParseError::EmptyIdentifier);
    }

    Ok(reading)
}

/// Remove one surrounding ```/```json fence, if present
fn strip_code_fence(text: &str) -> Result<&str, LabelParseError> {
    let Some(rest) = text.strip_prefix("```") else {
        return Ok(text);
    };

    // Skip the info string ("json") up to the end of the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return Err(LabelParseError::UnterminatedFence),
    };

    rest.trim_end()
        .strip_suffix("```")
        .map(str::trim)
        .ok_or(LabelParseError::UnterminatedFence)
}
