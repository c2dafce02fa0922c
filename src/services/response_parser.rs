//! Extraction of structured answers from free-form model text.
//!
//! Models wrap their JSON in prose or code fences; we take the widest
//! brace-delimited span and decode that. Nothing here retries.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::AppError;

/// Parse failure outcome, handled by each caller's own fallback
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("no JSON object found in model response")]
    NoObject,
    #[error("malformed JSON object: {0}")]
    Malformed(String),
    #[error("no number found in model response")]
    NoNumber,
}

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        AppError::ModelMalformedResponse(e.to_string())
    }
}

/// Widest `{ ... }` span in the text, from the first `{` to the last `}`
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Decodes the widest brace-delimited block into `T`
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let block = extract_json_block(text).ok_or(ParseError::NoObject)?;
    serde_json::from_str(block).map_err(|e| ParseError::Malformed(e.to_string()))
}

/// First integer in the text, e.g. `"Candidate 3."` gives 3
pub fn parse_first_number(text: &str) -> Result<i64, ParseError> {
    let mut digits = String::new();
    let mut negative = false;
    let mut prev = None;

    for ch in text.chars() {
        if ch.is_ascii_digit() {
            if digits.is_empty() {
                negative = prev == Some('-');
            }
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
        prev = Some(ch);
    }

    if digits.is_empty() {
        return Err(ParseError::NoNumber);
    }

    let value: i64 = digits
        .parse()
        .map_err(|_| ParseError::Malformed(format!("number out of range: {}", digits)))?;

    Ok(if negative { -value } else { value })
}
