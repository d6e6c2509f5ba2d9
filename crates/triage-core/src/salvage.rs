//! Salvage parse: recover a JSON object from a model reply.
//!
//! Contract: accepts arbitrary reply text and returns a JSON object, or a
//! [`SalvageError`]. A reply that is itself a JSON object is taken as-is.
//! Otherwise the text is scanned for balanced top-level `{ ... }` blocks
//! (braces inside JSON string literals do not count) and only the LAST
//! complete block is parsed. Prose, markdown fences and trailing chatter
//! around the block are ignored.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalvageError {
    #[error("reply contains no JSON object")]
    NoObject,

    #[error("JSON object in reply is malformed: {0}")]
    Malformed(serde_json::Error),

    #[error("JSON object in reply has unexpected shape: {0}")]
    Shape(serde_json::Error),
}

pub fn salvage_object(text: &str) -> Result<Map<String, Value>, SalvageError> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(map);
    }

    let (start, end) = last_object_span(text).ok_or(SalvageError::NoObject)?;
    match serde_json::from_str::<Value>(&text[start..end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SalvageError::NoObject),
        Err(e) => Err(SalvageError::Malformed(e)),
    }
}

/// Salvage the object and deserialize it into `T`.
pub fn salvage_parse<T: DeserializeOwned>(text: &str) -> Result<T, SalvageError> {
    let map = salvage_object(text)?;
    serde_json::from_value(Value::Object(map)).map_err(SalvageError::Shape)
}

// byte span of the last balanced top-level brace block
fn last_object_span(text: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0usize;
    let mut last = None;

    for (i, ch) in text.char_indices() {
        if depth == 0 {
            // string state is only tracked inside a block; prose quotes are noise
            if ch == '{' {
                depth = 1;
                start = i;
                in_string = false;
                escaped = false;
            }
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    last = Some((start, i + 1));
                }
            }
            _ => {}
        }
    }

    last
}
