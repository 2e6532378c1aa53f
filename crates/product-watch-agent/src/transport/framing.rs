//! Message framing for newline-delimited JSON.

use serde_json::Value;

use crate::types::{AgentError, AgentResult};

/// Parse a single line of text as a JSON value.
pub fn parse_message(line: &str) -> AgentResult<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(AgentError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| AgentError::ParseError(e.to_string()))
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &Value) -> AgentResult<String> {
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    Ok(json)
}
