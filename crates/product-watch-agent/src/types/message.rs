//! Inbound host messages and outbound replies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use product_watch::MutationRecord;

use super::error::{AgentError, AgentResult};

/// Tag carried by every reply line.
pub const RESPONSE_TYPE: &str = "RESPONSE";

/// Messages the host may send, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    /// A fresh page snapshot, optionally with the mutations that produced it.
    DomSnapshot {
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mutations: Option<Vec<MutationRecord>>,
    },
    ForceCheck,
    GetCurrentProduct,
    GetStatus,
    ToggleDebug {
        enabled: bool,
    },
    /// The page navigated; start over with a fresh watcher.
    Navigate {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        html: Option<String>,
    },
    Close,
}

impl HostMessage {
    pub const TYPES: [&'static str; 7] = [
        "DOM_SNAPSHOT",
        "FORCE_CHECK",
        "GET_CURRENT_PRODUCT",
        "GET_STATUS",
        "TOGGLE_DEBUG",
        "NAVIGATE",
        "CLOSE",
    ];

    /// Decode a parsed JSON value, telling unknown types apart from
    /// malformed known ones.
    pub fn from_value(value: Value) -> AgentResult<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::InvalidMessage("missing `type`".to_string()))?;

        if !Self::TYPES.contains(&kind) {
            return Err(AgentError::UnknownMessageType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| AgentError::InvalidMessage(e.to_string()))
    }

    /// Wire name of this message's type.
    pub fn kind(&self) -> &'static str {
        match self {
            HostMessage::DomSnapshot { .. } => "DOM_SNAPSHOT",
            HostMessage::ForceCheck => "FORCE_CHECK",
            HostMessage::GetCurrentProduct => "GET_CURRENT_PRODUCT",
            HostMessage::GetStatus => "GET_STATUS",
            HostMessage::ToggleDebug { .. } => "TOGGLE_DEBUG",
            HostMessage::Navigate { .. } => "NAVIGATE",
            HostMessage::Close => "CLOSE",
        }
    }
}

/// Build a reply line: `{"type":"RESPONSE","request":…}` plus the body's
/// fields. Non-object bodies land under `result`.
pub fn response(request: Option<&str>, body: Value) -> Value {
    let mut out = Map::new();
    out.insert("type".to_string(), Value::from(RESPONSE_TYPE));
    out.insert(
        "request".to_string(),
        request.map_or(Value::Null, Value::from),
    );
    match body {
        Value::Object(fields) => out.extend(fields),
        other => {
            out.insert("result".to_string(), other);
        }
    }
    Value::Object(out)
}

/// Reply for a failed request.
pub fn error_response(request: Option<&str>, error: &AgentError) -> Value {
    response(request, serde_json::json!({ "error": error.to_string() }))
}
