//! Core data types for title detection and change reporting.

use serde::{Deserialize, Serialize};

/// A normalized title identifying the active catalog item.
///
/// Non-empty values carry no leading/trailing whitespace, no internal
/// whitespace runs, none of the configured unwanted phrases, and are never
/// longer than the configured maximum. Only [`crate::TitleNormalizer`]
/// constructs non-empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalTitle(String);

impl CanonicalTitle {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    /// The empty title produced for an empty or fully-stripped input.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CanonicalTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An accepted transition to a new canonical title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChangeEvent {
    pub title: CanonicalTitle,
    pub source_url: String,
    pub emitted_at_millis: i64,
}

/// Lifecycle of a watcher instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherPhase {
    Uninitialized,
    Initializing,
    Watching,
    /// Terminal: the page origin is not supported.
    Disabled,
    /// Terminal: observation disconnected and timers cleared.
    TornDown,
}

impl WatcherPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, WatcherPhase::Disabled | WatcherPhase::TornDown)
    }
}

/// What caused a pipeline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    Debounce,
    Poll,
    Force,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Trigger::Start => "start",
            Trigger::Debounce => "debounce",
            Trigger::Poll => "poll",
            Trigger::Force => "force",
        };
        f.write_str(name)
    }
}

/// Counters kept by a watcher over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStats {
    pub evaluations: u64,
    pub emitted: u64,
    pub relevant_batches: u64,
    pub ignored_batches: u64,
}

/// Errors that can occur in the watch library.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("Invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Observation unavailable: {0}")]
    Observation(String),
}

/// Convenience result type.
pub type WatchResult<T> = Result<T, WatchError>;

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
