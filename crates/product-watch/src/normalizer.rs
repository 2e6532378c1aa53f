//! Title normalization: whitespace cleanup, UI-phrase stripping, truncation.

use regex::{Regex, RegexBuilder};

use crate::config::WatchConfig;
use crate::types::CanonicalTitle;

/// Turns raw extracted text into a [`CanonicalTitle`].
#[derive(Debug, Clone)]
pub struct TitleNormalizer {
    phrases: Vec<Regex>,
    max_length: usize,
}

impl TitleNormalizer {
    /// Build a normalizer stripping `phrases` (case-insensitive, anywhere in
    /// the text) and truncating to `max_length` characters.
    pub fn new<S: AsRef<str>>(phrases: &[S], max_length: usize) -> Self {
        let phrases = phrases
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .filter_map(|p| {
                RegexBuilder::new(&regex::escape(p))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| tracing::warn!("Skipping unwanted phrase {p:?}: {e}"))
                    .ok()
            })
            .collect();

        Self {
            phrases,
            max_length,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(&config.unwanted_phrases, config.max_title_length)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Normalize a raw title. Empty input yields an empty title.
    pub fn normalize(&self, raw: &str) -> CanonicalTitle {
        let mut cleaned = collapse_whitespace(raw);

        // Removing one phrase can splice together another, so repeat until
        // a full pass changes nothing.
        loop {
            let mut changed = false;
            for phrase in &self.phrases {
                if phrase.is_match(&cleaned) {
                    cleaned = collapse_whitespace(&phrase.replace_all(&cleaned, ""));
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        if cleaned.chars().count() > self.max_length {
            let truncated: String = cleaned.chars().take(self.max_length).collect();
            cleaned = truncated.trim().to_string();
        }

        CanonicalTitle::new(cleaned)
    }
}

/// Trim and collapse every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
