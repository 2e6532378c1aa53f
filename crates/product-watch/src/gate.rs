//! Change gating: one event per distinct canonical title.

use crate::types::{now_millis, CanonicalTitle, ProductChangeEvent};

/// Deduplicates canonical titles for one watcher.
///
/// The gate is the only writer of the last emitted title. Its state lives as
/// long as the watcher and is never persisted.
#[derive(Debug, Clone)]
pub struct ChangeGate {
    source_url: String,
    last_emitted: Option<CanonicalTitle>,
}

impl ChangeGate {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            last_emitted: None,
        }
    }

    pub fn last_emitted(&self) -> Option<&CanonicalTitle> {
        self.last_emitted.as_ref()
    }

    /// Accept `candidate` if it is non-empty and differs from the last
    /// emitted title, stamping the event with the current time.
    pub fn evaluate(&mut self, candidate: CanonicalTitle) -> Option<ProductChangeEvent> {
        self.evaluate_at(candidate, now_millis())
    }

    /// As [`ChangeGate::evaluate`], with an explicit timestamp.
    pub fn evaluate_at(
        &mut self,
        candidate: CanonicalTitle,
        now_millis: i64,
    ) -> Option<ProductChangeEvent> {
        if candidate.is_empty() {
            return None;
        }
        if self.last_emitted.as_ref() == Some(&candidate) {
            return None;
        }

        tracing::debug!(
            "Title changed: {:?} -> {:?}",
            self.last_emitted.as_ref().map(CanonicalTitle::as_str),
            candidate.as_str()
        );
        self.last_emitted = Some(candidate.clone());

        Some(ProductChangeEvent {
            title: candidate,
            source_url: self.source_url.clone(),
            emitted_at_millis: now_millis,
        })
    }
}
