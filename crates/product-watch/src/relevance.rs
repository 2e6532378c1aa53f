//! Mutation relevance filtering.
//!
//! Most mutations on a busy page have nothing to do with the product list.
//! [`MutationWatcher`] cheaply decides whether a batch could have changed the
//! active item before the debounced pipeline is woken up.

use scraper::ElementRef;

use crate::dom::{CompiledSelector, Document, MutationRecord};
use crate::profile::SelectorProfile;
use crate::types::{WatchError, WatchResult};

/// Relevance filter attached to a watcher while it is watching.
#[derive(Debug, Clone)]
pub struct MutationWatcher {
    active: CompiledSelector,
    list: CompiledSelector,
}

impl MutationWatcher {
    /// Attach to a profile. Fails when the selectors needed for filtering do
    /// not compile; the watcher then falls back to polling only.
    pub fn attach(profile: &SelectorProfile) -> WatchResult<Self> {
        let active = CompiledSelector::parse(&profile.active_product_selector);
        let list = CompiledSelector::parse(&profile.product_list_selector);
        for selector in [&active, &list] {
            if let Err(e) = selector.get() {
                return Err(WatchError::Observation(e.to_string()));
            }
        }
        Ok(Self { active, list })
    }

    /// Whether any record in the batch touches the active item or the list.
    pub fn is_relevant(&self, document: &Document, records: &[MutationRecord]) -> bool {
        records.iter().any(|record| self.record_is_relevant(document, record))
    }

    fn record_is_relevant(&self, document: &Document, record: &MutationRecord) -> bool {
        let result = match record {
            MutationRecord::ChildList { added_nodes, .. } => added_nodes
                .iter()
                .filter_map(|path| document.resolve(path))
                .map(|node| self.added_node_is_relevant(node))
                .find(|r| !matches!(r, Ok(false)))
                .unwrap_or(Ok(false)),
            MutationRecord::Attributes { target, .. } => match document.resolve(target) {
                Some(node) => self.target_is_relevant(node),
                None => Ok(false),
            },
        };

        result.unwrap_or_else(|e| {
            tracing::debug!("Relevance check failed: {e}");
            false
        })
    }

    fn added_node_is_relevant(&self, node: ElementRef<'_>) -> WatchResult<bool> {
        Ok(self.active.matches(node)?
            || self.active.query_within(node)?.is_some()
            || self.list.closest(node)?.is_some())
    }

    fn target_is_relevant(&self, node: ElementRef<'_>) -> WatchResult<bool> {
        Ok(self.active.closest(node)?.is_some() || self.list.closest(node)?.is_some())
    }
}
