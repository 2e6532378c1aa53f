//! Finds the currently active catalog element.

use scraper::ElementRef;

use crate::dom::{CompiledSelector, Document};
use crate::profile::SelectorProfile;

/// Locates the active item with the profile's active-product selector.
///
/// The handle it returns borrows the document and must not outlive the
/// evaluation that asked for it; the host may replace elements between ticks.
#[derive(Debug, Clone)]
pub struct ActiveItemLocator {
    active: CompiledSelector,
}

impl ActiveItemLocator {
    pub fn from_profile(profile: &SelectorProfile) -> Self {
        Self {
            active: CompiledSelector::parse(&profile.active_product_selector),
        }
    }

    /// First element in document order matching the active selector.
    ///
    /// `None` means "nothing active right now", which callers treat as a
    /// skipped tick rather than a cleared product.
    pub fn locate<'a>(&self, document: &'a Document) -> Option<ElementRef<'a>> {
        match self.active.get() {
            Ok(selector) => document.query(selector),
            Err(e) => {
                tracing::debug!("Active item lookup failed: {e}");
                None
            }
        }
    }
}
