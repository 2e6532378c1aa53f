//! Title extraction: an ordered chain of fallback strategies.
//!
//! Strategies run strictly in order and the first non-empty (trimmed)
//! result wins. A strategy that fails, usually on a selector that does not
//! compile, counts as a miss and the chain moves on.

use scraper::ElementRef;

use crate::dom::{non_blank_attr, text_content, CompiledSelector};
use crate::profile::SelectorProfile;
use crate::types::WatchResult;

/// Ancestors that typically wrap a whole catalog entry.
const ITEM_CONTAINER_SELECTOR: &str = "[data-product], .product-item, .inventory-item";

/// Descendants that look like they carry a title.
const HEADING_SELECTOR: &str = "h1, h2, h3, h4, .title, [title]";

/// Heading text shorter or longer than this is rarely a product name.
const HEADING_MIN_CHARS: usize = 11;
const HEADING_MAX_CHARS: usize = 199;

/// One way of pulling a title out of the active item.
pub trait TitleStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Try to produce a title. `Ok(None)` is a miss; errors are misses too.
    fn try_extract(&self, item: ElementRef<'_>) -> WatchResult<Option<String>>;
}

/// Runs the strategies in order, stopping at the first hit.
pub struct TitleExtractor {
    strategies: Vec<Box<dyn TitleStrategy>>,
}

impl TitleExtractor {
    /// The standard five-strategy chain for a selector profile.
    pub fn from_profile(profile: &SelectorProfile) -> Self {
        let title = CompiledSelector::parse(&profile.title_selector);
        Self::with_strategies(vec![
            Box::new(PrimarySelector {
                title: title.clone(),
            }),
            Box::new(AlternativeSelectors {
                alternatives: profile
                    .alternative_title_selectors
                    .iter()
                    .map(|s| CompiledSelector::parse(s))
                    .collect(),
            }),
            Box::new(ContainerScope {
                container: CompiledSelector::parse(ITEM_CONTAINER_SELECTOR),
                title,
            }),
            Box::new(HeadingScan {
                headings: CompiledSelector::parse(HEADING_SELECTOR),
            }),
            Box::new(AttributeFallback {
                titled: CompiledSelector::parse("[title]"),
            }),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn TitleStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extract a trimmed, non-empty raw title, or `None` if every strategy misses.
    pub fn extract(&self, item: ElementRef<'_>) -> Option<String> {
        for strategy in &self.strategies {
            match strategy.try_extract(item) {
                Ok(Some(text)) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        tracing::debug!("Title found by {} strategy: {trimmed:?}", strategy.name());
                        return Some(trimmed.to_string());
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("{} strategy failed: {e}", strategy.name());
                }
            }
        }

        tracing::debug!("No title found with any strategy");
        None
    }
}

/// Text of the first descendant matching `selector`, if non-blank.
fn non_blank_text(selector: &CompiledSelector, scope: ElementRef<'_>) -> WatchResult<Option<String>> {
    Ok(selector
        .query_within(scope)?
        .map(text_content)
        .filter(|t| !t.trim().is_empty()))
}

/// 1. The profile's primary title selector inside the active item.
struct PrimarySelector {
    title: CompiledSelector,
}

impl TitleStrategy for PrimarySelector {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn try_extract(&self, item: ElementRef<'_>) -> WatchResult<Option<String>> {
        non_blank_text(&self.title, item)
    }
}

/// 2. Each alternative selector in configured order.
struct AlternativeSelectors {
    alternatives: Vec<CompiledSelector>,
}

impl TitleStrategy for AlternativeSelectors {
    fn name(&self) -> &'static str {
        "alternative"
    }

    fn try_extract(&self, item: ElementRef<'_>) -> WatchResult<Option<String>> {
        for selector in &self.alternatives {
            if let Some(text) = non_blank_text(selector, item)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

/// 3. The primary selector, scoped to the nearest item container.
struct ContainerScope {
    container: CompiledSelector,
    title: CompiledSelector,
}

impl TitleStrategy for ContainerScope {
    fn name(&self) -> &'static str {
        "container"
    }

    fn try_extract(&self, item: ElementRef<'_>) -> WatchResult<Option<String>> {
        match self.container.closest(item)? {
            Some(container) => non_blank_text(&self.title, container),
            None => Ok(None),
        }
    }
}

/// 4. The first heading-like descendant with a plausible title length.
struct HeadingScan {
    headings: CompiledSelector,
}

impl TitleStrategy for HeadingScan {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn try_extract(&self, item: ElementRef<'_>) -> WatchResult<Option<String>> {
        let selector = self.headings.get()?;
        Ok(item.select(selector).find_map(|element| {
            let text = text_content(element);
            let trimmed = text.trim();
            let len = trimmed.chars().count();
            (HEADING_MIN_CHARS..=HEADING_MAX_CHARS)
                .contains(&len)
                .then(|| trimmed.to_string())
        }))
    }
}

/// 5. `title` / `aria-label` on the item, then any titled descendant.
struct AttributeFallback {
    titled: CompiledSelector,
}

impl TitleStrategy for AttributeFallback {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn try_extract(&self, item: ElementRef<'_>) -> WatchResult<Option<String>> {
        if let Some(value) =
            non_blank_attr(item, "title").or_else(|| non_blank_attr(item, "aria-label"))
        {
            return Ok(Some(value.to_string()));
        }

        Ok(self
            .titled
            .query_within(item)?
            .and_then(|element| non_blank_attr(element, "title"))
            .map(str::to_string))
    }
}
