//! The synchronous evaluation path: locate → extract → normalize.

use serde::Serialize;

use crate::config::WatchConfig;
use crate::dom::Document;
use crate::extractor::TitleExtractor;
use crate::locator::ActiveItemLocator;
use crate::normalizer::TitleNormalizer;
use crate::profile::SelectorProfile;
use crate::types::CanonicalTitle;

/// Result of one pass over a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "title", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Nothing is active right now. Not a product change.
    NoActiveItem,
    /// An item is active but no strategy produced usable text.
    NoTitle,
    Title(CanonicalTitle),
}

impl PipelineOutcome {
    pub fn title(&self) -> Option<&CanonicalTitle> {
        match self {
            PipelineOutcome::Title(title) => Some(title),
            _ => None,
        }
    }
}

/// Locator, extractor and normalizer for one selector profile.
pub struct TitlePipeline {
    locator: ActiveItemLocator,
    extractor: TitleExtractor,
    normalizer: TitleNormalizer,
}

impl TitlePipeline {
    pub fn new(
        locator: ActiveItemLocator,
        extractor: TitleExtractor,
        normalizer: TitleNormalizer,
    ) -> Self {
        Self {
            locator,
            extractor,
            normalizer,
        }
    }

    pub fn from_profile(profile: &SelectorProfile, config: &WatchConfig) -> Self {
        Self::new(
            ActiveItemLocator::from_profile(profile),
            TitleExtractor::from_profile(profile),
            TitleNormalizer::from_config(config),
        )
    }

    /// Run one evaluation. Element handles do not escape this call.
    pub fn run(&self, document: &Document) -> PipelineOutcome {
        let Some(item) = self.locator.locate(document) else {
            tracing::debug!("No active product found");
            return PipelineOutcome::NoActiveItem;
        };

        let Some(raw) = self.extractor.extract(item) else {
            tracing::debug!("No product title found in active product");
            return PipelineOutcome::NoTitle;
        };

        let title = self.normalizer.normalize(&raw);
        if title.is_empty() {
            tracing::debug!("Title {raw:?} normalized to nothing");
            return PipelineOutcome::NoTitle;
        }
        PipelineOutcome::Title(title)
    }
}
