//! Watcher tunables, loaded from JSON with environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::profile::{is_supported_origin, ProfileSet, SelectorProfile};
use crate::types::{WatchError, WatchResult};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_POLL_MS: u64 = 1000;
pub const DEFAULT_MAX_TITLE_LENGTH: usize = 500;

const MIN_DEBOUNCE_MS: u64 = 10;
const MIN_POLL_MS: u64 = 100;
const MIN_TITLE_LENGTH: usize = 16;

pub const ENV_DEBOUNCE_MS: &str = "PRODUCT_WATCH_DEBOUNCE_MS";
pub const ENV_POLL_MS: &str = "PRODUCT_WATCH_POLL_MS";
pub const ENV_MAX_TITLE_LENGTH: &str = "PRODUCT_WATCH_MAX_TITLE_LENGTH";

/// UI chrome that leaks into scraped titles.
pub const DEFAULT_UNWANTED_PHRASES: [&str; 6] = [
    "Edit",
    "Delete",
    "More options",
    "Product details",
    "View product",
    "Select product",
];

pub const DEFAULT_SUPPORTED_DOMAINS: [&str; 4] = [
    "tiktok.com",
    "seller.tiktok.com",
    "studio.tiktok.com",
    "live.tiktok.com",
];

/// Everything a watcher needs besides the page itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    pub debounce_quiet_period_millis: u64,
    pub poll_interval_millis: u64,
    pub max_title_length: usize,
    pub unwanted_phrases: Vec<String>,
    pub supported_domains: Vec<String>,
    pub profiles: ProfileSet,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_quiet_period_millis: DEFAULT_DEBOUNCE_MS,
            poll_interval_millis: DEFAULT_POLL_MS,
            max_title_length: DEFAULT_MAX_TITLE_LENGTH,
            unwanted_phrases: DEFAULT_UNWANTED_PHRASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            supported_domains: DEFAULT_SUPPORTED_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            profiles: ProfileSet::default(),
        }
    }
}

impl WatchConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> WatchResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: WatchConfig = serde_json::from_str(&raw).map_err(|e| {
            WatchError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(config.clamped())
    }

    /// Apply `PRODUCT_WATCH_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = read_override::<u64, _>(&lookup, ENV_DEBOUNCE_MS) {
            self.debounce_quiet_period_millis = v;
        }
        if let Some(v) = read_override::<u64, _>(&lookup, ENV_POLL_MS) {
            self.poll_interval_millis = v;
        }
        if let Some(v) = read_override::<usize, _>(&lookup, ENV_MAX_TITLE_LENGTH) {
            self.max_title_length = v;
        }
        self.clamped()
    }

    /// Whether `url` is on one of the supported domains.
    pub fn is_supported(&self, url: &str) -> bool {
        is_supported_origin(url, &self.supported_domains)
    }

    /// Selector profile for a page URL; unparseable URLs get the default.
    pub fn profile_for(&self, url: &str) -> SelectorProfile {
        match url::Url::parse(url) {
            Ok(parsed) => self.profiles.resolve(&parsed),
            Err(_) => self.profiles.default.clone(),
        }
    }

    pub fn debounce_quiet_period(&self) -> Duration {
        Duration::from_millis(self.debounce_quiet_period_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    fn clamped(mut self) -> Self {
        self.debounce_quiet_period_millis = self.debounce_quiet_period_millis.max(MIN_DEBOUNCE_MS);
        self.poll_interval_millis = self.poll_interval_millis.max(MIN_POLL_MS);
        self.max_title_length = self.max_title_length.max(MIN_TITLE_LENGTH);
        self.unwanted_phrases.retain(|p| !p.trim().is_empty());
        self
    }
}

fn read_override<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {name}={raw:?}: not a valid number");
            None
        }
    }
}
