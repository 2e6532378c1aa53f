//! Selector profiles: per-origin lookup rules for the product list, the
//! active item, and its title.

use serde::{Deserialize, Serialize};
use url::Url;

/// Lookup rules for one page origin. Immutable for the life of a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorProfile {
    pub product_list_selector: String,
    pub active_product_selector: String,
    pub title_selector: String,
    pub alternative_title_selectors: Vec<String>,
}

impl Default for SelectorProfile {
    fn default() -> Self {
        Self {
            product_list_selector: "#product-list".to_string(),
            active_product_selector: ".product--active".to_string(),
            title_selector:
                r#".product-title, [data-testid="product-name"], .product-name, .item-title"#
                    .to_string(),
            alternative_title_selectors: [
                ".product-title",
                r#"[data-testid="product-name"]"#,
                ".product-name",
                ".item-title",
                ".title",
                "h2",
                "h3",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Origin-specific replacements applied on top of the default profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOverride {
    /// Host this override applies to; subdomains of it match as well.
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_list_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_product_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_title_selectors: Option<Vec<String>>,
}

impl ProfileOverride {
    fn apply(&self, base: &SelectorProfile) -> SelectorProfile {
        SelectorProfile {
            product_list_selector: self
                .product_list_selector
                .clone()
                .unwrap_or_else(|| base.product_list_selector.clone()),
            active_product_selector: self
                .active_product_selector
                .clone()
                .unwrap_or_else(|| base.active_product_selector.clone()),
            title_selector: self
                .title_selector
                .clone()
                .unwrap_or_else(|| base.title_selector.clone()),
            alternative_title_selectors: self
                .alternative_title_selectors
                .clone()
                .unwrap_or_else(|| base.alternative_title_selectors.clone()),
        }
    }
}

/// The default profile plus its origin overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileSet {
    pub default: SelectorProfile,
    pub overrides: Vec<ProfileOverride>,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self {
            default: SelectorProfile::default(),
            overrides: vec![
                ProfileOverride {
                    host: "seller.tiktok.com".to_string(),
                    product_list_selector: Some(".inventory-container, #product-list".to_string()),
                    active_product_selector: Some(
                        ".inventory-item.selected, .product--active".to_string(),
                    ),
                    title_selector: None,
                    alternative_title_selectors: None,
                },
                ProfileOverride {
                    host: "studio.tiktok.com".to_string(),
                    product_list_selector: Some(".product-grid, #product-list".to_string()),
                    active_product_selector: Some(
                        ".product-card.active, .product--active".to_string(),
                    ),
                    title_selector: None,
                    alternative_title_selectors: None,
                },
            ],
        }
    }
}

impl ProfileSet {
    /// Resolve the profile for a page URL. The first matching override wins;
    /// URLs without a host get the default profile.
    pub fn resolve(&self, url: &Url) -> SelectorProfile {
        let Some(host) = url.host_str() else {
            return self.default.clone();
        };

        match self.overrides.iter().find(|o| host_matches(host, &o.host)) {
            Some(over) => {
                tracing::debug!("Using selector override for {}", over.host);
                over.apply(&self.default)
            }
            None => self.default.clone(),
        }
    }
}

/// Whether the page URL belongs to one of the supported domains.
pub fn is_supported_origin(url: &str, domains: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    domains.iter().any(|domain| host_matches(host, domain))
}

/// `host` equals `domain` or is a subdomain of it.
fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}
