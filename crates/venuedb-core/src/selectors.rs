//! CSS selectors for the map service's front end.
//!
//! The service renders everything client side and renames classes from time
//! to time, so selectors are configuration rather than code. The built-in
//! defaults match the current markup; a YAML file can override any subset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    // Search page
    /// Text input inside the search form.
    pub search_input: String,
    pub search_button: String,
    /// Scrollbar thumb shared by the result list and the reviews page.
    pub scroll_thumb: String,
    /// Result links in the virtualized listing.
    pub listing_anchor: String,

    // Detail page
    pub name: String,
    pub category: String,
    pub address: String,
    pub website: String,
    pub opening_hours: String,
    /// Rating badge fragments, concatenated in document order.
    pub rating: String,

    // Offerings panel
    pub feature_panel: String,
    /// Case-insensitive keywords that mark the feature panel as an offerings panel.
    pub menu_keywords: Vec<String>,
    pub showcase_title: String,
    pub showcase_price: String,
    pub list_title: String,
    pub list_price: String,

    // Reviews page
    pub review_counter: String,
    pub review_expand: String,
    pub review_text: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            search_input: ".search-form-view__input input".to_string(),
            search_button: ".small-search-form-view__button".to_string(),
            scroll_thumb: ".scroll__scrollbar-thumb".to_string(),
            listing_anchor: "a.link-overlay".to_string(),
            name: "h1.orgpage-header-view__header".to_string(),
            category: "a.breadcrumbs-view__breadcrumb._outline".to_string(),
            address: "a.business-contacts-view__address-link".to_string(),
            website: "span.business-urls-view__text".to_string(),
            opening_hours: "meta[itemprop=\"openingHours\"]".to_string(),
            rating: "span.business-summary-rating-badge-view__rating-text".to_string(),
            feature_panel: ".card-feature-view__main-content".to_string(),
            menu_keywords: vec![
                "товары и услуги".to_string(),
                "меню".to_string(),
                "offerings".to_string(),
                "menu".to_string(),
            ],
            showcase_title: "div.related-item-photo-view__title".to_string(),
            showcase_price: "span.related-product-view__price".to_string(),
            list_title: "div.related-item-list-view__title".to_string(),
            list_price: "div.related-item-list-view__price".to_string(),
            review_counter: "div.tabs-select-view__counter".to_string(),
            review_expand: ".business-review-view__expand".to_string(),
            review_text: "span.spoiler-view__text-container".to_string(),
        }
    }
}

impl Selectors {
    /// Named view of every selector, used for validation and for printing
    /// the effective set.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("search_input", self.search_input.as_str()),
            ("search_button", self.search_button.as_str()),
            ("scroll_thumb", self.scroll_thumb.as_str()),
            ("listing_anchor", self.listing_anchor.as_str()),
            ("name", self.name.as_str()),
            ("category", self.category.as_str()),
            ("address", self.address.as_str()),
            ("website", self.website.as_str()),
            ("opening_hours", self.opening_hours.as_str()),
            ("rating", self.rating.as_str()),
            ("feature_panel", self.feature_panel.as_str()),
            ("showcase_title", self.showcase_title.as_str()),
            ("showcase_price", self.showcase_price.as_str()),
            ("list_title", self.list_title.as_str()),
            ("list_price", self.list_price.as_str()),
            ("review_counter", self.review_counter.as_str()),
            ("review_expand", self.review_expand.as_str()),
            ("review_text", self.review_text.as_str()),
        ]
    }

    /// True if `text` contains any menu keyword, ignoring case.
    #[must_use]
    pub fn is_menu_panel(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.menu_keywords
            .iter()
            .any(|k| !k.trim().is_empty() && lower.contains(&k.to_lowercase()))
    }
}

/// Load selectors from a YAML file. Keys missing from the file keep their
/// built-in default.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_selectors(path: &Path) -> Result<Selectors, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SelectorsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let selectors: Selectors =
        serde_yaml::from_str(&content).map_err(ConfigError::SelectorsFileParse)?;

    validate_selectors(&selectors)?;

    Ok(selectors)
}

fn validate_selectors(selectors: &Selectors) -> Result<(), ConfigError> {
    for (key, value) in selectors.entries() {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{key}' must be non-empty"
            )));
        }
    }

    if selectors.menu_keywords.iter().all(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "menu_keywords must contain at least one non-empty keyword".to_string(),
        ));
    }

    Ok(())
}
