//! Per-field extraction from a detail-page DOM snapshot.
//!
//! Every getter is pure over the snapshot and returns `None` for a field it
//! cannot read. An invalid selector, a missing element and blank text all
//! look the same to the caller.

use scraper::{Html, Selector};
use venuedb_core::Selectors;

/// Parsed copy of a page's DOM at one point in time.
///
/// `scraper::Html` is not `Send`, so snapshots are built and consumed inside
/// synchronous helpers and never held across an `.await`.
pub struct DomSnapshot {
    document: Html,
}

impl DomSnapshot {
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Trimmed text of every element matching `selector`, in document order.
    /// Elements with blank text are kept as empty strings so positions line
    /// up with sibling lists.
    #[must_use]
    pub fn texts(&self, selector: &str) -> Vec<String> {
        let Some(sel) = parse_selector(selector) else {
            return Vec::new();
        };
        self.document
            .select(&sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect()
    }

    /// Attribute `name` of every matching element that carries it.
    #[must_use]
    pub fn attributes(&self, selector: &str, name: &str) -> Vec<String> {
        let Some(sel) = parse_selector(selector) else {
            return Vec::new();
        };
        self.document
            .select(&sel)
            .filter_map(|el| el.value().attr(name))
            .map(|v| v.trim().to_string())
            .collect()
    }

    /// Text of the last matching element, if non-blank.
    #[must_use]
    pub fn last_text(&self, selector: &str) -> Option<String> {
        self.texts(selector).pop().filter(|t| !t.is_empty())
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!(selector, error = ?e, "invalid CSS selector");
            None
        }
    }
}

/// Everything read from the main detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Option<Vec<String>>,
    pub rating: Option<String>,
}

pub struct FieldExtractor<'a> {
    selectors: &'a Selectors,
}

impl<'a> FieldExtractor<'a> {
    #[must_use]
    pub fn new(selectors: &'a Selectors) -> Self {
        Self { selectors }
    }

    /// Venue name. With several headers the last one wins.
    #[must_use]
    pub fn name(&self, dom: &DomSnapshot) -> Option<String> {
        dom.last_text(&self.selectors.name)
    }

    /// Innermost breadcrumb category.
    #[must_use]
    pub fn category(&self, dom: &DomSnapshot) -> Option<String> {
        dom.last_text(&self.selectors.category)
    }

    #[must_use]
    pub fn address(&self, dom: &DomSnapshot) -> Option<String> {
        dom.last_text(&self.selectors.address)
    }

    #[must_use]
    pub fn website(&self, dom: &DomSnapshot) -> Option<String> {
        dom.last_text(&self.selectors.website)
    }

    /// `content` of every opening-hours meta tag, e.g. `["Mo 10:00-22:00", ...]`.
    #[must_use]
    pub fn opening_hours(&self, dom: &DomSnapshot) -> Option<Vec<String>> {
        let hours: Vec<String> = dom
            .attributes(&self.selectors.opening_hours, "content")
            .into_iter()
            .filter(|h| !h.is_empty())
            .collect();
        (!hours.is_empty()).then_some(hours)
    }

    /// The badge renders `4`, `,` and `8` as separate spans; they are joined
    /// back into `"4,8"`.
    #[must_use]
    pub fn rating(&self, dom: &DomSnapshot) -> Option<String> {
        let rating: String = dom.texts(&self.selectors.rating).concat();
        (!rating.is_empty()).then_some(rating)
    }

    #[must_use]
    pub fn extract(&self, dom: &DomSnapshot) -> ExtractedFields {
        ExtractedFields {
            name: self.name(dom),
            category: self.category(dom),
            address: self.address(dom),
            website: self.website(dom),
            opening_hours: self.opening_hours(dom),
            rating: self.rating(dom),
        }
    }

    /// Parse `html` and extract all fields in one step.
    #[must_use]
    pub fn extract_html(&self, html: &str) -> ExtractedFields {
        self.extract(&DomSnapshot::parse(html))
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
