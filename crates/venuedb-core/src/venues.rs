use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Origin tag stamped on every record produced by the map crawler.
pub const VENUE_SOURCE: &str = "ymaps";

/// Items crawled when the caller does not say otherwise.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Input to one crawl run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub city: String,
    pub category: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

impl CrawlRequest {
    #[must_use]
    pub fn new(city: impl Into<String>, category: impl Into<String>, max_items: usize) -> Self {
        Self {
            city: city.into(),
            category: category.into(),
            max_items,
        }
    }

    /// Text typed into the map search box: `"<city> <category>"`.
    #[must_use]
    pub fn search_query(&self) -> String {
        format!("{} {}", self.city, self.category)
    }
}

/// One venue as captured from its detail page.
///
/// `id`, `source` and `captured_at` are always populated. Content fields
/// degrade to their empty value when the page did not yield them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRecord {
    /// Organization id from the detail URL, or a generated UUID.
    pub id: String,
    pub source: String,
    pub captured_at: DateTime<Utc>,
    pub name: String,
    pub category: String,
    pub address: String,
    pub website: String,
    /// Raw day strings as published, e.g. `"Mo 10:00-22:00"`.
    pub opening_hours: Vec<String>,
    pub page_url: String,
    /// Raw rating text, e.g. `"4,8"`.
    pub rating: String,
    /// Item label to price label.
    pub offerings: BTreeMap<String, String>,
    /// Review texts in rendered order (newest first).
    pub reviews: Vec<String>,
}

impl VenueRecord {
    /// An empty record carrying only the always-present fields.
    #[must_use]
    pub fn empty(id: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            source: VENUE_SOURCE.to_string(),
            captured_at,
            name: String::new(),
            category: String::new(),
            address: String::new(),
            website: String::new(),
            opening_hours: Vec::new(),
            page_url: String::new(),
            rating: String::new(),
            offerings: BTreeMap::new(),
            reviews: Vec::new(),
        }
    }

    /// Fresh random identifier for venues whose URL carries none.
    #[must_use]
    pub fn generated_id() -> String {
        Uuid::new_v4().to_string()
    }
}
