//! Downstream shapes derived from a [`VenueRecord`]: a text document for a
//! search index and a flat row for a relational store.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use venuedb_core::VenueRecord;

use crate::hours::normalize_opening_hours;

/// Filterable metadata attached to an index document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub category: String,
    pub rating: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: String,
    pub text: String,
    pub metadata: IndexMetadata,
}

impl From<&VenueRecord> for IndexDocument {
    fn from(record: &VenueRecord) -> Self {
        let week = normalize_opening_hours(&record.opening_hours);
        let hours = week
            .days()
            .iter()
            .map(|(day, h)| format!("{day}: {h}"))
            .collect::<Vec<_>>()
            .join(", ");
        let offerings = record
            .offerings
            .iter()
            .map(|(item, price)| format!("{item} ({price})"))
            .collect::<Vec<_>>()
            .join("; ");

        let mut text = String::new();
        let _ = writeln!(text, "Название: {}", record.name);
        let _ = writeln!(text, "Категория: {}", record.category);
        let _ = writeln!(text, "Адрес: {}", record.address);
        let _ = writeln!(text, "Оценка: {}", record.rating);
        let _ = writeln!(text, "Часы работы: {hours}");
        let _ = writeln!(text, "Ссылка на Яндекс.Карты: {}", record.page_url);
        let _ = write!(text, "Товары и услуги: {offerings}");

        Self {
            id: record.id.clone(),
            text,
            metadata: IndexMetadata {
                name: record.name.clone(),
                category: record.category.clone(),
                rating: record.rating.clone(),
                source: record.source.clone(),
            },
        }
    }
}

/// Parse a displayed rating such as `"4,8"` or `"4.8"`. Returns 0.0 when
/// the text is not a number.
#[must_use]
pub fn parse_rating(raw: &str) -> f64 {
    raw.trim().replace(',', ".").parse().unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRow {
    pub external_id: String,
    pub name: String,
    pub category: String,
    pub rating: f64,
    pub review_count: u32,
    /// `{address, page_url}`.
    pub location: serde_json::Value,
    pub offerings: serde_json::Value,
    /// The full record as captured.
    pub parsed_data: serde_json::Value,
}

impl VenueRow {
    /// # Errors
    ///
    /// Returns a serialization error if the record cannot be encoded as JSON.
    pub fn from_record(record: &VenueRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            external_id: record.id.clone(),
            name: record.name.clone(),
            category: record.category.clone(),
            rating: parse_rating(&record.rating),
            review_count: u32::try_from(record.reviews.len()).unwrap_or(u32::MAX),
            location: serde_json::json!({
                "address": record.address,
                "page_url": record.page_url,
            }),
            offerings: serde_json::to_value(&record.offerings)?,
            parsed_data: serde_json::to_value(record)?,
        })
    }
}
