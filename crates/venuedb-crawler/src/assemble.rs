use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::Url;
use venuedb_core::VenueRecord;

use crate::extract::ExtractedFields;

/// `<slug>/<id>` pair from an organization URL such as
/// `https://yandex.ru/maps/org/khachapurnaya/1124715036/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgPath {
    pub slug: String,
    pub id: String,
}

impl OrgPath {
    /// Reviews page for this organization under `base_url`.
    #[must_use]
    pub fn reviews_url(&self, base_url: &str) -> String {
        format!(
            "{}/org/{}/{}/reviews",
            base_url.trim_end_matches('/'),
            self.slug,
            self.id
        )
    }
}

/// Find the `org/<slug>/<id>` segments in `url`'s path.
///
/// Returns `None` for unparsable URLs and for paths without both segments.
#[must_use]
pub fn org_path(url: &str) -> Option<OrgPath> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let org = segments.iter().position(|s| *s == "org")?;
    let slug = segments.get(org + 1).filter(|s| !s.is_empty())?;
    let id = segments.get(org + 2).filter(|s| !s.is_empty())?;
    Some(OrgPath {
        slug: (*slug).to_string(),
        id: (*id).to_string(),
    })
}

/// All per-venue outputs of one detail tab.
#[derive(Debug, Clone, Default)]
pub struct DetailExtraction {
    pub fields: ExtractedFields,
    pub offerings: BTreeMap<String, String>,
    pub reviews: Vec<String>,
}

/// Build the record for the detail page at `page_url`. Never fails: absent
/// fields become empty and a URL without an organization id gets a fresh UUID.
#[must_use]
pub fn assemble(
    page_url: &str,
    extraction: DetailExtraction,
    captured_at: DateTime<Utc>,
) -> VenueRecord {
    let id = org_path(page_url).map_or_else(
        || {
            tracing::debug!(page_url, "no organization id in URL, generating one");
            VenueRecord::generated_id()
        },
        |p| p.id,
    );

    let DetailExtraction {
        fields,
        offerings,
        reviews,
    } = extraction;

    let mut record = VenueRecord::empty(id, captured_at);
    record.name = fields.name.unwrap_or_default();
    record.category = fields.category.unwrap_or_default();
    record.address = fields.address.unwrap_or_default();
    record.website = fields.website.unwrap_or_default();
    record.opening_hours = fields.opening_hours.unwrap_or_default();
    record.rating = fields.rating.unwrap_or_default();
    record.page_url = page_url.to_string();
    record.offerings = offerings;
    record.reviews = reviews;
    record
}
