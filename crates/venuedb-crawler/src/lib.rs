//! Headless-browser crawler for venue listings on the map service.
//!
//! The crawl searches the map, walks the virtualized result list and opens
//! each result in a background tab, extracting one [`VenueRecord`] per
//! detail page. Field extraction degrades per field; only a failed search
//! aborts the run.

pub mod assemble;
pub mod chrome;
pub mod error;
pub mod export;
pub mod extract;
pub mod hours;
pub mod listing;
pub mod menu;
pub mod orchestrator;
pub mod remote;
pub mod reviews;
pub mod session;
pub mod wait;

pub use assemble::{assemble, org_path, DetailExtraction, OrgPath};
pub use chrome::{ChromeSession, ChromeTab};
pub use error::CrawlError;
pub use export::{parse_rating, IndexDocument, IndexMetadata, VenueRow};
pub use extract::{DomSnapshot, ExtractedFields, FieldExtractor};
pub use hours::{normalize_opening_hours, WeeklyHours};
pub use listing::{AnchorCache, ListingAnchor, ListingScroller};
pub use menu::{extract_offerings, maybe_expand, zip_offerings, ExpandedState};
pub use orchestrator::{
    extract_detail, AbortReason, CrawlReport, CrawlSettings, CrawlState, Crawler, SkippedItem,
};
pub use reviews::{cycle_budget, parse_review_count, ReviewOutcome, ReviewPaginator};
pub use session::{open_search, BrowserSession, PageHandle};

pub use venuedb_core::{CrawlRequest, VenueRecord};
