//! The crawl loop.
//!
//! One [`Crawler`] drives one browser session through
//! `Idle -> Searching -> (ScrollingList <-> ExtractingDetail) -> Done | Aborted`.
//! Items are processed strictly one after another; every detail tab is
//! closed before the next item starts.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use venuedb_core::{AppConfig, CrawlRequest, Selectors, Timing, VenueRecord};

use crate::assemble::{assemble, org_path, DetailExtraction};
use crate::error::CrawlError;
use crate::extract::{DomSnapshot, FieldExtractor};
use crate::listing::ListingScroller;
use crate::menu::{extract_offerings, maybe_expand, ExpandedState};
use crate::reviews::ReviewPaginator;
use crate::session::{open_search, BrowserSession, PageHandle};
use crate::wait::wait_for_selector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum AbortReason {
    SessionLost(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CrawlState {
    Idle,
    Searching,
    ScrollingList { index: usize },
    ExtractingDetail { index: usize, url: String },
    Done,
    Aborted { reason: AbortReason },
}

impl CrawlState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlState::Done | CrawlState::Aborted { .. })
    }
}

/// A listing result that produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub index: usize,
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub records: Vec<VenueRecord>,
    pub skipped: Vec<SkippedItem>,
    pub final_state: CrawlState,
}

impl CrawlReport {
    #[must_use]
    pub fn aborted(&self) -> Option<&AbortReason> {
        match &self.final_state {
            CrawlState::Aborted { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Everything the crawl loop needs besides the browser.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub base_url: String,
    pub selectors: Selectors,
    pub timing: Timing,
    pub listing_scroll_px: u32,
    pub review_scroll_px: u32,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, selectors: Selectors) -> Self {
        Self {
            base_url: config.base_url.clone(),
            selectors,
            timing: config.timing,
            listing_scroll_px: config.listing_scroll_px,
            review_scroll_px: config.review_scroll_px,
        }
    }
}

pub struct Crawler<S: BrowserSession> {
    session: S,
    settings: CrawlSettings,
    cancel: CancellationToken,
}

fn enter(state: &mut CrawlState, next: CrawlState) {
    tracing::debug!(from = ?state, to = ?next, "crawl state transition");
    *state = next;
}

impl<S: BrowserSession> Crawler<S> {
    #[must_use]
    pub fn new(session: S, settings: CrawlSettings) -> Self {
        Self {
            session,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run when `token` is cancelled. Records collected so far are
    /// still returned.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the crawl to completion and release the browser.
    ///
    /// # Errors
    ///
    /// Returns the search error when it is fatal ([`CrawlError::is_fatal`]):
    /// root page unreachable, search input missing, query not submitted. No
    /// records exist in that case. Session loss and cancellation end the run
    /// as [`CrawlState::Aborted`]; later failures only skip items.
    pub async fn run(self, request: &CrawlRequest) -> Result<CrawlReport, CrawlError> {
        let Crawler {
            session,
            settings,
            cancel,
        } = self;

        let outcome = crawl(&session, &settings, &cancel, request).await;

        if let Err(e) = session.shutdown().await {
            tracing::warn!(error = %e, "browser shutdown failed");
        }

        outcome
    }
}

async fn crawl<S: BrowserSession>(
    session: &S,
    settings: &CrawlSettings,
    cancel: &CancellationToken,
    request: &CrawlRequest,
) -> Result<CrawlReport, CrawlError> {
    let mut state = CrawlState::Idle;
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let query = request.search_query();

    tracing::info!(
        query = query.as_str(),
        max_items = request.max_items,
        "starting crawl"
    );

    enter(&mut state, CrawlState::Searching);
    let searched = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CrawlError::Cancelled),
        r = open_search(
            session.primary(),
            &settings.base_url,
            &query,
            &settings.selectors,
            &settings.timing,
        ) => r,
    };
    match searched {
        Ok(()) => {}
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "search failed, aborting crawl");
            return Err(e);
        }
        Err(e) => {
            // Cancelled or browser gone before any result was listed.
            abort(&mut state, &e);
            return Ok(CrawlReport {
                records,
                skipped,
                final_state: state,
            });
        }
    }

    let mut scroller = ListingScroller::new(
        &settings.selectors,
        &settings.timing,
        settings.listing_scroll_px,
    );

    for index in 0..request.max_items {
        if cancel.is_cancelled() {
            abort(&mut state, &CrawlError::Cancelled);
            break;
        }

        enter(&mut state, CrawlState::ScrollingList { index });
        let anchor = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CrawlError::Cancelled),
            r = scroller.anchor_for(session.primary(), index) => r,
        };
        let anchor = match anchor {
            Ok(Some(anchor)) => anchor,
            Ok(None) => {
                tracing::info!(index, "listing exhausted");
                break;
            }
            Err(e) => {
                abort(&mut state, &e);
                break;
            }
        };

        enter(
            &mut state,
            CrawlState::ExtractingDetail {
                index,
                url: anchor.url.clone(),
            },
        );
        match process_item(session, settings, cancel, &anchor.url).await {
            Ok(record) => {
                tracing::info!(
                    index,
                    id = record.id.as_str(),
                    name = record.name.as_str(),
                    "venue captured"
                );
                records.push(record);
            }
            Err(e) if matches!(e, CrawlError::Cancelled) || e.ends_session() => {
                abort(&mut state, &e);
                break;
            }
            Err(e) => {
                tracing::warn!(index, url = anchor.url.as_str(), error = %e, "skipping venue");
                skipped.push(SkippedItem {
                    index,
                    url: anchor.url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !state.is_terminal() {
        enter(&mut state, CrawlState::Done);
    }

    tracing::info!(
        records = records.len(),
        skipped = skipped.len(),
        state = ?state,
        "crawl finished"
    );

    Ok(CrawlReport {
        records,
        skipped,
        final_state: state,
    })
}

fn abort(state: &mut CrawlState, cause: &CrawlError) {
    let reason = match cause {
        CrawlError::Cancelled => AbortReason::Cancelled,
        other => AbortReason::SessionLost(other.to_string()),
    };
    tracing::warn!(reason = ?reason, "crawl aborted");
    enter(state, CrawlState::Aborted { reason });
}

/// Open `url` in a detail tab, extract it and close the tab. The tab is
/// closed on success, failure and cancellation alike.
async fn process_item<S: BrowserSession>(
    session: &S,
    settings: &CrawlSettings,
    cancel: &CancellationToken,
    url: &str,
) -> Result<VenueRecord, CrawlError> {
    let tab = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(CrawlError::Cancelled),
        r = session.open_detail_tab(url) => r?,
    };

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CrawlError::Cancelled),
        r = extract_detail(&tab, url, settings) => r,
    };

    if let Err(e) = tab.close().await {
        tracing::debug!(url, error = %e, "detail tab close failed");
    }

    outcome
}

fn offerings_from_html(html: &str, selectors: &Selectors) -> BTreeMap<String, String> {
    extract_offerings(&DomSnapshot::parse(html), selectors)
}

/// Run every extractor against an open detail tab.
///
/// # Errors
///
/// Page failures reading the detail page itself skip the item; offerings and
/// reviews degrade to empty unless the session is gone.
pub async fn extract_detail<P: PageHandle>(
    tab: &P,
    requested_url: &str,
    settings: &CrawlSettings,
) -> Result<VenueRecord, CrawlError> {
    let selectors = &settings.selectors;
    let timing = &settings.timing;

    let header_ready = wait_for_selector(
        tab,
        &selectors.name,
        timing.tab_settle(),
        timing.poll_interval(),
    )
    .await?;
    if !header_ready {
        tracing::debug!(url = requested_url, "venue header not rendered, extracting anyway");
    }

    let current = tab.current_url().await?;
    let page_url = if current.is_empty() || current == "about:blank" {
        requested_url.to_string()
    } else {
        current
    };

    let html = tab.html().await?;
    let fields = FieldExtractor::new(selectors).extract_html(&html);

    let offerings = match maybe_expand(tab, selectors, timing).await {
        Ok(ExpandedState::Expanded { html }) => offerings_from_html(&html, selectors),
        Ok(ExpandedState::Unchanged) => BTreeMap::new(),
        Err(e) if e.ends_session() => return Err(e),
        Err(e) => {
            tracing::debug!(url = page_url.as_str(), error = %e, "offerings unavailable");
            BTreeMap::new()
        }
    };

    let reviews = match org_path(&page_url) {
        Some(path) => {
            let reviews_url = path.reviews_url(&settings.base_url);
            ReviewPaginator::new(selectors, timing, settings.review_scroll_px)
                .collect(tab, &reviews_url)
                .await?
                .reviews
        }
        None => {
            tracing::debug!(url = page_url.as_str(), "no organization path, skipping reviews");
            Vec::new()
        }
    };

    Ok(assemble(
        &page_url,
        DetailExtraction {
            fields,
            offerings,
            reviews,
        },
        Utc::now(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(CrawlState::Done.is_terminal());
        assert!(CrawlState::Aborted {
            reason: AbortReason::Cancelled
        }
        .is_terminal());
        assert!(!CrawlState::ScrollingList { index: 0 }.is_terminal());
        assert!(!CrawlState::Idle.is_terminal());
    }

    #[test]
    fn abort_classifies_cancellation() {
        let mut state = CrawlState::ScrollingList { index: 2 };
        abort(&mut state, &CrawlError::Cancelled);
        assert_eq!(
            state,
            CrawlState::Aborted {
                reason: AbortReason::Cancelled
            }
        );

        abort(&mut state, &CrawlError::SessionLost("browser exited".to_string()));
        assert!(matches!(
            state,
            CrawlState::Aborted {
                reason: AbortReason::SessionLost(ref msg)
            } if msg.contains("browser exited")
        ));
    }

    #[test]
    fn settings_follow_config() {
        let config = AppConfig {
            base_url: "https://yandex.ru/maps".to_string(),
            log_level: "info".to_string(),
            max_items: 10,
            listing_scroll_px: 120,
            review_scroll_px: 30,
            selectors_path: None,
            browser: venuedb_core::BrowserSettings::default(),
            timing: Timing::immediate(),
        };
        let settings = CrawlSettings::from_config(&config, Selectors::default());
        assert_eq!(settings.listing_scroll_px, 120);
        assert_eq!(settings.review_scroll_px, 30);
        assert_eq!(settings.timing, Timing::immediate());
    }

    #[test]
    fn report_serializes_state() {
        let report = CrawlReport {
            records: Vec::new(),
            skipped: Vec::new(),
            final_state: CrawlState::Aborted {
                reason: AbortReason::Cancelled,
            },
        };
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["final_state"]["state"], "aborted");
        assert_eq!(json["final_state"]["reason"]["reason"], "cancelled");
        assert_eq!(report.aborted(), Some(&AbortReason::Cancelled));
    }
}
