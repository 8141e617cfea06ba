//! Browser session and page abstractions.
//!
//! [`BrowserSession`] owns the primary (listing) page and hands out
//! background detail tabs. [`PageHandle`] is the narrow set of page
//! operations the crawl needs; queries return `Ok(None)`/`Ok(false)` for
//! absent elements and reserve `Err` for real failures.

use async_trait::async_trait;
use venuedb_core::{Selectors, Timing};

use crate::error::CrawlError;
use crate::wait::wait_for_selector;

#[async_trait]
pub trait PageHandle: Send + Sync + Sized {
    /// Navigate and wait for the document to load.
    async fn navigate(&self, url: &str) -> Result<(), CrawlError>;

    async fn current_url(&self) -> Result<String, CrawlError>;

    /// Serialized DOM of the current document.
    async fn html(&self) -> Result<String, CrawlError>;

    async fn exists(&self, selector: &str) -> Result<bool, CrawlError>;

    /// Rendered text of the first element matching `selector`.
    async fn text_of(&self, selector: &str) -> Result<Option<String>, CrawlError>;

    /// Attribute `name` of the first element matching `selector`.
    async fn attribute_of(&self, selector: &str, name: &str)
        -> Result<Option<String>, CrawlError>;

    /// Absolute `href` of every element matching `selector`, in document order.
    async fn hrefs(&self, selector: &str) -> Result<Vec<String>, CrawlError>;

    /// Click the first element matching `selector`. `Ok(false)` if none exists.
    async fn click_first(&self, selector: &str) -> Result<bool, CrawlError>;

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), CrawlError>;

    async fn press_enter(&self, selector: &str) -> Result<(), CrawlError>;

    /// Press the scrollbar thumb matching `selector`, drag it `dy` pixels
    /// vertically and release.
    ///
    /// # Errors
    ///
    /// [`CrawlError::DragOutOfBounds`] when the target point falls outside
    /// the visible track; [`CrawlError::ElementMissing`] when there is no thumb.
    async fn drag_thumb(&self, selector: &str, dy: f64) -> Result<(), CrawlError>;

    async fn close(self) -> Result<(), CrawlError>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync + Sized {
    type Page: PageHandle;

    /// The tab holding the search results.
    fn primary(&self) -> &Self::Page;

    /// Open `url` in a new background tab. The primary tab keeps its focus
    /// and scroll position. The caller owns the returned tab and must close it.
    async fn open_detail_tab(&self, url: &str) -> Result<Self::Page, CrawlError>;

    /// Close every tab and release the browser.
    async fn shutdown(self) -> Result<(), CrawlError>;
}

/// Load the map root on `page` and submit `query` through the search form.
///
/// # Errors
///
/// Every failure is fatal ([`CrawlError::is_fatal`]) except session loss:
/// [`CrawlError::MapUnreachable`] when the root does not load,
/// [`CrawlError::SearchInputMissing`] when no text input appears within the
/// navigation budget, [`CrawlError::SearchSubmit`] when the query cannot be
/// entered. There is no fallback: results of a malformed search are
/// meaningless, so the caller aborts the run.
pub async fn open_search<P: PageHandle>(
    page: &P,
    base_url: &str,
    query: &str,
    selectors: &Selectors,
    timing: &Timing,
) -> Result<(), CrawlError> {
    tracing::info!(base_url, query, "opening map search");
    page.navigate(base_url).await.map_err(|e| {
        if e.ends_session() {
            e
        } else {
            CrawlError::MapUnreachable {
                url: base_url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    submit_search(page, base_url, query, selectors, timing)
        .await
        .map_err(|e| {
            if e.ends_session() || e.is_fatal() {
                e
            } else {
                CrawlError::SearchSubmit {
                    url: base_url.to_string(),
                    reason: e.to_string(),
                }
            }
        })
}

async fn submit_search<P: PageHandle>(
    page: &P,
    base_url: &str,
    query: &str,
    selectors: &Selectors,
    timing: &Timing,
) -> Result<(), CrawlError> {
    let found = wait_for_selector(
        page,
        &selectors.search_input,
        timing.nav_settle(),
        timing.poll_interval(),
    )
    .await?;
    if !found {
        return Err(CrawlError::SearchInputMissing {
            url: base_url.to_string(),
            selector: selectors.search_input.clone(),
        });
    }

    // An input without a `type` attribute is a text input.
    if let Some(kind) = page.attribute_of(&selectors.search_input, "type").await? {
        if !kind.eq_ignore_ascii_case("text") {
            tracing::warn!(kind, "search input is not a text field");
            return Err(CrawlError::SearchInputMissing {
                url: base_url.to_string(),
                selector: selectors.search_input.clone(),
            });
        }
    }

    page.type_into(&selectors.search_input, query).await?;

    if !page.click_first(&selectors.search_button).await? {
        tracing::debug!("search button missing, submitting with Enter");
        page.press_enter(&selectors.search_input).await?;
    }

    let listed = wait_for_selector(
        page,
        &selectors.listing_anchor,
        timing.nav_settle(),
        timing.poll_interval(),
    )
    .await?;
    if !listed {
        tracing::warn!(query, "no listing results rendered within settle budget");
    }

    Ok(())
}
