//! Walking the virtualized search-result list.
//!
//! The list only renders a window of results, so the crawler drags the
//! scrollbar once per item and re-reads the rendered links every
//! [`ANCHOR_REFRESH_EVERY`] items. Between refreshes the cached anchors are
//! used as is, even though the DOM behind them may have moved.

use venuedb_core::{Selectors, Timing};

use crate::error::CrawlError;
use crate::session::PageHandle;
use crate::wait::wait_for_selector;

/// Items between two anchor refreshes.
pub const ANCHOR_REFRESH_EVERY: usize = 5;

/// One result link as seen by the last refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingAnchor {
    /// Position in the rendered list at refresh time.
    pub position: usize,
    pub url: String,
    /// Item index at which the refresh that produced this anchor ran.
    pub refreshed_at: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AnchorCache {
    anchors: Vec<ListingAnchor>,
    refreshed_at: Option<usize>,
}

impl AnchorCache {
    /// Whether item `index` must re-scan the list before it is read.
    #[must_use]
    pub fn needs_refresh(index: usize) -> bool {
        index % ANCHOR_REFRESH_EVERY == 0
    }

    /// Replace the cached anchors with `urls`, scanned at item `index`.
    pub fn replace(&mut self, index: usize, urls: Vec<String>) {
        self.anchors = urls
            .into_iter()
            .enumerate()
            .map(|(position, url)| ListingAnchor {
                position,
                url,
                refreshed_at: index,
            })
            .collect();
        self.refreshed_at = Some(index);
    }

    /// Anchor for item `index`, or `None` once the cached list is exhausted.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ListingAnchor> {
        self.anchors.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    #[must_use]
    pub fn refreshed_at(&self) -> Option<usize> {
        self.refreshed_at
    }
}

pub struct ListingScroller<'a> {
    selectors: &'a Selectors,
    timing: &'a Timing,
    scroll_px: f64,
    cache: AnchorCache,
}

impl<'a> ListingScroller<'a> {
    #[must_use]
    pub fn new(selectors: &'a Selectors, timing: &'a Timing, scroll_px: u32) -> Self {
        Self {
            selectors,
            timing,
            scroll_px: f64::from(scroll_px),
            cache: AnchorCache::default(),
        }
    }

    /// Drag the list scrollbar down by the configured distance.
    ///
    /// # Errors
    ///
    /// Propagates page errors, including a missing scrollbar.
    pub async fn scroll_once<P: PageHandle>(&self, page: &P) -> Result<(), CrawlError> {
        page.drag_thumb(&self.selectors.scroll_thumb, self.scroll_px)
            .await
    }

    /// Re-scan the rendered list and replace the cached anchors.
    ///
    /// # Errors
    ///
    /// Propagates page errors; the cache is left untouched on failure.
    pub async fn refresh_anchors<P: PageHandle>(
        &mut self,
        page: &P,
        index: usize,
    ) -> Result<&[ListingAnchor], CrawlError> {
        let urls = page.hrefs(&self.selectors.listing_anchor).await?;
        tracing::debug!(index, anchors = urls.len(), "refreshed listing anchors");
        self.cache.replace(index, urls);
        Ok(&self.cache.anchors)
    }

    /// Advance the list for item `index` and return its anchor.
    ///
    /// Scroll and refresh failures are logged and the stale anchors reused;
    /// `Ok(None)` means the list has no result at `index`.
    ///
    /// # Errors
    ///
    /// Only errors that end the browser session are returned.
    pub async fn anchor_for<P: PageHandle>(
        &mut self,
        page: &P,
        index: usize,
    ) -> Result<Option<ListingAnchor>, CrawlError> {
        if let Err(e) = self.scroll_once(page).await {
            if e.ends_session() {
                return Err(e);
            }
            tracing::debug!(index, error = %e, "listing scroll failed");
        }

        if AnchorCache::needs_refresh(index) {
            let refreshed = match wait_for_selector(
                page,
                &self.selectors.listing_anchor,
                self.timing.nav_settle(),
                self.timing.poll_interval(),
            )
            .await
            {
                Ok(_) => self.refresh_anchors(page, index).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = refreshed {
                if e.ends_session() {
                    return Err(e);
                }
                tracing::warn!(
                    index,
                    cached = self.cache.len(),
                    refreshed_at = ?self.cache.refreshed_at(),
                    error = %e,
                    "anchor refresh failed, reusing previous anchors"
                );
            }
        }

        let anchor = self.cache.get(index).cloned();
        if anchor.is_none() {
            if self.cache.is_empty() {
                tracing::debug!(index, "listing rendered no anchors");
            } else {
                tracing::debug!(index, cached = self.cache.len(), "no anchor at index");
            }
        }
        Ok(anchor)
    }
}
