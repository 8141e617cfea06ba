//! Offerings panel: expansion and price-list extraction.

use std::collections::BTreeMap;

use venuedb_core::{Selectors, Timing};

use crate::error::CrawlError;
use crate::extract::DomSnapshot;
use crate::session::PageHandle;
use crate::wait::poll_until;

/// Result of [`maybe_expand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandedState {
    /// No offerings panel on the page; the earlier snapshot still applies.
    Unchanged,
    /// The panel was opened; `html` is the DOM after expansion.
    Expanded { html: String },
}

/// Open the offerings panel if the feature panel advertises one.
///
/// The panel counts as an offerings panel when its text contains one of the
/// configured menu keywords. After the click the page is polled for any
/// offering node for up to the menu budget; the DOM is captured either way.
///
/// # Errors
///
/// Propagates page errors. Callers treat anything short of session loss as
/// an empty offerings map.
pub async fn maybe_expand<P: PageHandle>(
    page: &P,
    selectors: &Selectors,
    timing: &Timing,
) -> Result<ExpandedState, CrawlError> {
    let Some(panel_text) = page.text_of(&selectors.feature_panel).await? else {
        return Ok(ExpandedState::Unchanged);
    };
    if !selectors.is_menu_panel(&panel_text) {
        tracing::debug!(panel = panel_text.as_str(), "feature panel is not an offerings panel");
        return Ok(ExpandedState::Unchanged);
    }

    if !page.click_first(&selectors.feature_panel).await? {
        return Ok(ExpandedState::Unchanged);
    }

    let showcase = selectors.showcase_title.as_str();
    let list = selectors.list_title.as_str();
    let rendered = poll_until(timing.menu_settle(), timing.poll_interval(), move || async move {
        Ok::<_, CrawlError>(page.exists(showcase).await? || page.exists(list).await?)
    })
    .await?;
    if !rendered {
        tracing::debug!("offerings panel opened but no items rendered");
    }

    Ok(ExpandedState::Expanded {
        html: page.html().await?,
    })
}

/// Read both offering layouts from `dom` and pair labels with prices.
///
/// Labels are the showcase titles followed by the list titles; prices are
/// collected in the same order.
#[must_use]
pub fn extract_offerings(dom: &DomSnapshot, selectors: &Selectors) -> BTreeMap<String, String> {
    let mut labels = dom.texts(&selectors.showcase_title);
    labels.extend(dom.texts(&selectors.list_title));

    let mut prices = dom.texts(&selectors.showcase_price);
    prices.extend(dom.texts(&selectors.list_price));

    zip_offerings(labels, prices)
}

/// Pair labels with prices by position.
///
/// Only `min(labels, prices)` pairs are kept: when one layout is missing its
/// prices the tail is dropped and later items may pair with the wrong price.
/// A repeated label keeps its last price.
#[must_use]
pub fn zip_offerings(labels: Vec<String>, prices: Vec<String>) -> BTreeMap<String, String> {
    if labels.len() != prices.len() {
        tracing::debug!(
            labels = labels.len(),
            prices = prices.len(),
            "offering label/price counts differ, truncating"
        );
    }
    labels.into_iter().zip(prices).collect()
}
