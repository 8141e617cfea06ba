//! Bounded readiness polling.
//!
//! Client-side rendering gives no reliable "done" event, so every UI action
//! is followed by polling for the element the next step needs. The budget is
//! the worst-case wait; polling returns as soon as the condition holds.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::CrawlError;
use crate::session::PageHandle;

/// Poll `probe` every `interval` until it yields `true` or `budget` elapses.
///
/// The probe always runs at least once, so a zero budget is a single check.
/// Returns `Ok(false)` on timeout.
///
/// # Errors
///
/// Propagates the first probe error.
pub async fn poll_until<F, Fut>(
    budget: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<bool, CrawlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, CrawlError>>,
{
    let deadline = Instant::now() + budget;
    loop {
        if probe().await? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Wait until `selector` matches an element on `page`.
///
/// # Errors
///
/// Propagates page errors from the existence check.
pub async fn wait_for_selector<P: PageHandle>(
    page: &P,
    selector: &str,
    budget: Duration,
    interval: Duration,
) -> Result<bool, CrawlError> {
    let ready = poll_until(budget, interval, || page.exists(selector)).await?;
    if !ready {
        tracing::debug!(
            selector,
            budget_ms = budget.as_millis(),
            "selector not ready within budget"
        );
    }
    Ok(ready)
}
