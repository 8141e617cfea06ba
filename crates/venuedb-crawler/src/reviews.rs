//! Review collection from a venue's reviews page.

use venuedb_core::{Selectors, Timing};

use crate::error::CrawlError;
use crate::extract::DomSnapshot;
use crate::session::PageHandle;
use crate::wait::poll_until;

/// Reviews above which the paginator scrolls longer.
const LARGE_REVIEW_COUNT: u32 = 150;
const SHORT_CYCLES: u32 = 3;
const LONG_CYCLES: u32 = 5;

/// Number of expand-and-scroll cycles for a venue with `count` reviews.
#[must_use]
pub fn cycle_budget(count: u32) -> u32 {
    if count > LARGE_REVIEW_COUNT {
        LONG_CYCLES
    } else {
        SHORT_CYCLES
    }
}

/// Parse the review counter text. Digit groups may be split by regular or
/// non-breaking spaces (`"1 204"`). Anything unparsable counts as zero.
#[must_use]
pub fn parse_review_count(text: &str) -> u32 {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    digits.parse().unwrap_or(0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewOutcome {
    /// Review texts in rendered order.
    pub reviews: Vec<String>,
    /// Count shown on the page counter, 0 when unreadable.
    pub review_count: u32,
    /// Cycles that completed before the budget ran out or a failure stopped the loop.
    pub cycles_run: u32,
}

pub struct ReviewPaginator<'a> {
    selectors: &'a Selectors,
    timing: &'a Timing,
    scroll_px: f64,
}

impl<'a> ReviewPaginator<'a> {
    #[must_use]
    pub fn new(selectors: &'a Selectors, timing: &'a Timing, scroll_px: u32) -> Self {
        Self {
            selectors,
            timing,
            scroll_px: f64::from(scroll_px),
        }
    }

    /// Load `reviews_url` in `page`, expand and scroll through the review
    /// list, then read every rendered review text.
    ///
    /// Page-level failures degrade to a partial or empty outcome.
    ///
    /// # Errors
    ///
    /// Only errors that end the browser session are returned.
    pub async fn collect<P: PageHandle>(
        &self,
        page: &P,
        reviews_url: &str,
    ) -> Result<ReviewOutcome, CrawlError> {
        match self.collect_inner(page, reviews_url).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.ends_session() => Err(e),
            Err(e) => {
                tracing::debug!(url = reviews_url, error = %e, "reviews unavailable");
                Ok(ReviewOutcome::default())
            }
        }
    }

    async fn collect_inner<P: PageHandle>(
        &self,
        page: &P,
        reviews_url: &str,
    ) -> Result<ReviewOutcome, CrawlError> {
        page.navigate(reviews_url).await?;

        let counter = self.selectors.review_counter.as_str();
        let text = self.selectors.review_text.as_str();
        poll_until(
            self.timing.nav_settle(),
            self.timing.poll_interval(),
            move || async move {
                Ok::<_, CrawlError>(page.exists(counter).await? || page.exists(text).await?)
            },
        )
        .await?;

        let review_count = {
            let html = page.html().await?;
            self.count_from_html(&html)
        };
        let budget = cycle_budget(review_count);

        let mut cycles_run = 0;
        for cycle in 0..budget {
            match self.run_cycle(page).await {
                Ok(()) => cycles_run += 1,
                Err(e) if e.ends_session() => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        cycle,
                        error = %e,
                        "review cycle failed, keeping what is rendered"
                    );
                    break;
                }
            }
        }

        let html = page.html().await?;
        let reviews = DomSnapshot::parse(&html)
            .texts(text)
            .into_iter()
            .filter(|r| !r.is_empty())
            .collect();

        Ok(ReviewOutcome {
            reviews,
            review_count,
            cycles_run,
        })
    }

    fn count_from_html(&self, html: &str) -> u32 {
        DomSnapshot::parse(html)
            .texts(&self.selectors.review_counter)
            .last()
            .map_or(0, |t| parse_review_count(t))
    }

    /// Expand the first truncated review, then drag the scrollbar. A drag
    /// that lands outside the track is repeated once without the expand click.
    async fn run_cycle<P: PageHandle>(&self, page: &P) -> Result<(), CrawlError> {
        page.click_first(&self.selectors.review_expand).await?;

        match page.drag_thumb(&self.selectors.scroll_thumb, self.scroll_px).await {
            Err(e) if e.is_out_of_bounds() => {
                tracing::debug!(error = %e, "review drag out of bounds, retrying");
                page.drag_thumb(&self.selectors.scroll_thumb, self.scroll_px)
                    .await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_five_above_150() {
        assert_eq!(cycle_budget(151), 5);
        assert_eq!(cycle_budget(1204), 5);
    }

    #[test]
    fn budget_is_three_at_or_below_150() {
        assert_eq!(cycle_budget(150), 3);
        assert_eq!(cycle_budget(0), 3);
    }

    #[test]
    fn count_parses_plain_number() {
        assert_eq!(parse_review_count("87"), 87);
    }

    #[test]
    fn count_strips_group_separators() {
        assert_eq!(parse_review_count("1\u{a0}204"), 1204);
        assert_eq!(parse_review_count(" 2 310 "), 2310);
    }

    #[test]
    fn non_numeric_count_is_zero() {
        assert_eq!(parse_review_count("Отзывы"), 0);
        assert_eq!(parse_review_count(""), 0);
        assert_eq!(parse_review_count("12k"), 0);
    }

    #[test]
    fn count_uses_last_counter_element() {
        let selectors = Selectors::default();
        let timing = Timing::immediate();
        let paginator = ReviewPaginator::new(&selectors, &timing, 25);
        let html = r#"
            <div class="tabs-select-view__counter">12</div>
            <div class="tabs-select-view__counter">240</div>
        "#;
        assert_eq!(paginator.count_from_html(html), 240);
    }
}
