use std::path::PathBuf;
use std::time::Duration;

/// How the crawler obtains its browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    /// Run without a visible window.
    pub headless: bool,
    /// Explicit Chrome/Chromium executable. Looked up on `PATH` when `None`.
    pub chrome_path: Option<PathBuf>,
    /// DevTools endpoint of an already running browser (e.g. `http://chrome:9222`).
    /// When set, nothing is launched locally.
    pub remote_url: Option<String>,
    /// Upper bound for a single navigation.
    pub nav_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            remote_url: None,
            nav_timeout_secs: 30,
        }
    }
}

/// Readiness budgets. Each value is the worst-case wait after a UI action;
/// the crawler polls every `poll_interval_ms` and moves on as soon as the
/// expected element shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub nav_settle_ms: u64,
    pub tab_settle_ms: u64,
    pub menu_settle_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            nav_settle_ms: 2000,
            tab_settle_ms: 1000,
            menu_settle_ms: 2000,
            poll_interval_ms: 100,
        }
    }
}

impl Timing {
    /// Zero budgets, for tests against pages that are ready immediately.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            nav_settle_ms: 0,
            tab_settle_ms: 0,
            menu_settle_ms: 0,
            poll_interval_ms: 1,
        }
    }

    #[must_use]
    pub fn nav_settle(&self) -> Duration {
        Duration::from_millis(self.nav_settle_ms)
    }

    #[must_use]
    pub fn tab_settle(&self) -> Duration {
        Duration::from_millis(self.tab_settle_ms)
    }

    #[must_use]
    pub fn menu_settle(&self) -> Duration {
        Duration::from_millis(self.menu_settle_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Map service root, e.g. `https://yandex.ru/maps`.
    pub base_url: String,
    pub log_level: String,
    /// Default `max_items` for a crawl when the caller does not specify one.
    pub max_items: usize,
    /// Thumb drag distance for one listing scroll step.
    pub listing_scroll_px: u32,
    /// Thumb drag distance for one review scroll step.
    pub review_scroll_px: u32,
    /// Optional YAML file overriding the built-in selectors.
    pub selectors_path: Option<PathBuf>,
    pub browser: BrowserSettings,
    pub timing: Timing,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("base_url", &self.base_url)
            .field("log_level", &self.log_level)
            .field("max_items", &self.max_items)
            .field("listing_scroll_px", &self.listing_scroll_px)
            .field("review_scroll_px", &self.review_scroll_px)
            .field("selectors_path", &self.selectors_path)
            .field("headless", &self.browser.headless)
            .field("chrome_path", &self.browser.chrome_path)
            // Hosted DevTools endpoints carry their access token in the URL.
            .field(
                "remote_url",
                &self.browser.remote_url.as_ref().map(|_| "[redacted]"),
            )
            .field("nav_timeout_secs", &self.browser.nav_timeout_secs)
            .field("timing", &self.timing)
            .finish()
    }
}
