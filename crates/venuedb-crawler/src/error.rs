use chromiumoxide::error::CdpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("could not reach remote browser at {url}: {source}")]
    RemoteBrowser {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("remote browser at {url} did not report a DevTools WebSocket URL")]
    MissingDebuggerUrl { url: String },

    #[error("DevTools protocol error: {0}")]
    Cdp(#[from] CdpError),

    #[error("DevTools request rejected: {0}")]
    Protocol(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("map root {url} unreachable: {reason}")]
    MapUnreachable { url: String, reason: String },

    #[error("search input not found on {url} (selector \"{selector}\")")]
    SearchInputMissing { url: String, selector: String },

    #[error("search on {url} could not be submitted: {reason}")]
    SearchSubmit { url: String, reason: String },

    #[error("element not found: {selector}")]
    ElementMissing { selector: String },

    #[error("drag target y={target_y} outside visible track (0..={track_height})")]
    DragOutOfBounds { target_y: f64, track_height: f64 },

    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("crawl cancelled")]
    Cancelled,
}

impl CrawlError {
    /// True for failures that leave no usable search page: the browser never
    /// came up, the map root did not load, or the search could not be
    /// submitted. The crawl returns these as errors with no records.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CrawlError::Launch(_)
                | CrawlError::RemoteBrowser { .. }
                | CrawlError::MissingDebuggerUrl { .. }
                | CrawlError::MapUnreachable { .. }
                | CrawlError::SearchInputMissing { .. }
                | CrawlError::SearchSubmit { .. }
        )
    }

    /// True when the browser itself is gone and no further page operation
    /// can succeed. The orchestrator ends the run instead of skipping the item.
    #[must_use]
    pub fn ends_session(&self) -> bool {
        match self {
            CrawlError::SessionLost(_) => true,
            CrawlError::Cdp(e) => matches!(
                e,
                CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse
            ),
            _ => false,
        }
    }

    /// True for the drag failure that the review paginator retries once.
    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, CrawlError::DragOutOfBounds { .. })
    }
}
