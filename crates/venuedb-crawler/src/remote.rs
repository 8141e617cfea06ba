//! Resolution of a remote browser's DevTools WebSocket endpoint.

use std::time::Duration;

use serde::Deserialize;

use crate::error::CrawlError;

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
}

/// Turn a configured remote browser URL into the WebSocket URL chromiumoxide
/// connects to.
///
/// A `ws://`/`wss://` URL that already points at `/devtools/browser/...` is
/// used as is. Anything else is treated as the DevTools HTTP root and its
/// `/json/version` endpoint is asked for `webSocketDebuggerUrl`.
///
/// # Errors
///
/// - [`CrawlError::RemoteBrowser`] if the version endpoint is unreachable or
///   returns a non-JSON body.
/// - [`CrawlError::MissingDebuggerUrl`] if the response lacks the field.
pub async fn resolve_debugger_url(url: &str, timeout_secs: u64) -> Result<String, CrawlError> {
    let is_ws = url.starts_with("ws://") || url.starts_with("wss://");
    if is_ws && url.contains("/devtools/browser/") {
        return Ok(url.to_string());
    }

    let http_url = url
        .replacen("wss://", "https://", 1)
        .replacen("ws://", "http://", 1);
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|source| CrawlError::RemoteBrowser {
            url: url.to_string(),
            source,
        })?;

    let info: VersionInfo = client
        .get(&version_url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|source| CrawlError::RemoteBrowser {
            url: url.to_string(),
            source,
        })?
        .json()
        .await
        .map_err(|source| CrawlError::RemoteBrowser {
            url: url.to_string(),
            source,
        })?;

    let ws_url = info
        .web_socket_debugger_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CrawlError::MissingDebuggerUrl {
            url: url.to_string(),
        })?;

    tracing::debug!(url, ws_url, "resolved remote browser endpoint");
    Ok(ws_url)
}
