use std::path::PathBuf;

use crate::app_config::{AppConfig, BrowserSettings, Timing};
use crate::venues::DEFAULT_MAX_ITEMS;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a usable
/// config. Decoupled from the process environment so tests can feed a plain
/// `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let base_url = or_default("YMAPS_BASE_URL", "https://yandex.ru/maps")
        .trim_end_matches('/')
        .to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "YMAPS_BASE_URL".to_string(),
            reason: format!("expected an http(s) URL, got \"{base_url}\""),
        });
    }

    let log_level = or_default("YMAPS_LOG_LEVEL", "info");
    let headless = parse_bool("YMAPS_HEADLESS", &or_default("YMAPS_HEADLESS", "true"))?;
    let chrome_path = optional("YMAPS_CHROME_PATH").map(PathBuf::from);
    let remote_url = optional("YMAPS_BROWSER_URL");
    let nav_timeout_secs = parse_u64("YMAPS_NAV_TIMEOUT_SECS", "30")?;

    let timing = Timing {
        nav_settle_ms: parse_u64("YMAPS_NAV_SETTLE_MS", "2000")?,
        tab_settle_ms: parse_u64("YMAPS_TAB_SETTLE_MS", "1000")?,
        menu_settle_ms: parse_u64("YMAPS_MENU_SETTLE_MS", "2000")?,
        poll_interval_ms: parse_u64("YMAPS_POLL_INTERVAL_MS", "100")?,
    };

    let max_items = parse_usize("YMAPS_MAX_ITEMS", &DEFAULT_MAX_ITEMS.to_string())?;
    let listing_scroll_px = parse_u32("YMAPS_LISTING_SCROLL_PX", "100")?;
    let review_scroll_px = parse_u32("YMAPS_REVIEW_SCROLL_PX", "25")?;
    let selectors_path = optional("YMAPS_SELECTORS_PATH").map(PathBuf::from);

    Ok(AppConfig {
        base_url,
        log_level,
        max_items,
        listing_scroll_px,
        review_scroll_px,
        selectors_path,
        browser: BrowserSettings {
            headless,
            chrome_path,
            remote_url,
            nav_timeout_secs,
        },
        timing,
    })
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no` in any case.
fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
