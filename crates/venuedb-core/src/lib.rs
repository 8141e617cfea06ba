pub mod app_config;
pub mod config;
pub mod selectors;
pub mod venues;

use thiserror::Error;

pub use app_config::{AppConfig, BrowserSettings, Timing};
pub use config::{load_app_config, load_app_config_from_env};
pub use selectors::{load_selectors, Selectors};
pub use venues::{CrawlRequest, VenueRecord, DEFAULT_MAX_ITEMS, VENUE_SOURCE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read selectors file {path}: {source}")]
    SelectorsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse selectors file: {0}")]
    SelectorsFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
