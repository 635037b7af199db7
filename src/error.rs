use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single fetch attempt, or of the whole retry budget.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("empty response body")]
    Empty,
    #[error("blocking or captcha page detected")]
    Blocked,
    #[error("{url} unreachable after {attempts} attempts (last error: {last})")]
    Unreachable {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Unreachable { .. })
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid page URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unexpected page structure: {0}")]
    Structure(String),
}

/// Errors that abort a run before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sources file {path} could not be read: {source}")]
    SourcesUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sources file {path} is not valid JSON: {source}")]
    SourcesInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no usable sources configured")]
    NoSources,
    #[error("existing dataset {path} could not be read: {source}")]
    DatasetUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("existing dataset {path} is not a valid dataset document: {source}")]
    DatasetInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid HTTP client settings: {0}")]
    Client(String),
    #[error("invalid settings: {0}")]
    Settings(#[from] config::ConfigError),
}
