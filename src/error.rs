//! Application error types

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Distinguished "no data for this date" condition (e.g. a 404 from a
    /// historical endpoint on a non-trading day). Not a failure: callers
    /// must not count it against the consecutive-failure ledger.
    #[error("No data available: {0}")]
    NoData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for the distinguished empty-result condition.
    pub fn is_no_data(&self) -> bool {
        matches!(self, AppError::NoData(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
