use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("another run holds the lock on {path}")]
    LockHeld { path: PathBuf },

    #[error("storage directory does not exist: {path}")]
    MissingStorageRoot { path: PathBuf },

    #[error("failed to retrieve {url} after {attempts} attempts: {reason}")]
    FetchFailure {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("cannot decode payload from {url} as {charset}")]
    Encoding { url: String, charset: String },

    #[error("{path} is {existing} bytes on disk but the new version is only {candidate} bytes")]
    StaleOrSuspiciousWrite {
        path: PathBuf,
        existing: u64,
        candidate: u64,
    },

    #[error("{source_name} changed! Found {found} data tables rather than {expected}")]
    SchemaMismatch {
        source_name: String,
        found: usize,
        expected: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
