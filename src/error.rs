//! Error types shared by the fetch and publish phases.
//!
//! Every failure a run can hit is one [`RepublishError`] variant. The fetch
//! phase surfaces `Network`, `Remote`, `Malformed` and `LocaleMismatch` as-is;
//! the publish phase wraps the last attempt's error in `Publish` once the retry
//! budget for a batch is spent.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, RepublishError>;

#[derive(Debug, Error)]
pub enum RepublishError {
    /// Transport-level failure reaching either API
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-2xx status
    #[error("remote error: HTTP {status}: {body}")]
    Remote {
        /// HTTP status code returned by the API
        status: u16,
        /// Raw response body, kept for the operator's log
        body: String,
    },

    /// The API answered 2xx but the body could not be understood
    #[error("malformed response: {0}")]
    Malformed(String),

    /// An entry came back tagged with a locale other than the one requested
    #[error("entry {uid} has locale {found}, expected {expected}")]
    LocaleMismatch {
        uid: String,
        expected: String,
        found: String,
    },

    /// A publish batch failed on every attempt
    #[error("publishing batch {batch} for locale {locale} failed after {attempts} attempts: {source}")]
    Publish {
        locale: String,
        /// Zero-based batch index within the locale
        batch: usize,
        attempts: u32,
        #[source]
        source: Box<RepublishError>,
    },

    /// Missing secret or invalid settings
    #[error("configuration error: {0}")]
    Config(String),

    /// The operator prompt could not be read or written
    #[error("prompt error: {0}")]
    Prompt(#[from] std::io::Error),
}

impl RepublishError {
    /// Payload worth showing in a log line: the response body for remote
    /// failures, the message otherwise.
    pub fn payload(&self) -> String {
        match self {
            RepublishError::Remote { body, .. } => body.clone(),
            RepublishError::Publish { source, .. } => source.payload(),
            other => other.to_string(),
        }
    }
}
