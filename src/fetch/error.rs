//! Fetch failure classification.

use thiserror::Error;

/// Why a fetch attempt, or a whole fetch, failed.
///
/// `Timeout`, `Network` and `HttpStatus` describe a single attempt; the
/// retry loop treats every one of them as transient. The only per-attempt
/// failure a caller ever sees is the last one, wrapped in
/// `RetriesExhausted` together with the attempt count.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed after {attempts} attempts: {cause}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        cause: Box<FetchError>,
    },

    #[error("Run deadline exceeded while fetching: {url}")]
    DeadlineExceeded { url: String },
}

impl FetchError {
    /// The URL the failure relates to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url }
            | FetchError::Network { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::RetriesExhausted { url, .. }
            | FetchError::DeadlineExceeded { url } => url,
        }
    }
}
