//! Error types for rate fetching and conversion

use thiserror::Error;

/// Failure while talking to a rate provider.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Transport(String),

    #[error("HTTP error: {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed rates payload: {0}")]
    Payload(String),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt could reasonably succeed.
    ///
    /// Connection problems, timeouts, server errors and rate limiting are
    /// transient. Other client errors and bad payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Payload(_) | FetchError::InvalidUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Payload(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Currency {code} not supported for base {base}")]
    UnknownCurrency { base: String, code: String },

    #[error("Failed to fetch rates for {base} after {attempts} attempt(s): {source}")]
    RateFetch {
        base: String,
        attempts: usize,
        #[source]
        source: FetchError,
    },
}

pub type Result<T, E = ConversionError> = std::result::Result<T, E>;
