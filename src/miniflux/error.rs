//! Errors from the Miniflux API client.

use thiserror::Error;

/// Failure talking to the Miniflux API. Any variant is fatal for a run (CLI exit code 1).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid Miniflux URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Miniflux rejected the credentials (HTTP 401) at {url}. Check Username and Password.")]
    Unauthorized { url: String },

    #[error("Access forbidden (HTTP 403) at {url}.")]
    Forbidden { url: String },

    #[error("Not found (HTTP 404): {url}. Check MinifluxUrl.")]
    NotFound { url: String },

    #[error("HTTP {status} from {url}: {message}")]
    HttpStatus {
        status: u16,
        url: String,
        /// `error_message` from the response body, or the status reason.
        message: String,
    },

    #[error("Could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
