//! Error types for the search pipeline.
//!
//! Only [`SearchError::Input`] ever reaches a caller; every other class is
//! absorbed inside the orchestrator and turned into a degraded result. No API
//! keys or raw provider bodies appear in messages.

use pricefinder_common::PriceFinderError;
use pricefinder_http::HttpError;

/// Errors raised while resolving, fetching or normalising a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The caller supplied nothing usable (no text, no image, oversized image).
    #[error("invalid input: {0}")]
    Input(String),

    /// The shopping provider failed at transport, status or payload level.
    #[error("provider error: {0}")]
    Provider(String),

    /// The vision collaborator could not describe the image.
    #[error("vision error: {0}")]
    Vision(String),

    /// A single raw provider item could not be turned into a listing.
    #[error("malformed item: {0}")]
    Data(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for pipeline results.
pub type Result<T> = std::result::Result<T, SearchError>;

impl From<HttpError> for SearchError {
    fn from(err: HttpError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<PriceFinderError> for SearchError {
    fn from(err: PriceFinderError) -> Self {
        match err {
            PriceFinderError::InvalidInput(msg) => Self::Input(msg),
            PriceFinderError::Config(msg) => Self::Config(msg),
            other => Self::Vision(other.to_string()),
        }
    }
}
