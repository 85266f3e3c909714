//! Shopping-search provider seam.
//!
//! The orchestrator only sees [`ShoppingProvider`]; the SerpAPI backend
//! lives in [`serpapi`]. Tests substitute counting mocks.

pub mod serpapi;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RawResponse;

pub use serpapi::{SerpApiConfig, SerpApiProvider};

/// An external shopping-search API.
///
/// Implementations issue exactly one request per call and never retry;
/// every failure is reported as [`crate::SearchError::Provider`].
#[async_trait]
pub trait ShoppingProvider: Send + Sync {
    /// Query `engine` for `query` and return the untrusted payload.
    async fn search(&self, engine: &str, query: &str) -> Result<RawResponse>;

    /// Whether a credential is present.
    fn is_configured(&self) -> bool;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
