//! Shopping result aggregation for pricefinder.
//!
//! Takes a text query and/or a product photo, resolves it to one search
//! phrase (asking the vision collaborator when there is an image), fetches
//! raw listings from the shopping provider, cleans and prices them, drops
//! blocked storefronts, ranks by price and serves repeats from a short-lived
//! cache. When nothing usable comes back, a deterministic example set is
//! returned instead, so a search always yields listings.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pricefinder_search::provider::{SerpApiConfig, SerpApiProvider};
//! use pricefinder_search::{SearchConfig, SearchOrchestrator, SearchRequest};
//!
//! # async fn run() -> Result<(), pricefinder_search::SearchError> {
//! let provider = SerpApiProvider::new(SerpApiConfig {
//!     api_key: Some("serpapi-key".into()),
//!     ..Default::default()
//! })?;
//! let orchestrator = SearchOrchestrator::new(SearchConfig::default())?
//!     .with_provider(Arc::new(provider));
//!
//! let outcome = orchestrator.search(SearchRequest::text("gaming laptop")).await;
//! for listing in &outcome.listings {
//!     println!("{} {} ({})", listing.price, listing.title, listing.store);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod orchestrator;
pub mod price;
pub mod provider;
pub mod store_filter;
pub mod types;

pub use cache::ResultCache;
pub use config::{FallbackTuning, PriceBounds, SearchConfig};
pub use error::{Result, SearchError};
pub use fallback::FallbackPriceEstimator;
pub use normalize::ResultNormalizer;
pub use orchestrator::SearchOrchestrator;
pub use price::{extract_price, PriceExtractor};
pub use provider::ShoppingProvider;
pub use store_filter::StoreFilter;
pub use types::{Listing, RawItem, RawResponse, SearchOutcome, SearchRequest, SearchSource};
