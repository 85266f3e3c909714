//! Search orchestrator: query resolution, caching, provider fetch, ranking.
//!
//! [`SearchOrchestrator::search`] walks resolve, cache check, provider fetch,
//! normalize, rank and cache store in that order, with no retries.

pub mod resolve;
pub mod search;

pub use search::{provider_query, rank, SearchOrchestrator};
