//! Search configuration with the production defaults.
//!
//! [`SearchConfig`] carries every tuning constant of the pipeline: price
//! bounds, synthetic price bases, the store denylist, cache sizing and the
//! boundary limits. [`SearchConfig::validate`] is called once when the
//! orchestrator is built.

use std::time::Duration;

use pricefinder_vision::photo::ImageLimits;

use crate::error::SearchError;

/// Storefronts excluded from results by default.
pub const DEFAULT_BLOCKED_STORES: &[&str] = &[
    "alibaba",
    "aliexpress",
    "temu",
    "wish",
    "banggood",
    "dhgate",
    "falabella",
    "ripley",
    "linio",
    "mercadolibre",
];

/// Query used for the catch-all example set.
pub const PLACEHOLDER_QUERY: &str = "product";

/// Display text for absent titles and stores.
pub const NO_INFORMATION: &str = "No information";

/// Display fields are cut to this many characters before escaping.
pub const MAX_DISPLAY_CHARS: usize = 120;

/// Inclusive range a parsed price must fall into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min: 0.01,
            max: 50_000.0,
        }
    }
}

impl PriceBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Constants behind the deterministic synthetic price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackTuning {
    pub electronics_base: f64,
    pub apparel_base: f64,
    pub default_base: f64,
    /// Relative increase per rank position.
    pub step: f64,
}

impl Default for FallbackTuning {
    fn default() -> Self {
        Self {
            electronics_base: 400.0,
            apparel_base: 35.0,
            default_base: 25.0,
            step: 0.15,
        }
    }
}

/// Configuration for the aggregation pipeline.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Provider engine name; decides which result key is read.
    pub engine: String,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    /// Listings returned per search after ranking.
    pub max_results: usize,
    /// Raw items considered, and listings accepted, per provider response.
    pub max_items_per_response: usize,
    pub price_bounds: PriceBounds,
    pub fallback: FallbackTuning,
    pub blocked_stores: Vec<String>,
    /// Resolved queries with fewer non-whitespace characters fall back to examples.
    pub min_query_chars: usize,
    pub max_query_chars: usize,
    pub max_image_bytes: usize,
    pub image_limits: ImageLimits,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: "google_shopping".into(),
            cache_ttl: Duration::from_secs(180),
            cache_max_entries: 10,
            max_results: 6,
            max_items_per_response: 3,
            price_bounds: PriceBounds::default(),
            fallback: FallbackTuning::default(),
            blocked_stores: DEFAULT_BLOCKED_STORES.iter().map(|s| s.to_string()).collect(),
            min_query_chars: 2,
            max_query_chars: 80,
            max_image_bytes: 10 * 1024 * 1024,
            image_limits: ImageLimits::default(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), SearchError> {
        let b = &self.price_bounds;
        if !(b.min > 0.0 && b.min <= b.max && b.max.is_finite()) {
            return Err(SearchError::Config(format!(
                "price bounds must satisfy 0 < min <= max, got {}..{}",
                b.min, b.max
            )));
        }
        let f = &self.fallback;
        if [f.electronics_base, f.apparel_base, f.default_base]
            .iter()
            .any(|base| !b.contains(*base))
        {
            return Err(SearchError::Config(
                "fallback base prices must lie within the price bounds".into(),
            ));
        }
        if !(f.step >= 0.0 && f.step.is_finite()) {
            return Err(SearchError::Config(
                "fallback step must be non-negative".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.max_items_per_response == 0 {
            return Err(SearchError::Config(
                "max_items_per_response must be greater than 0".into(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(SearchError::Config(
                "cache_max_entries must be greater than 0".into(),
            ));
        }
        if self.max_query_chars < self.min_query_chars {
            return Err(SearchError::Config(
                "max_query_chars must be >= min_query_chars".into(),
            ));
        }
        if self.engine.trim().is_empty() {
            return Err(SearchError::Config("engine must not be empty".into()));
        }
        Ok(())
    }
}
