//! Core search orchestrator: resolve, cache, fetch, normalize, rank.
//!
//! Nothing in here fails towards the caller. Vision problems degrade the
//! source tag, provider problems degrade to the example set, and malformed
//! items are skipped.

use std::sync::Arc;
use std::time::Instant;

use pricefinder_common::query_fingerprint;
use pricefinder_vision::photo::prepare_image;
use pricefinder_vision::traits::VisionClient;

use super::resolve::{is_usable_query, resolve_query, ImageOutcome, ResolvedQuery};
use crate::cache::ResultCache;
use crate::config::{SearchConfig, PLACEHOLDER_QUERY};
use crate::error::{Result, SearchError};
use crate::fallback::FallbackPriceEstimator;
use crate::normalize::ResultNormalizer;
use crate::provider::ShoppingProvider;
use crate::types::{Listing, RawItem, SearchOutcome, SearchRequest, SearchSource};

/// Phrase the provider query the way shopping results respond to best.
pub fn provider_query(query: &str) -> String {
    format!("\"{query}\" buy online")
}

/// Stable ascending sort by price, truncate, and stamp provenance.
///
/// Synthetic example listings keep their `example` tag.
pub fn rank(
    mut listings: Vec<Listing>,
    max_results: usize,
    source: SearchSource,
    original_query: &str,
) -> Vec<Listing> {
    listings.sort_by(|a, b| a.price_numeric.total_cmp(&b.price_numeric));
    listings.truncate(max_results);
    for listing in &mut listings {
        if listing.search_source != SearchSource::Example {
            listing.search_source = source;
        }
        listing.original_query = original_query.to_string();
    }
    listings
}

/// Shared, process-lifetime search service.
///
/// Build once and share through an `Arc`; the cache lives inside.
pub struct SearchOrchestrator {
    config: SearchConfig,
    normalizer: ResultNormalizer,
    estimator: FallbackPriceEstimator,
    cache: ResultCache,
    provider: Option<Arc<dyn ShoppingProvider>>,
    vision: Option<Arc<dyn VisionClient>>,
}

impl SearchOrchestrator {
    /// Validate `config` and build an orchestrator with no collaborators.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: ResultNormalizer::from_config(&config),
            estimator: FallbackPriceEstimator::new(config.fallback),
            cache: ResultCache::new(config.cache_ttl, config.cache_max_entries),
            provider: None,
            vision: None,
            config,
        })
    }

    pub fn with_provider(mut self, provider: Arc<dyn ShoppingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionClient>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn provider_configured(&self) -> bool {
        self.provider.as_ref().is_some_and(|p| p.is_configured())
    }

    pub fn vision_configured(&self) -> bool {
        self.vision.is_some()
    }

    pub fn vision_model(&self) -> Option<&str> {
        self.vision.as_deref().map(|v| v.model_name())
    }

    /// Probe the vision collaborator; `None` when none is configured.
    pub async fn vision_healthy(&self) -> Option<bool> {
        let vision = self.vision.as_ref()?;
        Some(vision.health_check().await.unwrap_or(false))
    }

    /// Boundary validation with this orchestrator's limits.
    pub fn validate_request(&self, request: SearchRequest) -> Result<SearchRequest> {
        request.validated(&self.config)
    }

    /// Degraded answer for a request that could not be served in time.
    pub fn fallback_outcome(&self, request: &SearchRequest) -> SearchOutcome {
        let query = request
            .trimmed_text()
            .filter(|t| is_usable_query(t, self.config.min_query_chars))
            .unwrap_or(PLACEHOLDER_QUERY);
        self.example_outcome(query, &request.original_query())
    }

    fn example_outcome(&self, query: &str, original_query: &str) -> SearchOutcome {
        let listings = rank(
            self.estimator.example_set(query),
            self.config.max_results,
            SearchSource::Example,
            original_query,
        );
        SearchOutcome {
            listings,
            source: SearchSource::Example,
            query: query.to_string(),
            cached: false,
        }
    }

    async fn describe_image(&self, bytes: &[u8]) -> ImageOutcome {
        let Some(vision) = &self.vision else {
            tracing::warn!("search.image_ignored: no vision client configured");
            return ImageOutcome::Unusable;
        };

        let owned = bytes.to_vec();
        let limits = self.config.image_limits;
        let prepared = match tokio::task::spawn_blocking(move || prepare_image(&owned, &limits)).await {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(err)) => {
                tracing::info!(error = %err, "search.image_invalid");
                return ImageOutcome::Unusable;
            }
            Err(err) => {
                tracing::warn!(error = %err, "search.image_prepare_panicked");
                return ImageOutcome::Unusable;
            }
        };

        match vision.describe(&prepared).await {
            Ok(description) => ImageOutcome::Described(description),
            Err(err) => {
                let err = SearchError::from(err);
                tracing::warn!(model = %vision.model_name(), error = %err, "search.vision_failed");
                ImageOutcome::DescriptionFailed
            }
        }
    }

    async fn fetch(&self, query: &str) -> Vec<RawItem> {
        let Some(provider) = self.provider.as_ref().filter(|p| p.is_configured()) else {
            tracing::info!("search.provider_skipped: no credential configured");
            return Vec::new();
        };
        let engine = self.config.engine.as_str();
        match provider.search(engine, &provider_query(query)).await {
            Ok(response) => {
                let items = response.items(engine);
                tracing::debug!(provider = provider.name(), count = items.len(), "search.provider_ok");
                items
            }
            Err(err) => {
                tracing::warn!(provider = provider.name(), error = %err, "search.provider_failed");
                Vec::new()
            }
        }
    }

    /// Run one search to completion.
    pub async fn search(&self, request: SearchRequest) -> SearchOutcome {
        let started = Instant::now();
        let text = request.trimmed_text();
        let original_query = request.original_query();

        let image = match request.image.as_deref().filter(|b| !b.is_empty()) {
            Some(bytes) => self.describe_image(bytes).await,
            None => ImageOutcome::Absent,
        };

        let resolved = resolve_query(text, &image)
            .filter(|r| is_usable_query(&r.query, self.config.min_query_chars));
        let Some(ResolvedQuery { query, source }) = resolved else {
            tracing::info!("search.unresolved: returning placeholder examples");
            return self.example_outcome(PLACEHOLDER_QUERY, &original_query);
        };

        let query_fp = query_fingerprint(&query);
        tracing::info!(query_fp = %query_fp, source = %source, "search.start");
        tracing::trace!(query = %query, "search.query");

        if let Some(listings) = self.cache.get(&query) {
            tracing::info!(query_fp = %query_fp, count = listings.len(), "search.cache_hit");
            return SearchOutcome {
                listings,
                source,
                query,
                cached: true,
            };
        }

        let items = self.fetch(&query).await;
        let mut listings = self.normalizer.normalize_batch(&items);
        if listings.is_empty() {
            tracing::info!(query_fp = %query_fp, "search.no_listings: using examples");
            listings = self.estimator.example_set(&query);
        }

        let listings = rank(listings, self.config.max_results, source, &original_query);
        self.cache.insert(&query, listings.clone());

        tracing::info!(
            query_fp = %query_fp,
            count = listings.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "search.done"
        );

        SearchOutcome {
            listings,
            source,
            query,
            cached: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(price: f64, source: SearchSource) -> Listing {
        Listing {
            title: format!("item {price}"),
            price: format!("${price:.2}"),
            price_numeric: price,
            store: "Store".into(),
            link: "#".into(),
            rating: String::new(),
            review_count: String::new(),
            search_source: source,
            original_query: String::new(),
        }
    }

    #[test]
    fn provider_query_is_quoted() {
        assert_eq!(provider_query("usb hub"), "\"usb hub\" buy online");
    }

    #[test]
    fn rank_sorts_truncates_and_keeps_example_tag() {
        let input = vec![
            listing(30.0, SearchSource::Text),
            listing(10.0, SearchSource::Example),
            listing(20.0, SearchSource::Text),
            listing(5.0, SearchSource::Text),
        ];
        let out = rank(input, 3, SearchSource::Combined, "shoes");
        let prices: Vec<_> = out.iter().map(|l| l.price_numeric).collect();
        assert_eq!(prices, [5.0, 10.0, 20.0]);
        assert_eq!(out[0].search_source, SearchSource::Combined);
        assert_eq!(out[1].search_source, SearchSource::Example);
        assert!(out.iter().all(|l| l.original_query == "shoes"));
    }

    #[test]
    fn rank_is_stable_for_equal_prices() {
        let mut a = listing(10.0, SearchSource::Text);
        a.title = "first".into();
        let mut b = listing(10.0, SearchSource::Text);
        b.title = "second".into();
        let out = rank(vec![a, b], 6, SearchSource::Text, "q");
        assert_eq!(out[0].title, "first");
        assert_eq!(out[1].title, "second");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SearchConfig {
            max_results: 0,
            ..Default::default()
        };
        assert!(matches!(
            SearchOrchestrator::new(config),
            Err(SearchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn empty_query_returns_placeholder_examples() {
        let orch = SearchOrchestrator::new(SearchConfig::default()).unwrap();
        let outcome = orch.search(SearchRequest::text("")).await;
        assert_eq!(outcome.source, SearchSource::Example);
        assert_eq!(outcome.query, "product");
        assert_eq!(outcome.listings.len(), 3);
        assert!(outcome
            .listings
            .iter()
            .all(|l| l.search_source == SearchSource::Example));
        assert!(outcome
            .listings
            .windows(2)
            .all(|w| w[0].price_numeric <= w[1].price_numeric));
        assert!(orch.cache().is_empty());
    }

    #[tokio::test]
    async fn image_without_vision_client_uses_text() {
        let orch = SearchOrchestrator::new(SearchConfig::default()).unwrap();
        let outcome = orch
            .search(SearchRequest::text("coffee mug").with_image(vec![1, 2, 3]))
            .await;
        assert_eq!(outcome.source, SearchSource::Text);
        assert_eq!(outcome.query, "coffee mug");
    }

    #[test]
    fn fallback_outcome_uses_text_when_usable() {
        let orch = SearchOrchestrator::new(SearchConfig::default()).unwrap();
        let outcome = orch.fallback_outcome(&SearchRequest::text("gaming laptop"));
        assert_eq!(outcome.query, "gaming laptop");
        assert_eq!(outcome.listings[0].price_numeric, 400.0);
        assert_eq!(outcome.listings[0].original_query, "gaming laptop");

        let outcome = orch.fallback_outcome(&SearchRequest::default().with_image(vec![9]));
        assert_eq!(outcome.query, "product");
        assert_eq!(outcome.listings[0].original_query, "image");
    }
}
