use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pricefinder_config::{PriceFinderConfig, ProviderSection, SearchSection, VisionSection};
use pricefinder_search::config::DEFAULT_BLOCKED_STORES;
use pricefinder_search::provider::{SerpApiConfig, SerpApiProvider};
use pricefinder_search::{FallbackTuning, PriceBounds, SearchConfig, SearchOrchestrator};
use pricefinder_vision::build_vision_client;
use pricefinder_vision::config::VisionConfig;
use pricefinder_vision::photo::ImageLimits;
use pricefinder_vision::traits::VisionClient;

pub fn search_config(
    section: &SearchSection,
    provider: &ProviderSection,
    vision: &VisionSection,
) -> SearchConfig {
    let blocked_stores = match &section.blocked_stores {
        Some(list) => list.clone(),
        None => DEFAULT_BLOCKED_STORES.iter().map(|s| s.to_string()).collect(),
    };
    SearchConfig {
        engine: provider.engine.clone(),
        cache_ttl: Duration::from_secs(section.cache_ttl_secs),
        cache_max_entries: section.cache_max_entries,
        max_results: section.max_results,
        max_items_per_response: section.max_items_per_response,
        price_bounds: PriceBounds {
            min: section.min_price,
            max: section.max_price,
        },
        fallback: FallbackTuning {
            electronics_base: section.electronics_base,
            apparel_base: section.apparel_base,
            default_base: section.default_base,
            step: section.fallback_step,
        },
        blocked_stores,
        max_query_chars: section.max_query_chars,
        max_image_bytes: section.max_image_bytes,
        image_limits: image_limits(vision),
        ..SearchConfig::default()
    }
}

fn image_limits(vision: &VisionSection) -> ImageLimits {
    ImageLimits {
        min_dimension: vision.min_dimension,
        max_dimension: vision.max_dimension,
    }
}

pub fn build_provider(section: &ProviderSection) -> Result<SerpApiProvider> {
    let api_key = section.resolved_api_key();
    if api_key.is_none() {
        tracing::warn!("provider.unconfigured: no SerpAPI key found, searches will return examples");
    }
    SerpApiProvider::new(SerpApiConfig {
        api_key,
        base_url: section.base_url.clone(),
        num: section.num,
        location: section.location.clone(),
        gl: section.gl.clone(),
        pacing: Duration::from_millis(section.pacing_ms),
        connect_timeout: Duration::from_secs(section.connect_timeout_secs),
        read_timeout: Duration::from_secs(section.read_timeout_secs),
    })
    .context("building SerpAPI provider")
}

/// `None` when vision is disabled or has no key; images are then ignored.
pub fn build_vision(section: &VisionSection) -> Result<Option<Arc<dyn VisionClient>>> {
    let Some(api_key) = section.resolved_api_key() else {
        tracing::info!(enabled = section.enabled, "vision.unconfigured");
        return Ok(None);
    };
    let config = VisionConfig {
        api_key,
        model: section.model.clone(),
        base_url: section.base_url.clone(),
        timeout: Duration::from_secs(section.timeout_secs),
    };
    let client = build_vision_client(&config).context("building vision client")?;
    Ok(Some(client))
}

pub fn build_from_config(cfg: &PriceFinderConfig) -> Result<Arc<SearchOrchestrator>> {
    let search = search_config(&cfg.search, &cfg.provider, &cfg.vision);
    let mut orchestrator = SearchOrchestrator::new(search)
        .context("invalid search configuration")?
        .with_provider(Arc::new(build_provider(&cfg.provider)?));
    if let Some(vision) = build_vision(&cfg.vision)? {
        orchestrator = orchestrator.with_vision(vision);
    }
    tracing::info!(
        provider = orchestrator.provider_configured(),
        vision = orchestrator.vision_configured(),
        "app.orchestrator.ready"
    );
    Ok(Arc::new(orchestrator))
}
