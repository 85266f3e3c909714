//! Raw provider record to sanitized [`Listing`].

use crate::config::{SearchConfig, MAX_DISPLAY_CHARS, NO_INFORMATION};
use crate::error::{Result, SearchError};
use crate::fallback::{form_encode, FallbackPriceEstimator};
use crate::price::PriceExtractor;
use crate::store_filter::StoreFilter;
use crate::types::{Listing, RawItem, SearchSource};

const MIN_TITLE_CHARS: usize = 3;
const LINK_TITLE_CHARS: usize = 50;
const SHOPPING_SEARCH_URL: &str = "https://www.google.com/search?tbm=shop&q=";

/// Escape `&`, `<`, `>`, `"` and `'` for safe display.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Truncate to 120 characters, then escape. Absent or empty text reads as "No information".
pub fn clean_text(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.is_empty() => {
            html_escape(pricefinder_common::truncate_chars(t, MAX_DISPLAY_CHARS))
        }
        _ => NO_INFORMATION.to_string(),
    }
}

fn resolve_link(item: &RawItem) -> String {
    if let Some(link) = item.product_link().or_else(|| item.link()) {
        return link;
    }
    match item.title() {
        Some(title) => format!(
            "{SHOPPING_SEARCH_URL}{}",
            form_encode(pricefinder_common::truncate_chars(&title, LINK_TITLE_CHARS))
        ),
        None => "#".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    extractor: PriceExtractor,
    filter: StoreFilter,
    estimator: FallbackPriceEstimator,
    max_items: usize,
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl ResultNormalizer {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            extractor: PriceExtractor::new(config.price_bounds),
            filter: StoreFilter::new(&config.blocked_stores),
            estimator: FallbackPriceEstimator::new(config.fallback),
            max_items: config.max_items_per_response,
        }
    }

    /// Convert one item, explaining why it was rejected.
    ///
    /// `accepted_so_far` is the rank index fed to the synthetic price.
    pub fn try_normalize(&self, item: &RawItem, accepted_so_far: usize) -> Result<Listing> {
        if !item.is_object() {
            return Err(SearchError::Data("item is not an object".into()));
        }
        if item.is_empty() {
            return Err(SearchError::Data("empty item".into()));
        }
        let store = item.store();
        if let Some(store) = &store {
            if self.filter.is_blacklisted(store) {
                return Err(SearchError::Data(format!("blocked store {store:?}")));
            }
        }
        let title = item
            .title()
            .filter(|t| t.chars().count() >= MIN_TITLE_CHARS)
            .ok_or_else(|| SearchError::Data("title absent or too short".into()))?;

        let raw_price = item.price();
        let parsed = raw_price
            .as_deref()
            .map_or(0.0, |p| self.extractor.extract(p));
        // A parsed 0.00 is indistinguishable from "unparsable" and is synthesized too.
        let (price, price_numeric) = match raw_price {
            Some(text) if parsed > 0.0 => (text, parsed),
            _ => {
                let synthetic = self.estimator.estimate(&title, accepted_so_far);
                (format!("${synthetic:.2}"), synthetic)
            }
        };

        Ok(Listing {
            title: clean_text(Some(&title)),
            price,
            price_numeric,
            store: clean_text(store.as_deref()),
            link: resolve_link(item),
            rating: item.rating().unwrap_or_default(),
            review_count: item.reviews().unwrap_or_default(),
            search_source: SearchSource::Text,
            original_query: String::new(),
        })
    }

    /// Convert one item; rejected items read as `None`.
    pub fn normalize(&self, item: &RawItem, accepted_so_far: usize) -> Option<Listing> {
        self.try_normalize(item, accepted_so_far).ok()
    }

    /// Convert the leading items of one provider response, in provider order.
    pub fn normalize_batch(&self, items: &[RawItem]) -> Vec<Listing> {
        let mut accepted = Vec::with_capacity(self.max_items);
        for (position, item) in items.iter().take(self.max_items).enumerate() {
            match self.try_normalize(item, accepted.len()) {
                Ok(listing) => accepted.push(listing),
                Err(err) => tracing::debug!(position, error = %err, "normalize.skip"),
            }
            if accepted.len() >= self.max_items {
                break;
            }
        }
        accepted
    }
}
