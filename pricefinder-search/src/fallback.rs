//! Deterministic synthetic prices and the example listing set.
//!
//! Used twice: to fill in a price for a real listing whose price text did not
//! parse, and to build the three placeholder listings returned when the
//! provider yields nothing.

use url::form_urlencoded;

use crate::config::FallbackTuning;
use crate::normalize::clean_text;
use crate::types::{Listing, SearchSource};

const ELECTRONICS_KEYWORDS: &[&str] = &["phone", "laptop"];
const APPAREL_KEYWORDS: &[&str] = &["shirt", "shoes"];

/// Characters of the query used in example store links.
const EXAMPLE_LINK_QUERY_CHARS: usize = 30;

struct ExampleStore {
    name: &'static str,
    search_url: &'static str,
    title_suffix: &'static str,
    rating: &'static str,
    reviews: &'static str,
}

const EXAMPLE_STORES: [ExampleStore; 3] = [
    ExampleStore {
        name: "Amazon",
        search_url: "https://www.amazon.com/s?k=",
        title_suffix: "Best Price",
        rating: "4.5",
        reviews: "500",
    },
    ExampleStore {
        name: "Walmart",
        search_url: "https://www.walmart.com/search?q=",
        title_suffix: "Deal",
        rating: "4.2",
        reviews: "300",
    },
    ExampleStore {
        name: "Target",
        search_url: "https://www.target.com/s?searchTerm=",
        title_suffix: "Popular",
        rating: "4.0",
        reviews: "200",
    },
];

/// `application/x-www-form-urlencoded` form of `s` (spaces become `+`).
pub(crate) fn form_encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPriceEstimator {
    tuning: FallbackTuning,
}

impl FallbackPriceEstimator {
    pub fn new(tuning: FallbackTuning) -> Self {
        Self { tuning }
    }

    fn base_for(&self, query: &str) -> f64 {
        let lower = query.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if mentions(ELECTRONICS_KEYWORDS) {
            self.tuning.electronics_base
        } else if mentions(APPAREL_KEYWORDS) {
            self.tuning.apparel_base
        } else {
            self.tuning.default_base
        }
    }

    /// `round(base * (1 + rank_index * step), 2)`.
    pub fn estimate(&self, query: &str, rank_index: usize) -> f64 {
        round2(self.base_for(query) * (1.0 + rank_index as f64 * self.tuning.step))
    }

    /// Three synthetic listings (Amazon, Walmart, Target) tagged `example`.
    pub fn example_set(&self, query: &str) -> Vec<Listing> {
        let encoded = form_encode(pricefinder_common::truncate_chars(
            query,
            EXAMPLE_LINK_QUERY_CHARS,
        ));
        let shown = clean_text(Some(query));

        EXAMPLE_STORES
            .iter()
            .enumerate()
            .map(|(i, store)| {
                let price = self.estimate(query, i);
                Listing {
                    title: format!("{shown} - {}", store.title_suffix),
                    price: format!("${price:.2}"),
                    price_numeric: price,
                    store: store.name.to_string(),
                    link: format!("{}{encoded}", store.search_url),
                    rating: store.rating.to_string(),
                    review_count: store.reviews.to_string(),
                    search_source: SearchSource::Example,
                    original_query: String::new(),
                }
            })
            .collect()
    }
}
