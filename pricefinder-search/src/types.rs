//! Core data types: listings, provenance tags, raw provider records, requests.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Which input modality produced the query behind a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    Text,
    Image,
    Combined,
    TextFallback,
    /// Synthetic listing; never produced by the provider.
    Example,
}

impl SearchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Combined => "combined",
            Self::TextFallback => "text_fallback",
            Self::Example => "example",
        }
    }
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized, sanitized product result ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: String,
    /// Sort key; always within the configured price bounds.
    pub price_numeric: f64,
    pub store: String,
    pub link: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub review_count: String,
    pub search_source: SearchSource,
    #[serde(default)]
    pub original_query: String,
}

/// An unvalidated provider record.
///
/// Accessors never fail: missing keys, nulls, arrays and objects all read as
/// `None`. Numbers are rendered to their display form.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem(Value);

impl RawItem {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// True for anything that is not an object with at least one key.
    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_none_or(|m| m.is_empty())
    }

    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// Scalar field as display text. Empty strings read as `None`.
    pub fn field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        self.field("title")
    }

    pub fn price(&self) -> Option<String> {
        self.field("price")
    }

    /// Storefront name; SerpAPI calls it `source`.
    pub fn store(&self) -> Option<String> {
        self.field("source")
    }

    pub fn product_link(&self) -> Option<String> {
        self.field("product_link")
    }

    pub fn link(&self) -> Option<String> {
        self.field("link")
    }

    pub fn rating(&self) -> Option<String> {
        self.field("rating")
    }

    pub fn reviews(&self) -> Option<String> {
        self.field("reviews")
    }
}

impl From<Value> for RawItem {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Whole provider payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse(Value);

impl RawResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Result list key for an engine.
    pub fn results_key(engine: &str) -> &'static str {
        if engine == "google_shopping" {
            "shopping_results"
        } else {
            "organic_results"
        }
    }

    /// Items under the engine-specific key, in provider order.
    pub fn items(&self, engine: &str) -> Vec<RawItem> {
        self.0
            .get(Self::results_key(engine))
            .and_then(Value::as_array)
            .map(|arr| arr.iter().cloned().map(RawItem::new).collect())
            .unwrap_or_default()
    }

    /// Provider-reported error (SerpAPI answers some failures with 200 + `error`).
    pub fn error_message(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }
}

/// Outcome of one orchestrated search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub listings: Vec<Listing>,
    pub source: SearchSource,
    /// Resolved query the listings were fetched for.
    pub query: String,
    pub cached: bool,
}

/// Caller input: free text, an image, or both.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub text: Option<String>,
    pub image: Option<Vec<u8>>,
}

impl SearchRequest {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            text: Some(query.into()),
            image: None,
        }
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }

    /// Trimmed text when it has any content.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.image.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Boundary validation: trims and truncates the text, drops empty parts,
    /// rejects oversized images and requests with neither part.
    pub fn validated(self, config: &SearchConfig) -> Result<Self, SearchError> {
        let text = self
            .trimmed_text()
            .map(|t| pricefinder_common::truncate_chars(t, config.max_query_chars).to_string());
        let image = self.image.filter(|b| !b.is_empty());

        if let Some(bytes) = &image {
            if bytes.len() > config.max_image_bytes {
                return Err(SearchError::Input(format!(
                    "image exceeds {} bytes",
                    config.max_image_bytes
                )));
            }
        }
        if text.is_none() && image.is_none() {
            return Err(SearchError::Input(
                "a query or an image is required".into(),
            ));
        }
        Ok(Self { text, image })
    }

    /// Value recorded as `original_query` on every listing.
    pub fn original_query(&self) -> String {
        match self.trimmed_text() {
            Some(t) => t.to_string(),
            None if self.has_image() => "image".to_string(),
            None => String::new(),
        }
    }
}
