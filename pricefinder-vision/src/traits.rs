use async_trait::async_trait;
use pricefinder_common::Result;

use crate::photo::PreparedImage;

#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Turn a product photo into a short English shopping query.
    ///
    /// Empty or blocked answers are errors; callers treat every error as a
    /// soft failure and fall back to the text query.
    async fn describe(&self, image: &PreparedImage) -> Result<String>;

    /// Check if the vision service is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Instruction sent alongside every image.
    fn product_query_prompt(&self) -> &str {
        r#"Analyze this product image and write one specific search query, in English, that would find this exact product in online stores.

Include:
- Exact product name
- Brand (if visible)
- Model or distinguishing features
- Color and size
- Product category

Respond ONLY with the search query, optimized for e-commerce.
Example: blue painter's tape 2 inch width"#
    }
}

/// Normalise a model answer into a single-line query.
pub fn clean_description(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let cleaned = line
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
