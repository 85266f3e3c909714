//! Query resolution as an ordered list of strategies.
//!
//! Each strategy looks at the caller's text and at what happened to the image
//! and either produces a `(query, source)` pair or passes. The first strategy
//! that produces wins; when none does, the caller falls back to the example set.

use crate::types::SearchSource;

/// What became of the image part of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The request carried no image.
    Absent,
    /// An image was supplied but could not be used: no vision client is
    /// configured, or the image failed validation.
    Unusable,
    /// The vision client described the image.
    Described(String),
    /// The vision client was asked and failed.
    DescriptionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Combined,
    ImageOnly,
    TextFallback,
    TextOnly,
}

/// Strategies in the order they are tried.
pub const STRATEGIES: [Strategy; 4] = [
    Strategy::Combined,
    Strategy::ImageOnly,
    Strategy::TextFallback,
    Strategy::TextOnly,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub query: String,
    pub source: SearchSource,
}

impl Strategy {
    pub fn attempt(self, text: Option<&str>, image: &ImageOutcome) -> Option<ResolvedQuery> {
        let (query, source) = match (self, text, image) {
            (Self::Combined, Some(t), ImageOutcome::Described(d)) => {
                (format!("{t} {d}"), SearchSource::Combined)
            }
            (Self::ImageOnly, None, ImageOutcome::Described(d)) => {
                (d.clone(), SearchSource::Image)
            }
            (Self::TextFallback, Some(t), ImageOutcome::DescriptionFailed) => {
                (t.to_string(), SearchSource::TextFallback)
            }
            (Self::TextOnly, Some(t), ImageOutcome::Absent | ImageOutcome::Unusable) => {
                (t.to_string(), SearchSource::Text)
            }
            _ => return None,
        };
        Some(ResolvedQuery {
            query: query.trim().to_string(),
            source,
        })
    }
}

/// Run [`STRATEGIES`] in order; `text` must already be trimmed and non-empty when present.
pub fn resolve_query(text: Option<&str>, image: &ImageOutcome) -> Option<ResolvedQuery> {
    STRATEGIES.iter().find_map(|s| s.attempt(text, image))
}

/// Count of non-whitespace characters; short queries are not worth a provider call.
pub fn is_usable_query(query: &str, min_chars: usize) -> bool {
    query.chars().filter(|c| !c.is_whitespace()).count() >= min_chars
}
