//! Free-form price text to a bounded number.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::PriceBounds;

// `$`, optional space, 1-4 digits, optional `,ddd` groups, then either a
// `.dd` fraction or anything but a digit. Digits after the fraction are ignored.
const PRICE_PATTERN: &str = r"\$\s*([0-9]{1,4}(?:,[0-9]{3})*)(?:(\.[0-9]{2})|[^0-9]|$)";

static PRICE_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn price_regex() -> Option<&'static Regex> {
    PRICE_RE
        .get_or_init(|| Regex::new(PRICE_PATTERN).ok())
        .as_ref()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceExtractor {
    bounds: PriceBounds,
}

impl PriceExtractor {
    pub fn new(bounds: PriceBounds) -> Self {
        Self { bounds }
    }

    /// First dollar amount in `text`, or `0.0` when none is found or it is out of bounds.
    pub fn extract(&self, text: &str) -> f64 {
        let Some(caps) = price_regex().and_then(|re| re.captures(text)) else {
            return 0.0;
        };
        let mut digits = caps[1].replace(',', "");
        if let Some(fraction) = caps.get(2) {
            digits.push_str(fraction.as_str());
        }
        match digits.parse::<f64>() {
            Ok(value) if self.bounds.contains(value) => value,
            _ => 0.0,
        }
    }
}

/// [`PriceExtractor::extract`] with the default bounds.
pub fn extract_price(text: &str) -> f64 {
    PriceExtractor::default().extract(text)
}
