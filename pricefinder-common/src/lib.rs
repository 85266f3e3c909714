//! Common types and utilities shared across the pricefinder crates.
//!
//! This crate holds the shared error type, the logging initialiser, and a
//! couple of helpers that every crate needs when it writes log lines about
//! user input. It stays dependency-light so the search core and the
//! collaborator clients can depend on it freely.
//!
//! # Overview
//!
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`PriceFinderError`] and [`Result`]: error handling for collaborator clients
//! - [`query_fingerprint`]: a stable, non-reversible token for logging queries
//!
//! # Examples
//!
//! ```rust
//! use pricefinder_common::query_fingerprint;
//!
//! let a = query_fingerprint("Gaming Laptop");
//! let b = query_fingerprint("  gaming laptop ");
//! assert_eq!(a, b);
//! assert_eq!(a.len(), 12);
//! ```
pub mod observability;

/// Length of the hex prefix returned by [`query_fingerprint`].
const FINGERPRINT_LEN: usize = 12;

/// Error types used by the collaborator clients.
#[derive(thiserror::Error, Debug)]
pub enum PriceFinderError {
    /// The vision collaborator failed or returned nothing usable.
    #[error("Vision error: {0}")]
    Vision(String),

    /// Input handed to a collaborator was rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`PriceFinderError`].
pub type Result<T> = std::result::Result<T, PriceFinderError>;

/// Fingerprint a user query for logging.
///
/// The query is trimmed and lower-cased first so that the fingerprint lines
/// up with the cache key. Raw query text is only ever logged at trace level.
pub fn query_fingerprint(query: &str) -> String {
    let normalised = query.trim().to_lowercase();
    let mut hex = blake3::hash(normalised.as_bytes()).to_hex().to_string();
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Truncate `s` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
