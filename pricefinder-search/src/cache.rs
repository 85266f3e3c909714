//! In-memory TTL cache for ranked listings.
//!
//! Keyed by the trimmed, lower-cased resolved query. Capacity is small, so
//! eviction is a linear scan for the oldest insertion. The lock is a plain
//! `std::sync::Mutex`; no caller holds it across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::types::Listing;

#[derive(Debug, Clone)]
struct CacheEntry {
    listings: Vec<Listing>,
    inserted_at: Instant,
    sequence: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_sequence: u64,
}

/// Normalise a resolved query into its cache key.
pub fn cache_key(query: &str) -> String {
    query.trim().to_lowercase()
}

#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            state: Mutex::new(CacheState::default()),
        }
    }

    // A poisoned lock only means another search panicked mid-update; the map
    // itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, query: &str) -> Option<Vec<Listing>> {
        self.get_at(query, Instant::now())
    }

    /// Look up as of `now`. Expired entries are dropped on the way.
    pub fn get_at(&self, query: &str, now: Instant) -> Option<Vec<Listing>> {
        let key = cache_key(query);
        let mut state = self.lock();
        let fresh = state
            .entries
            .get(&key)
            .map(|e| now.saturating_duration_since(e.inserted_at) < self.ttl)?;
        if fresh {
            state.entries.get(&key).map(|e| e.listings.clone())
        } else {
            state.entries.remove(&key);
            None
        }
    }

    pub fn insert(&self, query: &str, listings: Vec<Listing>) {
        self.insert_at(query, listings, Instant::now());
    }

    /// Insert as of `now`, evicting the oldest insertions beyond capacity.
    pub fn insert_at(&self, query: &str, listings: Vec<Listing>, now: Instant) {
        let key = cache_key(query);
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            key,
            CacheEntry {
                listings,
                inserted_at: now,
                sequence,
            },
        );

        while state.entries.len() > self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, e)| (e.inserted_at, e.sequence))
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    state.entries.remove(&k);
                    tracing::debug!(evicted = %pricefinder_common::query_fingerprint(&k), "cache.evict");
                }
                None => break,
            }
        }
    }

    pub fn contains(&self, query: &str) -> bool {
        self.lock().entries.contains_key(&cache_key(query))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
