use crate::config::DEFAULT_BLOCKED_STORES;

/// Case-insensitive substring denylist for storefront names.
#[derive(Debug, Clone)]
pub struct StoreFilter {
    blocked: Vec<String>,
}

impl Default for StoreFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_STORES.iter().copied())
    }
}

impl StoreFilter {
    pub fn new<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked = blocked
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { blocked }
    }

    pub fn is_blacklisted(&self, store: &str) -> bool {
        if store.is_empty() {
            return false;
        }
        let lower = store.to_lowercase();
        self.blocked.iter().any(|b| lower.contains(b.as_str()))
    }
}
