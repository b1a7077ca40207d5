//! Keyed time-to-live cache
//!
//! Expired entries are kept until purged or overwritten so they can still
//! serve as a degraded-mode fallback.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::clock::Clock;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub(crate) fn to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52 * 100))
}

pub struct TtlCache<V> {
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    max_entries: Option<usize>,
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self { clock, default_ttl, max_entries: None, entries: HashMap::new() }
    }

    /// Bound the number of entries; the oldest entry is evicted on overflow
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Fresh value only
    pub fn get(&self, key: &str) -> Option<&V> {
        let now = self.clock.now();
        self.entries.get(key).filter(|e| !e.is_expired(now)).map(|e| &e.value)
    }

    /// Entry regardless of expiry
    pub fn get_entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    pub fn contains_fresh(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.default_ttl;
        self.insert_with_ttl(key, value, ttl);
    }

    pub fn insert_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = self.clock.now();

        if let Some(max) = self.max_entries {
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                self.purge_expired();
            }
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                if let Some(victim) = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| k.clone())
                {
                    self.entries.remove(&victim);
                }
            }
        }

        let expires_at = now.checked_add_signed(to_chrono(ttl)).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(key, CacheEntry { value, stored_at: now, expires_at });
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;

    fn cache(clock: Arc<ManualClock>) -> TtlCache<String> {
        TtlCache::new(clock, Duration::from_secs(300))
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let mut c = cache(clock.clone());
        c.insert("k", "v".to_string());
        assert_eq!(c.get("k").map(String::as_str), Some("v"));

        clock.advance(chrono::Duration::seconds(299));
        assert!(c.contains_fresh("k"));

        clock.advance(chrono::Duration::seconds(1));
        assert!(c.get("k").is_none());
        assert!(c.get_entry("k").is_some(), "stale entry stays available for fallback");
    }

    #[test]
    fn test_purge_and_invalidate() {
        let clock = Arc::new(ManualClock::default());
        let mut c = cache(clock.clone());
        c.insert_with_ttl("short", "a".to_string(), Duration::from_secs(1));
        c.insert("long", "b".to_string());
        clock.advance(chrono::Duration::seconds(5));

        assert_eq!(c.purge_expired(), 1);
        assert_eq!(c.len(), 1);
        assert!(c.invalidate("long"));
        assert!(c.is_empty());
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_overflowing() {
        let clock = Arc::new(ManualClock::default());
        let mut c = cache(clock.clone());
        c.insert_with_ttl("forever", "v".to_string(), Duration::from_secs(1_000_000_000_000_000));
        assert_eq!(c.get_entry("forever").unwrap().expires_at, DateTime::<Utc>::MAX_UTC);

        clock.advance(chrono::Duration::days(365 * 100));
        assert!(c.contains_fresh("forever"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let clock = Arc::new(ManualClock::default());
        let mut c = cache(clock.clone()).with_max_entries(2);
        c.insert("first", "1".to_string());
        clock.advance(chrono::Duration::seconds(1));
        c.insert("second", "2".to_string());
        clock.advance(chrono::Duration::seconds(1));
        c.insert("third", "3".to_string());

        assert_eq!(c.len(), 2);
        assert!(c.get_entry("first").is_none());
        assert!(c.contains_fresh("third"));
    }
}
