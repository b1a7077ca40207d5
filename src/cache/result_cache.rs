//! Fetch-through result cache
//!
//! Memory TTL cache in front of any network-sourced value, mirrored into a
//! session store. A failed fetch falls back to the newest value either layer
//! still holds, however old, and reports it as `Freshness::StaleFallback`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::session::{MemorySessionStore, SessionSnapshot, SessionStore};
use super::ttl::TtlCache;
use crate::error::{EngineResult, FetchError};

/// Logical cache partitions, one per data kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheNamespace {
    Comparisons,
    Evaluations,
    DimensionCatalog,
    PerspectiveCatalog,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 4] = [
        CacheNamespace::Comparisons,
        CacheNamespace::Evaluations,
        CacheNamespace::DimensionCatalog,
        CacheNamespace::PerspectiveCatalog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Comparisons => "comparisons",
            CacheNamespace::Evaluations => "evaluations",
            CacheNamespace::DimensionCatalog => "dimension_catalog",
            CacheNamespace::PerspectiveCatalog => "perspective_catalog",
        }
    }
}

/// Longest accepted time-to-live: one year
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;
pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// Time-to-live per namespace, in seconds, and the entry bound each
/// namespace is held to in memory and in the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub comparisons_secs: u64,
    pub evaluations_secs: u64,
    pub dimension_catalog_secs: u64,
    pub perspective_catalog_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            comparisons_secs: 5 * 60,
            evaluations_secs: 5 * 60,
            dimension_catalog_secs: 30 * 60,
            perspective_catalog_secs: 10 * 60,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheTtls {
    pub fn for_namespace(&self, namespace: CacheNamespace) -> Duration {
        let secs = match namespace {
            CacheNamespace::Comparisons => self.comparisons_secs,
            CacheNamespace::Evaluations => self.evaluations_secs,
            CacheNamespace::DimensionCatalog => self.dimension_catalog_secs,
            CacheNamespace::PerspectiveCatalog => self.perspective_catalog_secs,
        };
        Duration::from_secs(secs)
    }

    /// Problems with these settings. Empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for ns in CacheNamespace::ALL {
            let secs = self.for_namespace(ns).as_secs();
            if secs > MAX_TTL_SECS {
                problems.push(format!("{} ttl {}s exceeds {}s", ns.as_str(), secs, MAX_TTL_SECS));
            }
        }
        if self.max_entries == 0 {
            problems.push("max_entries must be positive".to_string());
        }
        problems
    }
}

/// How current a served value is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Freshness {
    /// Just fetched
    Live,
    /// Served from memory within its TTL
    Cached,
    /// Fetch failed; this is the last value we had. A warning, not an error.
    StaleFallback { stored_at: DateTime<Utc>, cause: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fetched<T> {
    pub value: T,
    pub freshness: Freshness,
}

impl<T> Fetched<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self.freshness, Freshness::StaleFallback { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched { value: f(self.value), freshness: self.freshness }
    }
}

/// Stable digest of a comparison's inputs
pub fn comparison_key<S: AsRef<str>>(parts: &[S], scope: &str) -> String {
    let mut sorted: Vec<&str> = parts.iter().map(|p| p.as_ref()).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(scope.as_bytes());
    for part in sorted {
        hasher.update([0u8]);
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub struct ResultCache {
    clock: Arc<dyn Clock>,
    ttls: CacheTtls,
    memory: RwLock<HashMap<CacheNamespace, TtlCache<serde_json::Value>>>,
    session: Arc<dyn SessionStore>,
}

impl ResultCache {
    pub fn new(clock: Arc<dyn Clock>, ttls: CacheTtls, session: Arc<dyn SessionStore>) -> Self {
        let memory = CacheNamespace::ALL
            .iter()
            .map(|ns| {
                let cache = TtlCache::new(clock.clone(), ttls.for_namespace(*ns)).with_max_entries(ttls.max_entries);
                (*ns, cache)
            })
            .collect();
        Self { clock, ttls, memory: RwLock::new(memory), session }
    }

    /// Wall clock, default TTLs, process-lifetime session store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(SystemClock), CacheTtls::default(), Arc::new(MemorySessionStore::new()))
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    fn session_prefix(namespace: CacheNamespace) -> String {
        format!("{}:", namespace.as_str())
    }

    fn session_key(namespace: CacheNamespace, key: &str) -> String {
        format!("{}{}", Self::session_prefix(namespace), key)
    }

    /// Fresh cached value, if any
    pub async fn peek<T: DeserializeOwned>(&self, namespace: CacheNamespace, key: &str) -> Option<T> {
        let memory = self.memory.read().await;
        let raw = memory.get(&namespace)?.get(key)?.clone();
        serde_json::from_value(raw).ok()
    }

    /// Store a value in memory and in the session store
    pub async fn put<T: Serialize>(&self, namespace: CacheNamespace, key: &str, value: &T) -> EngineResult<()> {
        let raw = serde_json::to_value(value)?;
        if let Some(cache) = self.memory.write().await.get_mut(&namespace) {
            cache.insert(key, raw.clone());
        }
        let snapshot = SessionSnapshot { value: raw, saved_at: self.clock.now() };
        self.session.save(&Self::session_key(namespace, key), snapshot).await?;

        let dropped = self.session.prune(&Self::session_prefix(namespace), self.ttls.max_entries).await?;
        if dropped > 0 {
            debug!(namespace = namespace.as_str(), dropped, "pruned oldest session snapshots");
        }
        Ok(())
    }

    pub async fn invalidate(&self, namespace: CacheNamespace, key: &str) -> EngineResult<()> {
        if let Some(cache) = self.memory.write().await.get_mut(&namespace) {
            cache.invalidate(key);
        }
        self.session.remove(&Self::session_key(namespace, key)).await
    }

    /// Memory entries held for a namespace, fresh or not
    pub async fn resident(&self, namespace: CacheNamespace) -> usize {
        self.memory.read().await.get(&namespace).map_or(0, |c| c.len())
    }

    /// Drop expired memory entries across namespaces. Session snapshots stay.
    pub async fn purge_expired(&self) -> usize {
        let mut memory = self.memory.write().await;
        memory.values_mut().map(|c| c.purge_expired()).sum()
    }

    /// Serve from memory when fresh, otherwise run `fetch`. On fetch failure
    /// fall back to the newest stale memory entry or session snapshot.
    pub async fn get_or_fetch<T, F, Fut>(&self, namespace: CacheNamespace, key: &str, fetch: F) -> EngineResult<Fetched<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if let Some(value) = self.peek::<T>(namespace, key).await {
            debug!(namespace = namespace.as_str(), key, "cache hit");
            return Ok(Fetched { value, freshness: Freshness::Cached });
        }
        debug!(namespace = namespace.as_str(), key, "cache miss");

        match fetch().await {
            Ok(value) => {
                if let Err(e) = self.put(namespace, key, &value).await {
                    // Session persistence is best effort; the value is still good.
                    warn!(namespace = namespace.as_str(), key, error = %e, "failed to persist session snapshot");
                }
                info!(namespace = namespace.as_str(), key, "fetched fresh value");
                Ok(Fetched { value, freshness: Freshness::Live })
            }
            Err(err) => match self.fallback::<T>(namespace, key).await {
                Some((value, stored_at)) => {
                    warn!(
                        namespace = namespace.as_str(),
                        key,
                        %stored_at,
                        error = %err,
                        "fetch failed, serving stale value"
                    );
                    Ok(Fetched { value, freshness: Freshness::StaleFallback { stored_at, cause: err.to_string() } })
                }
                None => Err(err.into()),
            },
        }
    }

    async fn fallback<T: DeserializeOwned>(&self, namespace: CacheNamespace, key: &str) -> Option<(T, DateTime<Utc>)> {
        let from_memory = {
            let memory = self.memory.read().await;
            memory
                .get(&namespace)
                .and_then(|c| c.get_entry(key))
                .map(|e| (e.value.clone(), e.stored_at))
        };
        let from_session = match self.session.load(&Self::session_key(namespace, key)).await {
            Ok(snapshot) => snapshot.map(|s| (s.value, s.saved_at)),
            Err(e) => {
                warn!(namespace = namespace.as_str(), key, error = %e, "session store unreadable");
                None
            }
        };

        let newest = match (from_memory, from_session) {
            (Some(m), Some(s)) => Some(if s.1 > m.1 { s } else { m }),
            (m, s) => m.or(s),
        }?;

        match serde_json::from_value(newest.0) {
            Ok(value) => Some((value, newest.1)),
            Err(e) => {
                warn!(namespace = namespace.as_str(), key, error = %e, "stale value has an incompatible shape");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::session::FileSessionStore;
    use crate::error::{EngineError, FetchErrorKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn offline() -> FetchError {
        FetchError::new(FetchErrorKind::Offline, "/models", "network unreachable")
    }

    fn cache_with(clock: Arc<ManualClock>, session: Arc<dyn SessionStore>) -> ResultCache {
        ResultCache::new(clock, CacheTtls::default(), session)
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_memory() {
        let cache = ResultCache::in_memory();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let fetched: Fetched<u32> = cache
                .get_or_fetch(CacheNamespace::Evaluations, "m1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(fetched.value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_value_refetches() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(clock.clone(), Arc::new(MemorySessionStore::new()));
        cache.put(CacheNamespace::Comparisons, "k", &1u32).await.unwrap();

        clock.advance(chrono::Duration::minutes(6));
        let fetched: Fetched<u32> = cache.get_or_fetch(CacheNamespace::Comparisons, "k", || async { Ok(2) }).await.unwrap();
        assert_eq!(fetched.value, 2);
        assert_eq!(fetched.freshness, Freshness::Live);
    }

    #[tokio::test]
    async fn test_offline_serves_expired_value_as_stale() {
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(clock.clone(), Arc::new(MemorySessionStore::new()));
        cache.put(CacheNamespace::Evaluations, "m1", &"old".to_string()).await.unwrap();
        clock.advance(chrono::Duration::hours(3));

        let fetched: Fetched<String> =
            cache.get_or_fetch(CacheNamespace::Evaluations, "m1", || async { Err(offline()) }).await.unwrap();
        assert_eq!(fetched.value, "old");
        assert!(fetched.is_degraded());
    }

    #[tokio::test]
    async fn test_session_snapshot_outlives_memory() {
        let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::default());
        cache_with(clock.clone(), session.clone())
            .put(CacheNamespace::DimensionCatalog, "all", &vec![1, 2, 3])
            .await
            .unwrap();

        // a fresh cache (e.g. after reload) only has the session layer
        let reloaded = cache_with(clock, session);
        let fetched: Fetched<Vec<i32>> =
            reloaded.get_or_fetch(CacheNamespace::DimensionCatalog, "all", || async { Err(offline()) }).await.unwrap();
        assert_eq!(fetched.value, vec![1, 2, 3]);
        assert!(matches!(fetched.freshness, Freshness::StaleFallback { .. }));
    }

    #[tokio::test]
    async fn test_failure_without_fallback_propagates_fetch_error() {
        let cache = ResultCache::in_memory();
        let result: EngineResult<Fetched<u32>> =
            cache.get_or_fetch(CacheNamespace::Evaluations, "nope", || async { Err(offline()) }).await;
        match result {
            Err(EngineError::Fetch(e)) => assert!(e.is_offline()),
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_namespaces_stay_within_capacity() {
        let clock = Arc::new(ManualClock::default());
        let session = Arc::new(MemorySessionStore::new());
        let ttls = CacheTtls { max_entries: 64, ..CacheTtls::default() };
        let cache = ResultCache::new(clock.clone(), ttls, session.clone());

        for i in 0..1000 {
            cache.put(CacheNamespace::Evaluations, &format!("m{}", i), &i).await.unwrap();
            clock.advance(chrono::Duration::seconds(1));
        }
        cache.put(CacheNamespace::Comparisons, "pair", &1u32).await.unwrap();

        assert_eq!(cache.resident(CacheNamespace::Evaluations).await, 64);
        assert_eq!(session.len().await, 65);

        // the newest snapshot survives pruning and still backs a fallback
        let fetched: Fetched<u32> =
            cache.get_or_fetch(CacheNamespace::Evaluations, "m999", || async { Err(offline()) }).await.unwrap();
        assert_eq!(fetched.value, 999);
        let gone: EngineResult<Fetched<u32>> =
            cache.get_or_fetch(CacheNamespace::Evaluations, "m0", || async { Err(offline()) }).await;
        assert!(gone.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_session_file_recovers_on_next_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ truncated").unwrap();
        let clock = Arc::new(ManualClock::default());

        let live = cache_with(clock.clone(), Arc::new(FileSessionStore::new(&path)));
        let fetched: Fetched<String> =
            live.get_or_fetch(CacheNamespace::Evaluations, "m1", || async { Ok("fresh".to_string()) }).await.unwrap();
        assert_eq!(fetched.freshness, Freshness::Live);

        let restarted = cache_with(clock, Arc::new(FileSessionStore::new(&path)));
        let fetched: Fetched<String> =
            restarted.get_or_fetch(CacheNamespace::Evaluations, "m1", || async { Err(offline()) }).await.unwrap();
        assert_eq!(fetched.value, "fresh");
        assert!(matches!(fetched.freshness, Freshness::StaleFallback { .. }));
    }

    #[test]
    fn test_ttl_settings_are_bounded() {
        assert!(CacheTtls::default().validate().is_empty());
        let huge = CacheTtls { comparisons_secs: MAX_TTL_SECS + 1, max_entries: 0, ..CacheTtls::default() };
        assert_eq!(huge.validate().len(), 2);
    }

    #[test]
    fn test_comparison_key_ignores_order() {
        let a = comparison_key(&["gpt-4", "claude"], "47d");
        let b = comparison_key(&["claude", "gpt-4"], "47d");
        let c = comparison_key(&["claude", "gpt-4"], "6d");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
