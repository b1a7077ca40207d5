//! Cache Module
//!
//! TTL memory cache with an injectable clock, session-scoped persistence,
//! and the fetch-through `ResultCache` that combines them.

mod clock;
mod result_cache;
mod session;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use result_cache::{
    comparison_key, CacheNamespace, CacheTtls, Fetched, Freshness, ResultCache, DEFAULT_MAX_ENTRIES, MAX_TTL_SECS,
};
pub use session::{FileSessionStore, MemorySessionStore, SessionSnapshot, SessionStore};
pub use ttl::{CacheEntry, TtlCache};
