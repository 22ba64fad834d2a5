//! In-memory caching with TTL expiry and LRU eviction.
//!
//! The cache is scoped to a single pipeline run; entries never persist across
//! runs. A process-wide default instance is available through
//! [`global_cache`] and can be reset between tests with
//! [`reset_global_cache`].

mod store;

pub use store::{Cache, CacheConfig, CacheStats};

use std::sync::{Arc, Mutex, OnceLock};

static GLOBAL_CACHE: OnceLock<Mutex<Arc<Cache<serde_json::Value>>>> = OnceLock::new();

fn global_slot() -> &'static Mutex<Arc<Cache<serde_json::Value>>> {
    GLOBAL_CACHE.get_or_init(|| Mutex::new(Arc::new(Cache::new())))
}

/// Returns the process-wide shared cache.
///
/// Components that perform repeated registry or workspace lookups within one
/// run share this instance. Tests should prefer an explicit [`Cache`] or call
/// [`reset_global_cache`] between cases to avoid cross-test bleed.
pub fn global_cache() -> Arc<Cache<serde_json::Value>> {
    let slot = global_slot().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    Arc::clone(&slot)
}

/// Replaces the process-wide cache with a fresh empty instance.
pub fn reset_global_cache() {
    let mut slot = global_slot().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    *slot = Arc::new(Cache::new());
}
