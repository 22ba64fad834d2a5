use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Entry in the cache with expiration and usage bookkeeping.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// The cached value
    value: V,
    /// When this entry stops being valid
    expires_at: Instant,
    /// When this entry was last read or written
    last_accessed: Instant,
    /// How many times this entry has been read
    access_count: u64,
}

impl<V: Clone> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self { value, expires_at: now + ttl, last_accessed: now, access_count: 0 }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
        self.access_count += 1;
    }
}

/// Configuration for a cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default time-to-live for entries
    pub default_ttl: Duration,
    /// Maximum number of entries before LRU eviction kicks in
    pub max_size: usize,
    /// Interval between expired-entry sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300), // 5 minutes
            max_size: 1000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Point-in-time statistics for a cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Number of successful lookups
    pub hits: usize,
    /// Number of failed or expired lookups
    pub misses: usize,
    /// hits / (hits + misses), or 0 when no lookups happened
    pub hit_rate: f64,
    /// Current number of entries
    pub size: usize,
    /// Configured capacity
    pub max_size: usize,
}

/// A thread-safe, string-keyed cache with TTL expiry and LRU eviction.
///
/// Lookups update the entry's last-access time and access count. Expired
/// entries are dropped lazily on access and eagerly by [`Cache::sweep`].
/// Inserting a new key at capacity evicts the entry with the oldest
/// last-access time.
///
/// # Examples
///
/// ```
/// use shipit_standard_tools::cache::Cache;
///
/// let cache: Cache<String> = Cache::new();
/// cache.set("latest:@scope/pkg".to_string(), "1.2.3".to_string(), None);
/// assert_eq!(cache.get("latest:@scope/pkg"), Some("1.2.3".to_string()));
/// ```
#[derive(Debug)]
pub struct Cache<V>
where
    V: Clone,
{
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    config: CacheConfig,
    hits: Arc<Mutex<usize>>,
    misses: Arc<Mutex<usize>>,
}

impl<V> Cache<V>
where
    V: Clone,
{
    /// Creates a new cache with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a new cache with custom configuration.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            config,
            hits: Arc::new(Mutex::new(0)),
            misses: Arc::new(Mutex::new(0)),
        }
    }

    /// Gets a value from the cache, returning `None` if absent or expired.
    ///
    /// An expired entry is removed and counted as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().expect("Failed to get write lock on cache");

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired() {
                entries.remove(key);
                let mut misses = self.misses.lock().expect("Failed to lock misses counter");
                *misses += 1;
                None
            } else {
                entry.touch();
                let mut hits = self.hits.lock().expect("Failed to lock hits counter");
                *hits += 1;
                Some(entry.value.clone())
            }
        } else {
            let mut misses = self.misses.lock().expect("Failed to lock misses counter");
            *misses += 1;
            None
        }
    }

    /// Puts a value in the cache.
    ///
    /// Uses the configured default TTL when `ttl` is `None`. Updating an
    /// existing key keeps its access count. Inserting a new key at capacity
    /// evicts the least recently used entry first.
    pub fn set(&self, key: String, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let mut entries = self.entries.write().expect("Failed to get write lock on cache");

        if let Some(existing) = entries.get_mut(&key) {
            let preserved = existing.access_count;
            let mut entry = CacheEntry::new(value, ttl);
            entry.access_count = preserved;
            *existing = entry;
            return;
        }

        if entries.len() >= self.config.max_size {
            let oldest_key = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone());

            if let Some(oldest_key) = oldest_key {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(key, CacheEntry::new(value, ttl));
    }

    /// Removes a value from the cache, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write().expect("Failed to get write lock on cache");
        entries.remove(key).is_some()
    }

    /// Clears all entries from the cache.
    pub fn clear(&self) {
        let mut entries = self.entries.write().expect("Failed to get write lock on cache");
        entries.clear();
    }

    /// Gets the number of entries in the cache.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().expect("Failed to get read lock on cache");
        entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes expired entries from the cache.
    pub fn sweep(&self) {
        let mut entries = self.entries.write().expect("Failed to get write lock on cache");

        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired_keys {
            entries.remove(&key);
        }
    }

    /// Gets the configured sweep interval.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Gets current statistics.
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = *self.hits.lock().expect("Failed to lock hits counter");
        let misses = *self.misses.lock().expect("Failed to lock misses counter");
        let total = hits + misses;
        let hit_rate = if total == 0 { 0.0 } else { hits as f64 / total as f64 };

        CacheStats { hits, misses, hit_rate, size: self.len(), max_size: self.config.max_size }
    }
}

impl<V> Default for Cache<V>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Spawns a background task that sweeps expired entries on the configured
    /// interval. The task stops when the returned handle is aborted or the
    /// cache is dropped.
    pub fn start_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let interval = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => cache.sweep(),
                    None => break,
                }
            }
        })
    }
}
