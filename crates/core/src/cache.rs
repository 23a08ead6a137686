//! Tag-invalidated response cache.
//!
//! Read endpoints are cached under a tag (`Products`, `Vouchers`, ...) plus a
//! string key built from the query. A mutation drops every entry of the tags
//! it affects, so the next read goes back to the backend.
//!
//! Concurrent reads of the same key share one backend call: moka's
//! `try_get_with` runs the loader once and hands its result to every waiter.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

/// Per-tag time-to-live.
struct TagExpiry<T> {
    default_ttl: Duration,
    overrides: HashMap<T, Duration>,
}

impl<T, V> Expiry<(T, String), V> for TagExpiry<T>
where
    T: Eq + Hash,
{
    fn expire_after_create(&self, key: &(T, String), _value: &V, _created_at: Instant) -> Option<Duration> {
        Some(self.overrides.get(&key.0).copied().unwrap_or(self.default_ttl))
    }
}

/// Builder for [`TaggedCache`].
pub struct TaggedCacheBuilder<T> {
    capacity: u64,
    default_ttl: Duration,
    overrides: HashMap<T, Duration>,
}

impl<T> TaggedCacheBuilder<T>
where
    T: Copy + Eq + Hash + Send + Sync + 'static,
{
    /// 1000 entries with a 5 minute TTL unless configured otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capacity: 1000,
            default_ttl: Duration::from_secs(300),
            overrides: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Use a different time-to-live for entries under `tag`.
    #[must_use]
    pub fn tag_ttl(mut self, tag: T, ttl: Duration) -> Self {
        self.overrides.insert(tag, ttl);
        self
    }

    #[must_use]
    pub fn build<V>(self) -> TaggedCache<T, V>
    where
        V: Clone + Send + Sync + 'static,
    {
        let inner = Cache::builder()
            .max_capacity(self.capacity)
            .expire_after(TagExpiry {
                default_ttl: self.default_ttl,
                overrides: self.overrides,
            })
            .support_invalidation_closures()
            .build();
        TaggedCache { inner }
    }
}

impl<T> Default for TaggedCacheBuilder<T>
where
    T: Copy + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A moka cache whose entries are grouped by tag.
///
/// Build one with [`TaggedCacheBuilder`].
#[derive(Clone)]
pub struct TaggedCache<T, V> {
    inner: Cache<(T, String), V>,
}

impl<T, V> TaggedCache<T, V>
where
    T: Copy + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Return the cached value or run `loader` to fetch it.
    ///
    /// Errors are not cached. When several callers ask for the same key at
    /// once, only one loader runs and every caller gets its result.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, shared between all waiting callers.
    pub async fn get_or_load<F, E>(&self, tag: T, key: impl Into<String>, loader: F) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        self.inner.try_get_with((tag, key.into()), loader).await
    }

    pub async fn get(&self, tag: T, key: &str) -> Option<V> {
        self.inner.get(&(tag, key.to_owned())).await
    }

    pub async fn insert(&self, tag: T, key: impl Into<String>, value: V) {
        self.inner.insert((tag, key.into()), value).await;
    }

    /// Drop every entry stored under `tag`.
    pub fn invalidate_tag(&self, tag: T) {
        if self
            .inner
            .invalidate_entries_if(move |key, _| key.0 == tag)
            .is_err()
        {
            // Only fails when invalidation closures are disabled.
            self.inner.invalidate_all();
        }
    }

    /// Drop the entries of several tags.
    pub fn invalidate_tags(&self, tags: &[T]) {
        for tag in tags {
            self.invalidate_tag(*tag);
        }
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Apply pending evictions and invalidations now.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
