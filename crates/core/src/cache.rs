//! Rendered-page cache for the global feed.
//!
//! Entries expire after a fixed TTL and every post write drops the whole
//! cache. A generation counter keeps a render that started before an
//! invalidation from being stored after it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Cache key: the route plus the raw `page` query value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    route: &'static str,
    page: Option<String>,
}

impl CacheKey {
    /// Key for `route` at the requested page.
    #[must_use]
    pub fn new(route: &'static str, page: Option<&str>) -> Self {
        Self {
            route,
            page: page.map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Arc<str>,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<CacheKey, CacheEntry>,
}

/// Shared, in-process feed cache.
#[derive(Debug, Clone)]
pub struct FeedCache {
    state: Arc<RwLock<CacheState>>,
    ttl: Duration,
}

impl FeedCache {
    /// Create an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            ttl,
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached body for `key`, if any.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<str>> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.body))
    }

    /// Current generation. Read it before rendering and hand it to [`put`].
    ///
    /// [`put`]: Self::put
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Store a body rendered during `generation`.
    ///
    /// Returns `false` (and stores nothing) when the cache was invalidated
    /// after the render started.
    pub async fn put(&self, key: CacheKey, body: Arc<str>, generation: u64) -> bool {
        if self.ttl.is_zero() {
            return false;
        }

        let mut state = self.state.write().await;
        if state.generation != generation {
            return false;
        }

        let ttl = self.ttl;
        state
            .entries
            .retain(|_, entry| entry.stored_at.elapsed() < ttl);
        state.entries.insert(
            key,
            CacheEntry {
                body,
                stored_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every entry.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.generation = state.generation.wrapping_add(1);
        let dropped = state.entries.len();
        state.entries.clear();
        tracing::debug!(dropped, generation = state.generation, "Feed cache invalidated");
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
