//! Rendered-response cache with path invalidation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::metrics::{CacheMetrics, CacheStats};

/// Default expiry window (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Identity of one rendering of a profile
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Path of the profile file the rendering was derived from
    pub path: PathBuf,
    /// Normalized format name
    pub format: String,
    /// Raw `include` filter
    pub include: String,
    /// Raw `exclude` filter
    pub exclude: String,
}

impl CacheKey {
    pub fn new(
        path: impl Into<PathBuf>,
        format: impl Into<String>,
        include: impl Into<String>,
        exclude: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
            include: include.into(),
            exclude: exclude.into(),
        }
    }
}

/// Rendered bytes plus the wall-clock time they were produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub bytes: Arc<[u8]>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl CachedResponse {
    fn new(bytes: Vec<u8>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            bytes: bytes.into(),
            timestamp_ms,
        }
    }

    /// Quoted entity tag derived from the timestamp
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.timestamp_ms)
    }
}

#[derive(Debug)]
struct Entry {
    response: CachedResponse,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    generations: HashMap<PathBuf, u64>,
}

/// Cache of rendered responses
///
/// All operations take a short synchronous lock, so an `invalidate` has fully
/// taken effect by the time it returns.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    inner: Mutex<Inner>,
    metrics: CacheMetrics,
}

impl ResponseCache {
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(CacheError::ZeroTtl);
        }
        Ok(Self {
            ttl,
            inner: Mutex::new(Inner::default()),
            metrics: CacheMetrics::new(),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// Look up a rendering; an expired entry is evicted and reported as a miss
    pub fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                self.metrics.record_hit();
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(key);
            self.metrics.record_expirations(1);
            self.metrics.set_entry_count(inner.entries.len());
        }
        self.metrics.record_miss();
        None
    }

    /// Current generation of a profile path
    ///
    /// Read it before loading the profile and pass it to [`put_if_current`].
    ///
    /// [`put_if_current`]: ResponseCache::put_if_current
    pub fn generation(&self, path: &Path) -> u64 {
        self.inner.lock().generations.get(path).copied().unwrap_or(0)
    }

    /// Store a rendering unconditionally, replacing any previous one
    pub fn put(&self, key: CacheKey, bytes: Vec<u8>) -> CachedResponse {
        let response = CachedResponse::new(bytes);
        let mut inner = self.inner.lock();
        self.insert(&mut inner, key, response.clone());
        response
    }

    /// Store a rendering only if its path was not invalidated since `generation`
    ///
    /// The response is returned either way so the caller can serve it.
    pub fn put_if_current(&self, key: CacheKey, bytes: Vec<u8>, generation: u64) -> CachedResponse {
        let response = CachedResponse::new(bytes);
        let mut inner = self.inner.lock();
        let current = inner.generations.get(&key.path).copied().unwrap_or(0);
        if current == generation {
            self.insert(&mut inner, key, response.clone());
        } else {
            debug!(
                "Discarding rendering of {} (generation {} is now {})",
                key.path.display(),
                generation,
                current
            );
            self.metrics.record_discard();
        }
        response
    }

    /// Drop every rendering derived from `path`, whatever its format or filters
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, path: &Path) -> usize {
        let mut inner = self.inner.lock();
        *inner.generations.entry(path.to_path_buf()).or_insert(0) += 1;

        let before = inner.entries.len();
        inner.entries.retain(|key, _| key.path != path);
        let removed = before - inner.entries.len();

        self.metrics.record_invalidation();
        self.metrics.set_entry_count(inner.entries.len());
        debug!("Invalidated {} cached renderings of {}", removed, path.display());
        removed
    }

    /// Evict every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        let ttl = self.ttl;
        inner.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        let removed = before - inner.entries.len();

        if removed > 0 {
            self.metrics.record_expirations(removed);
            self.metrics.set_entry_count(inner.entries.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, inner: &mut Inner, key: CacheKey, response: CachedResponse) {
        inner.entries.insert(
            key,
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
        self.metrics.record_store();
        self.metrics.set_entry_count(inner.entries.len());
    }
}
