//! # vmixlink cache
//!
//! In-memory cache of rendered profile responses, keyed by profile path,
//! format and key filters.
//!
//! ## Features
//!
//! - **Bounded staleness**: entries older than the TTL are never served
//! - **Path invalidation**: one call drops every rendering of a profile
//! - **Generation guard**: renderings started before an invalidation are not cached
//! - **Metrics**: hit, miss, store and invalidation counters

pub mod cache;
pub mod error;
pub mod metrics;

pub use cache::{CacheKey, CachedResponse, ResponseCache, DEFAULT_TTL};
pub use error::{CacheError, Result};
pub use metrics::{CacheMetrics, CacheStats};
