//! # Query Result Caching Module
//!
//! This module provides the bounded in-memory cache that sits between request
//! handlers and the slow query backends, avoiding repeated backend work for
//! semantically identical queries.
//!
//! ## Overview
//!
//! Caching is valuable for:
//! - Reducing backend costs by avoiding duplicate lookups
//! - Improving response latency for repeated queries
//! - Smoothing bursts of popular queries past one-off traffic
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`QueryCache`] | Capacity-bounded table with LRU eviction and TTL expiry |
//! | [`CacheConfig`] | Capacity, TTL, and sweep-interval configuration |
//! | [`CacheHit`] | Payload tagged with cache-served bookkeeping |
//! | [`CacheStats`] | Read-only snapshot of size and counters |
//! | [`QueryShape`] | Structured query request (term, language, filters, ...) |
//! | [`QueryKey`] | Canonical string key derived from a shape |
//!
//! ## Cache Key Generation
//!
//! Keys are derived from the normalized query shape: free text lower-cased
//! and trimmed, missing optional fields defaulted, filters sorted before
//! serialization. Hits are therefore a function of query *meaning*, not of
//! incidental formatting (whitespace, case, field ordering).
//!
//! ## Example
//!
//! ```rust
//! use query_cache::cache::{CacheConfig, QueryCache, QueryShape};
//! use std::time::Duration;
//!
//! # fn main() -> query_cache::Result<()> {
//! let cache: QueryCache<Vec<String>> = QueryCache::new(
//!     CacheConfig::new()
//!         .with_max_entries(1000)
//!         .with_ttl(Duration::from_secs(15 * 60)),
//! )?;
//!
//! let shape = QueryShape::new("Rust ownership").with_category("docs");
//! assert!(cache.get(&shape).is_none());
//! cache.set(&shape, vec!["The Book, ch. 4".to_string()]);
//! assert!(cache.get(&shape).is_some());
//! # Ok(())
//! # }
//! ```

mod key;
mod store;

pub use key::{QueryKey, QueryShape, DEFAULT_LANGUAGE, DEFAULT_LIMIT};
pub use store::{CacheConfig, CacheHit, CacheStats, QueryCache};
