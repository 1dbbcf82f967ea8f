//! # query-cache
//!
//! Bounded, in-process caching and rate limiting for a conversational
//! query-answering service.
//!
//! ## Overview
//!
//! Request handlers in a query-answering service spend almost all of their
//! time waiting on slow collaborators (AI completion, session storage,
//! data-source lookup). This crate provides the two memory-resident data
//! structures that sit in front of that slow path and must stay correct and
//! bounded under a continuous stream of lookups:
//!
//! - [`QueryCache`]: a capacity-bounded result cache keyed by normalized
//!   query shape, with LRU eviction, TTL expiry, and pattern invalidation.
//! - [`RateLimiter`]: a per-identifier fixed-window request limiter.
//!
//! Both are plain in-process tables. Every public read/write operation
//! completes without suspension or external I/O; background reclamation runs
//! as an owned, explicitly stoppable sweep task.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Query key normalization and the bounded result cache |
//! | [`ratelimit`] | Fixed-window per-identifier rate limiting |
//! | [`error`] | Crate error and context types |
//!
//! ## Quick Start
//!
//! ```rust
//! use query_cache::{CacheConfig, QueryCache, QueryShape, RateLimiter, RateLimiterConfig};
//! use std::time::Duration;
//!
//! # fn main() -> query_cache::Result<()> {
//! let cache: QueryCache<Vec<String>> = QueryCache::new(
//!     CacheConfig::new()
//!         .with_max_entries(1000)
//!         .with_ttl(Duration::from_secs(15 * 60)),
//! )?;
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::new()
//!         .with_max_requests(60)
//!         .with_window(Duration::from_secs(60)),
//! )?;
//!
//! let shape = QueryShape::new("weather in oslo").with_language("en");
//!
//! if limiter.check("203.0.113.7").allowed {
//!     if let Some(_hit) = cache.get(&shape) {
//!         // serve _hit.payload
//!     } else {
//!         let results = vec!["...".to_string()]; // slow backend work
//!         cache.set(&shape, results);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod ratelimit;

mod sweep;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheHit, CacheStats, QueryCache, QueryKey, QueryShape};
pub use error::{Error, ErrorContext};
pub use ratelimit::{RateDecision, RateLimiter, RateLimiterConfig};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
