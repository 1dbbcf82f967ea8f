//! # Rate Limiting Module
//!
//! Per-identifier fixed-window request limiting, consulted before any cache
//! or backend work happens for an inbound query.
//!
//! ## Overview
//!
//! Each caller identifier (resolved client address, session id, ...) gets a
//! counter inside a fixed-duration window. The window resets wholesale when
//! its deadline passes; it does not slide. Exceeding the budget yields a
//! denial with a retry hint — informational for the caller, never an
//! enforced delay.
//!
//! Different endpoint classes (general chat vs. voice, say) construct
//! separate [`RateLimiter`] instances with their own budget and window.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RateLimiter`] | Per-identifier window table with check-and-increment |
//! | [`RateLimiterConfig`] | Budget, window, and sweep-interval configuration |
//! | [`RateDecision`] | Allow/deny outcome with retry hint and remaining budget |
//!
//! ## Example
//!
//! ```rust
//! use query_cache::ratelimit::{RateLimiter, RateLimiterConfig};
//! use std::time::Duration;
//!
//! # fn main() -> query_cache::Result<()> {
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::new()
//!         .with_max_requests(60)
//!         .with_window(Duration::from_secs(60)),
//! )?;
//!
//! let decision = limiter.check("203.0.113.7");
//! if !decision.allowed {
//!     // translate into a throttling response; decision.retry_after_secs
//!     // carries the hint
//! }
//! # Ok(())
//! # }
//! ```

mod fixed_window;

pub use fixed_window::{RateDecision, RateLimiter, RateLimiterConfig};
