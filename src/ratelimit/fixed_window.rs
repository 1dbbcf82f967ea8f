//! Fixed-window counter rate limiter.

use crate::sweep::Sweeper;
use crate::{Error, ErrorContext, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Limiter construction parameters. Fixed for the lifetime of the limiter.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Requests accepted per identifier per window.
    pub max_requests: u32,
    /// Length of each window.
    pub window: Duration,
    /// Period of the background idle-window sweep.
    pub sweep_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimiterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(Error::configuration_with_context(
                "request budget must be at least one",
                ErrorContext::new()
                    .with_field_path("max_requests")
                    .with_source("rate_limiter_config"),
            ));
        }
        if self.window.is_zero() {
            return Err(Error::configuration_with_context(
                "window duration must be non-zero",
                ErrorContext::new()
                    .with_field_path("window")
                    .with_source("rate_limiter_config"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Window {
    /// Accepted requests in this window. Counting stops at the budget:
    /// rejected checks leave the window untouched.
    count: u32,
    reset_at: Instant,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Whole seconds until the window resets, rounded up. Present only on
    /// denial; a hint for the caller, not an enforced delay.
    pub retry_after_secs: Option<u64>,
    /// Requests left in the current window after this check.
    pub remaining: u32,
}

/// Per-identifier fixed-window request limiter.
///
/// Identifiers are opaque strings; empty or odd-looking ones are accepted
/// as-is. An expired window is logically dead: the next check replaces it
/// with a fresh one, so correctness never depends on the background sweep.
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
            sweeper: Mutex::new(None),
        })
    }

    /// Check-and-increment for one request from `identifier`.
    pub fn check(&self, identifier: &str) -> RateDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        if let Some(window) = windows.get_mut(identifier) {
            if now < window.reset_at {
                if window.count < self.config.max_requests {
                    window.count += 1;
                    let remaining = self.config.max_requests - window.count;
                    trace!(identifier, count = window.count, "request allowed");
                    return RateDecision {
                        allowed: true,
                        retry_after_secs: None,
                        remaining,
                    };
                }
                let retry_after_secs = window
                    .reset_at
                    .duration_since(now)
                    .as_secs_f64()
                    .ceil() as u64;
                debug!(identifier, retry_after_secs, "rate limit exceeded");
                return RateDecision {
                    allowed: false,
                    retry_after_secs: Some(retry_after_secs),
                    remaining: 0,
                };
            }
        }

        // first request, or previous window expired
        windows.insert(
            identifier.to_owned(),
            Window {
                count: 1,
                reset_at: now + self.config.window,
            },
        );
        trace!(identifier, "opened fresh rate window");
        RateDecision {
            allowed: true,
            retry_after_secs: None,
            remaining: self.config.max_requests - 1,
        }
    }

    /// Windows whose deadline has not yet passed.
    pub fn active_windows(&self) -> usize {
        let now = Instant::now();
        self.windows
            .lock()
            .unwrap()
            .values()
            .filter(|w| now < w.reset_at)
            .count()
    }

    /// Drop windows whose deadline has passed. Memory hygiene for
    /// identifiers that stopped sending; `check` re-validates regardless.
    pub fn purge_expired(&self) -> usize {
        sweep_windows(&self.windows)
    }

    /// Start the periodic idle-window sweep. No-op if one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) {
        let mut slot = self.sweeper.lock().unwrap();
        if slot.is_some() {
            return;
        }
        let windows = Arc::clone(&self.windows);
        *slot = Some(Sweeper::spawn(self.config.sweep_interval, move || {
            sweep_windows(&windows);
        }));
    }

    /// Stop the background sweep, if running, and wait for it to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let sweeper = self.sweeper.lock().unwrap().take();
        match sweeper {
            Some(sweeper) => sweeper.shutdown().await,
            None => Ok(()),
        }
    }
}

fn sweep_windows(windows: &Mutex<HashMap<String, Window>>) -> usize {
    let now = Instant::now();
    let mut windows = windows.lock().unwrap();
    let before = windows.len();
    windows.retain(|_, w| now < w.reset_at);
    let removed = before - windows.len();
    if removed > 0 {
        debug!(removed, "swept expired rate windows");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn limiter(max_requests: u32, window: Duration) -> RateLimiter {
        RateLimiter::new(
            RateLimiterConfig::new()
                .with_max_requests(max_requests)
                .with_window(window),
        )
        .unwrap()
    }

    #[test]
    fn budget_boundary_is_exact() {
        let limiter = limiter(3, Duration::from_secs(60));

        assert_eq!(limiter.check("ip").remaining, 2);
        assert_eq!(limiter.check("ip").remaining, 1);
        let third = limiter.check("ip");
        assert!(third.allowed);
        assert_eq!(third.remaining, 0);

        let fourth = limiter.check("ip");
        assert!(!fourth.allowed);
        assert_eq!(fourth.retry_after_secs, Some(60));
        assert_eq!(fourth.remaining, 0);
    }

    #[test]
    fn window_resets_after_duration() {
        let limiter = limiter(1, Duration::from_millis(50));

        assert!(limiter.check("ip").allowed);
        assert!(!limiter.check("ip").allowed);

        sleep(Duration::from_millis(60));

        let decision = limiter.check("ip");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = limiter(1, Duration::from_secs(60));

        assert!(limiter.check("x").allowed);
        assert!(!limiter.check("x").allowed);
        assert!(limiter.check("y").allowed);
    }

    #[test]
    fn rejected_checks_do_not_consume_future_budget() {
        let limiter = limiter(2, Duration::from_millis(50));

        assert!(limiter.check("ip").allowed);
        assert!(limiter.check("ip").allowed);
        for _ in 0..5 {
            assert!(!limiter.check("ip").allowed);
        }

        sleep(Duration::from_millis(60));
        assert!(limiter.check("ip").allowed);
    }

    #[test]
    fn expired_window_is_replaced_without_a_sweep() {
        let limiter = limiter(1, Duration::from_millis(30));

        assert!(limiter.check("ip").allowed);
        sleep(Duration::from_millis(40));

        // no purge ran; check itself replaces the dead window
        assert!(limiter.check("ip").allowed);
        assert_eq!(limiter.active_windows(), 1);
    }

    #[test]
    fn purge_drops_only_dead_windows() {
        let limiter = limiter(5, Duration::from_millis(30));

        limiter.check("idle");
        sleep(Duration::from_millis(40));
        limiter.check("busy");

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.active_windows(), 1);
        assert_eq!(limiter.purge_expired(), 0);
    }

    #[test]
    fn empty_identifier_is_accepted() {
        let limiter = limiter(2, Duration::from_secs(60));
        assert!(limiter.check("").allowed);
        assert!(limiter.check("").allowed);
        assert!(!limiter.check("").allowed);
    }

    #[test]
    fn zero_budget_is_a_configuration_error() {
        assert!(RateLimiter::new(RateLimiterConfig::new().with_max_requests(0)).is_err());
        assert!(
            RateLimiter::new(RateLimiterConfig::new().with_window(Duration::ZERO)).is_err()
        );
    }
}
