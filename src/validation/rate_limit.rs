// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sliding-window rate limiting keyed by caller identifier.
//!
//! Used in front of the credential endpoints so a single client cannot
//! hammer the provider with sign-in or reset attempts.

use crate::error::{AppError, Result};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Tracked identifiers before `check` sweeps out idle ones inline.
const PRUNE_THRESHOLD: usize = 4096;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }

    /// User-facing message for a limited request.
    pub fn message(&self) -> Option<String> {
        self.clone().into_result().err().map(|e| e.to_string())
    }

    pub fn into_result(self) -> Result<u32> {
        match self {
            RateDecision::Allowed { remaining } => Ok(remaining),
            RateDecision::Limited { retry_after } => Err(AppError::RateLimited {
                retry_after_secs: retry_after.as_secs_f64().ceil() as u64,
            }),
        }
    }
}

/// Allows `max_requests` per identifier within any `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: DashMap<String, Vec<Instant>>,
    prune_threshold: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: DashMap::new(),
            prune_threshold: PRUNE_THRESHOLD,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of identifiers currently tracked.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Record a request from `identifier` and decide whether it may proceed.
    pub fn check(&self, identifier: &str) -> RateDecision {
        self.check_at(identifier, Instant::now())
    }

    fn check_at(&self, identifier: &str, now: Instant) -> RateDecision {
        // Identifiers are caller-chosen; keep the map bounded between the
        // periodic sweeps.
        if self.hits.len() >= self.prune_threshold {
            self.prune_at(now);
        }

        let mut entry = self.hits.entry(identifier.to_string()).or_default();
        entry.retain(|t| now.saturating_duration_since(*t) < self.window);

        if entry.len() as u32 >= self.max_requests {
            let oldest = entry.first().copied().unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            tracing::debug!(identifier, ?retry_after, "Rate limit hit");
            return RateDecision::Limited { retry_after };
        }

        entry.push(now);
        RateDecision::Allowed {
            remaining: self.max_requests - entry.len() as u32,
        }
    }

    /// Forget all recorded requests for `identifier`.
    pub fn reset(&self, identifier: &str) {
        self.hits.remove(identifier);
    }

    /// Drop identifiers whose requests have all aged out of the window.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        let before = self.hits.len();
        self.hits.retain(|_, times| {
            times.retain(|t| now.saturating_duration_since(*t) < self.window);
            !times.is_empty()
        });
        tracing::debug!(before, after = self.hits.len(), "Pruned rate limiter");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_after_max_requests() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for remaining in [2, 1, 0] {
            assert_eq!(
                limiter.check_at("client", now),
                RateDecision::Allowed { remaining }
            );
        }

        let decision = limiter.check_at("client", now + Duration::from_secs(10));
        assert_eq!(
            decision,
            RateDecision::Limited {
                retry_after: Duration::from_secs(50)
            }
        );
        assert_eq!(
            decision.message().as_deref(),
            Some("Rate limit exceeded. Try again in 50 seconds.")
        );
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let now = Instant::now();

        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("a", now + Duration::from_secs(2)).is_allowed());
    }

    #[test]
    fn test_prune_drops_idle_identifiers() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();

        limiter.check_at("old@example.com", now);
        limiter.check_at("new@example.com", now + Duration::from_secs(50));
        assert_eq!(limiter.len(), 2);

        limiter.prune_at(now + Duration::from_secs(61));
        assert_eq!(limiter.len(), 1);

        limiter.prune_at(now + Duration::from_secs(200));
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_check_sweeps_when_map_is_large() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(60));
        limiter.prune_threshold = 10;
        let now = Instant::now();

        for i in 0..10 {
            limiter.check_at(&format!("user{i}@example.com"), now);
        }
        assert_eq!(limiter.len(), 10);

        // Every earlier identifier has aged out by now.
        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("fresh@example.com", later).is_allowed());
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check("a").is_allowed());
        assert!(limiter.check("b").is_allowed());
        assert!(!limiter.check("a").is_allowed());

        limiter.reset("a");
        assert!(limiter.check("a").is_allowed());
    }
}
