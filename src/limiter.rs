// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for the contact endpoints.
//!
//! Each identifier owns one window: the first request opens it with
//! `count = 1` and `reset_time = now + window_ms`, later requests increment
//! the count until `max_requests` is reached. A window is only replaced once
//! `reset_time < now`, so a request landing exactly on `reset_time` is still
//! charged to the expiring window.
//!
//! State lives in process memory. A restart or a second replica starts every
//! client from zero; nothing here is durable or shared between processes.

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Window expiry, milliseconds since the Unix epoch
        reset_time: u64,
    },
    /// Request is rate limited
    Limited {
        /// Earliest time a retry can succeed, milliseconds since the Unix epoch
        reset_time: u64,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    pub fn reset_time(&self) -> u64 {
        match self {
            RateLimitResult::Allowed { reset_time, .. } | RateLimitResult::Limited { reset_time } => {
                *reset_time
            }
        }
    }
}

/// Wall-clock source in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// System time via chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Backing store for rate limit windows.
///
/// The pipeline only sees this trait, so a networked key-value store can
/// replace [`InMemoryRateLimiter`] without touching request handling.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult;
}

/// Window state for a single identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: u64,
}

/// Process-local fixed-window rate limiter.
pub struct InMemoryRateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRateLimiter {
    /// Create a limiter driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Check and charge one request for `identifier` at the clock's current time.
    pub fn check_now(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        self.check_at(identifier, config, self.clock.now_ms())
    }

    /// Check and charge one request for `identifier` at `now` (ms since epoch).
    ///
    /// Sweep, lookup and increment happen under a single lock so concurrent
    /// callers for one identifier can never admit more than `max_requests`.
    pub fn check_at(&self, identifier: &str, config: &RateLimitConfig, now: u64) -> RateLimitResult {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());

        if entries.len() > config.sweep_threshold {
            let before = entries.len();
            entries.retain(|_, entry| entry.reset_time >= now);
            debug!(
                swept = before - entries.len(),
                retained = entries.len(),
                "Swept expired rate limit entries"
            );
        }

        if let Some(entry) = entries
            .get_mut(identifier)
            .filter(|entry| entry.reset_time >= now)
        {
            if entry.count >= config.max_requests {
                debug!(identifier, reset_time = entry.reset_time, "Rate limit exceeded");
                return RateLimitResult::Limited {
                    reset_time: entry.reset_time,
                };
            }
            entry.count += 1;
            return RateLimitResult::Allowed {
                remaining: config.max_requests.saturating_sub(entry.count),
                reset_time: entry.reset_time,
            };
        }

        // No window yet, or the previous one has expired.
        let reset_time = now.saturating_add(config.window_ms);
        entries.insert(
            identifier.to_string(),
            RateLimitEntry {
                count: 1,
                reset_time,
            },
        );
        RateLimitResult::Allowed {
            remaining: config.max_requests.saturating_sub(1),
            reset_time,
        }
    }

    #[cfg(test)]
    fn entry(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(identifier)
            .copied()
    }

    /// Number of stored windows, expired ones included.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimiter {
    async fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        self.check_now(identifier, config)
    }
}
