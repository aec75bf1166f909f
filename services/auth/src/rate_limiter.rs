//! Attempt limiter for confirmation code exchange
//!
//! Failed token requests are counted per username. Once a username exceeds
//! the allowed attempts inside the window it is locked out for a while, which
//! keeps the six-digit code space out of reach of brute force.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Attempt limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Attempts allowed per window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Lockout duration in seconds
    pub lockout_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,   // 5 minutes
            lockout_seconds: 3600, // 1 hour
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `TOKEN_MAX_ATTEMPTS` (default: 5)
    /// - `TOKEN_ATTEMPT_WINDOW_SECS` (default: 300)
    /// - `TOKEN_LOCKOUT_SECS` (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_or("TOKEN_MAX_ATTEMPTS", defaults.max_attempts),
            window_seconds: env_or("TOKEN_ATTEMPT_WINDOW_SECS", defaults.window_seconds),
            lockout_seconds: env_or("TOKEN_LOCKOUT_SECS", defaults.lockout_seconds),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug)]
struct Attempts {
    count: u32,
    window_start: Instant,
    locked_until: Option<Instant>,
}

/// Per-key attempt counter shared across requests
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, Attempts>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key`; returns `false` when the key is locked out
    pub async fn check(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(Attempts {
            count: 0,
            window_start: now,
            locked_until: None,
        });

        if let Some(locked_until) = entry.locked_until {
            if now < locked_until {
                return false;
            }
            entry.locked_until = None;
            entry.count = 0;
            entry.window_start = now;
        }

        if now.duration_since(entry.window_start) >= Duration::from_secs(self.config.window_seconds)
        {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.config.max_attempts {
            entry.locked_until = Some(now + Duration::from_secs(self.config.lockout_seconds));
            warn!(
                "Locked out {} for {} seconds after {} attempts",
                key, self.config.lockout_seconds, entry.count
            );
            return false;
        }

        entry.count += 1;
        true
    }

    /// Forget the attempts recorded for `key` (after a successful exchange)
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}
