// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting for credential endpoints.
//!
//! Each `(client, endpoint)` pair owns an independent fixed window: the first
//! attempt opens it, every checked attempt counts, and the counter resets once
//! the window has elapsed. Bursts straddling a window boundary may briefly see
//! up to twice the threshold.

use dashmap::DashMap;
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{EndpointLimit, RateLimitSettings};
use crate::metrics::RATE_LIMIT_DENIED;

/// Endpoints protected by the limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitedEndpoint {
    Login,
    Register,
}

impl LimitedEndpoint {
    /// Name used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }

    /// Map a request path to the endpoint it belongs to
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/auth/login" => Some(Self::Login),
            "/auth/register" => Some(Self::Register),
            _ => None,
        }
    }

    fn attempt_noun(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "registration",
        }
    }
}

impl fmt::Display for LimitedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold and window length for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl From<EndpointLimit> for RateLimitPolicy {
    fn from(limit: EndpointLimit) -> Self {
        Self {
            max_attempts: limit.max_attempts,
            window: limit.window(),
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Attempt admitted; `remaining` more fit in the current window
    Allowed { remaining: u32 },
    /// Attempt refused until the window rolls over
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Counter state for one `(client, endpoint)` pair
#[derive(Debug, Clone)]
struct RateLimitWindow {
    count: u32,
    started: Instant,
}

/// Per-client fixed window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<(String, LimitedEndpoint), RateLimitWindow>,
    login: RateLimitPolicy,
    register: RateLimitPolicy,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

impl RateLimiter {
    /// Create a limiter with explicit policies
    pub fn new(login: RateLimitPolicy, register: RateLimitPolicy) -> Self {
        Self {
            windows: DashMap::new(),
            login,
            register,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.login.into(), settings.register.into())
    }

    /// Policy applied to `endpoint`
    pub fn policy(&self, endpoint: LimitedEndpoint) -> RateLimitPolicy {
        match endpoint {
            LimitedEndpoint::Login => self.login,
            LimitedEndpoint::Register => self.register,
        }
    }

    /// Count an attempt from `client` against `endpoint`
    pub fn check(&self, client: &str, endpoint: LimitedEndpoint) -> RateDecision {
        let policy = self.policy(endpoint);
        let now = Instant::now();

        let mut window = self
            .windows
            .entry((client.to_string(), endpoint))
            .or_insert_with(|| RateLimitWindow {
                count: 0,
                started: now,
            });

        if now.duration_since(window.started) >= policy.window {
            window.count = 0;
            window.started = now;
        }

        if window.count >= policy.max_attempts {
            let retry_after = (window.started + policy.window).saturating_duration_since(now);
            counter!(RATE_LIMIT_DENIED, "endpoint" => endpoint.as_str()).increment(1);
            return RateDecision::Denied { retry_after };
        }

        window.count += 1;
        RateDecision::Allowed {
            remaining: policy.max_attempts - window.count,
        }
    }

    /// Message shown to a throttled client
    pub fn denial_message(&self, endpoint: LimitedEndpoint) -> String {
        format!(
            "Too many {} attempts. Please try again after {}.",
            endpoint.attempt_noun(),
            describe_window(self.policy(endpoint).window)
        )
    }

    /// Evict windows that have already elapsed
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        let (login, register) = (self.login.window, self.register.window);
        self.windows.retain(|(_, endpoint), window| {
            let length = match endpoint {
                LimitedEndpoint::Login => login,
                LimitedEndpoint::Register => register,
            };
            now.duration_since(window.started) < length
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked windows
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Spawn a task that evicts elapsed windows every `every`
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let evicted = limiter.cleanup();
                if evicted > 0 {
                    tracing::debug!(evicted, "evicted elapsed rate limit windows");
                }
            }
        })
    }
}

/// Render a window length the way the throttling message phrases it
fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        match secs / 3600 {
            1 => "an hour".to_string(),
            n => format!("{n} hours"),
        }
    } else if secs >= 60 && secs % 60 == 0 {
        match secs / 60 {
            1 => "a minute".to_string(),
            n => format!("{n} minutes"),
        }
    } else {
        format!("{secs} seconds")
    }
}
