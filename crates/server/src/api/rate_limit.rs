//! Per-client sliding-window rate limiter.
//!
//! Each client identity (the peer IP address) keeps the timestamps of its
//! admitted requests within the trailing window. A check evicts timestamps
//! older than the window, rejects if `limit` remain, and otherwise records the
//! current instant. Eviction and append happen under one lock, so concurrent
//! bursts from the same client cannot undercount.
//!
//! The client map grows with every distinct client seen over the process
//! lifetime; idle entries are emptied but never removed.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Throttled. `retry_after` is when the oldest tracked request leaves the window.
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }

    /// Whole seconds to advertise in `Retry-After`, or `None` when admitted.
    ///
    /// A timestamp exactly at the window edge still counts, so the value is
    /// the wait rounded down plus one second: a client that waits this long
    /// is always admitted.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Admission::Admitted => None,
            Admission::Rejected { retry_after } => Some(retry_after.as_secs() + 1),
        }
    }
}

/// Sliding-window counter keyed by client identity.
///
/// Created once at service start and shared through `AppState`.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    /// Admits at most `limit` requests per client within any `window`.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Checks and records a request from `client` at the current instant.
    pub fn check(&self, client: &str) -> Admission {
        self.check_at(client, Instant::now())
    }

    /// Checks and records a request from `client` at `now`.
    pub fn check_at(&self, client: &str, now: Instant) -> Admission {
        let mut clients = self.clients.lock();
        let queue = clients.entry(client.to_string()).or_default();

        if let Some(cutoff) = now.checked_sub(self.window) {
            while queue.front().is_some_and(|&t| t < cutoff) {
                queue.pop_front();
            }
        }

        if queue.len() >= self.limit {
            let retry_after = queue
                .front()
                .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return Admission::Rejected { retry_after };
        }

        queue.push_back(now);
        Admission::Admitted
    }

    /// Number of distinct clients ever tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}
