//! Per-client admission control
//!
//! This module bounds the rate of requests accepted per client identity
//! using a token bucket per identity:
//! - Buckets are created lazily at full burst capacity on first sight
//! - Permits refill continuously at a fixed rate, capped at the burst
//! - A background sweeper evicts buckets idle past the retention window,
//!   so memory stays bounded to active clients
//!
//! The bucket map is guarded by a single coarse mutex; the lock is never
//! held across I/O or an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::AdmissionConfig;

/// Time source for the limiter
///
/// Injected so refill and eviction logic is testable without real sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request admitted; one permit was consumed
    Allowed,

    /// Request rejected; the caller should retry after the hinted interval
    Denied {
        /// Configured refill interval, not derived from live bucket state
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Per-identity rate-limit state
#[derive(Debug)]
struct ClientBucket {
    /// Available permits, always within [0, burst]
    tokens: f64,

    /// When the bucket was last refilled
    last_refill: Instant,

    /// When the identity last made a request (admitted or not)
    last_seen: Instant,
}

/// Token-bucket rate limiter keyed by client identity
///
/// Thread-safe; shared across all concurrent requests via `Arc`.
pub struct AdmissionController {
    config: AdmissionConfig,
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, ClientBucket>>,
}

impl AdmissionController {
    /// Create a new controller with the production clock
    pub fn new(config: AdmissionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a new controller with an injected clock
    pub fn with_clock(config: AdmissionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether to admit a request from `identity`
    ///
    /// An empty identity is a degenerate but defined case: it gets its own
    /// bucket like any other key.
    pub fn check(&self, identity: &str) -> Decision {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock().expect("bucket map lock poisoned");

        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| ClientBucket {
                tokens: self.config.burst,
                last_refill: now,
                last_seen: now,
            });

        // Refill first, capped at the burst capacity
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens =
            (bucket.tokens + elapsed.as_secs_f64() * self.config.refill_per_sec)
                .min(self.config.burst);
        bucket.last_refill = now;

        // Denied requests still count as activity for eviction purposes
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Decision::Allowed
        } else {
            Decision::Denied {
                retry_after: self.retry_after(),
            }
        }
    }

    /// Retry hint surfaced on denials: the configured refill interval
    pub fn retry_after(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.refill_per_sec)
    }

    /// Evict buckets idle past the retention window (2x the sweep interval)
    ///
    /// Called periodically by the sweeper; exposed for tests.
    pub fn sweep(&self) {
        let now = self.clock.now();
        let retention = self.retention_window();
        let mut buckets = self.buckets.lock().expect("bucket map lock poisoned");

        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) <= retention);
        let evicted = before - buckets.len();

        if evicted > 0 {
            tracing::debug!(evicted, remaining = buckets.len(), "Swept idle client buckets");
        }
    }

    /// Idle-bucket retention window
    pub fn retention_window(&self) -> Duration {
        Duration::from_secs(self.config.sweep_interval_secs * 2)
    }

    /// Number of currently tracked identities
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().expect("bucket map lock poisoned").len()
    }

    /// Start the background sweep task
    ///
    /// The returned handle stops the task deterministically; no timer
    /// outlives it.
    pub fn start_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let controller = Arc::clone(self);
        let interval = Duration::from_secs(self.config.sweep_interval_secs);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => controller.sweep(),
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Handle to the background sweep task
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep task and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
