//! Retry budget and exponential backoff.
//!
//! A [`RetryBudget`] is owned by exactly one logical operation. Each time
//! the operation hits a retryable failure it calls
//! [`backoff`](RetryBudget::backoff), which either sleeps and lets the
//! caller try again or reports that the budget is spent.
//!
//! [`Backoffer`] is the stock implementation: per-kind exponential delays,
//! bounded by a total sleep allowance.

use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Why an operation is backing off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackoffKind {
    /// Routing information was stale (leader moved, region split or merged).
    RegionMiss,
    /// The store asked the client to slow down.
    ServerBusy,
    /// A round-trip failed in a way worth retrying.
    Rpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Jitter {
    None,
    /// Half the delay is fixed, the other half random.
    Equal,
}

impl BackoffKind {
    /// `(base_ms, cap_ms, jitter)` of this kind's delay curve.
    fn curve(self) -> (u64, u64, Jitter) {
        match self {
            BackoffKind::RegionMiss => (2, 500, Jitter::None),
            BackoffKind::ServerBusy => (2_000, 10_000, Jitter::Equal),
            BackoffKind::Rpc => (100, 2_000, Jitter::Equal),
        }
    }

    /// Short name, used as a tracing field.
    pub fn name(self) -> &'static str {
        match self {
            BackoffKind::RegionMiss => "region_miss",
            BackoffKind::ServerBusy => "server_busy",
            BackoffKind::Rpc => "rpc",
        }
    }
}

/// A per-operation retry allowance.
///
/// Never shared between concurrent operations.
#[async_trait::async_trait]
pub trait RetryBudget: Send {
    /// Record a retryable failure described by `cause` and wait before the
    /// next attempt.
    ///
    /// Returns [`ClientError::BackoffExhausted`] once the budget is spent;
    /// the caller must then stop retrying.
    async fn backoff(&mut self, kind: BackoffKind, cause: String) -> Result<(), ClientError>;
}

/// Exponential backoff bounded by a total sleep time.
///
/// Each kind keeps its own attempt counter, so the delay for kind `k` after
/// `n` previous `k` failures is `min(cap, base * 2^n)`, with jitter for the
/// kinds that use it. A backoff whose delay would bring the total sleep to
/// `max_sleep` or beyond fails without sleeping.
#[derive(Debug)]
pub struct Backoffer {
    max_sleep: Duration,
    total_sleep: Duration,
    attempts: HashMap<BackoffKind, u32>,
    errors: Vec<String>,
    rng: StdRng,
}

impl Backoffer {
    /// Create a budget allowing up to `max_sleep` of total backoff.
    pub fn new(max_sleep: Duration) -> Self {
        Self {
            max_sleep,
            total_sleep: Duration::ZERO,
            attempts: HashMap::new(),
            errors: Vec::new(),
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Set the jitter RNG seed for deterministic delays.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..self
        }
    }

    /// Total time slept so far.
    pub fn total_sleep(&self) -> Duration {
        self.total_sleep
    }

    /// Number of failures recorded so far.
    pub fn attempts(&self) -> usize {
        self.errors.len()
    }

    /// Causes of the failures recorded so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn next_sleep(&mut self, kind: BackoffKind) -> Duration {
        let (base, cap, jitter) = kind.curve();
        let attempt = self.attempts.entry(kind).or_insert(0);
        let expo = base.saturating_mul(1u64 << (*attempt).min(32)).min(cap);
        *attempt += 1;

        let ms = match jitter {
            Jitter::None => expo,
            Jitter::Equal => {
                let half = expo / 2;
                half + self.rng.random_range(0..=half)
            }
        };
        Duration::from_millis(ms)
    }
}

#[async_trait::async_trait]
impl RetryBudget for Backoffer {
    async fn backoff(&mut self, kind: BackoffKind, cause: String) -> Result<(), ClientError> {
        let sleep = self.next_sleep(kind);
        self.errors.push(cause);

        if self.total_sleep + sleep >= self.max_sleep {
            let last_error = self.errors.last().cloned().unwrap_or_default();
            warn!(
                kind = kind.name(),
                attempts = self.errors.len(),
                total_sleep_ms = self.total_sleep.as_millis() as u64,
                %last_error,
                "backoff budget exhausted"
            );
            return Err(ClientError::BackoffExhausted {
                max_ms: self.max_sleep.as_millis() as u64,
                attempts: self.errors.len(),
                last_error,
            });
        }

        debug!(
            kind = kind.name(),
            sleep_ms = sleep.as_millis() as u64,
            attempt = self.errors.len(),
            "backing off"
        );
        tokio::time::sleep(sleep).await;
        self.total_sleep += sleep;
        Ok(())
    }
}
