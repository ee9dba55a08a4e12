//! Per-call deadline
//!
//! Every public operation takes a [`CallContext`]. Each HTTP exchange made on
//! behalf of that call is bounded by whatever is left of its deadline (capped
//! by the configured per-request timeout). Cancellation is dropping the
//! returned future, which aborts the in-flight request.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline carried through one call
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// No deadline beyond the per-request timeout
    pub fn background() -> Self {
        Self::default()
    }

    /// Deadline `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Absolute deadline
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Budget for one exchange
    pub fn budget(&self, cap: Duration) -> Duration {
        match self.remaining() {
            Some(left) => left.min(cap),
            None => cap,
        }
    }

    /// Run `fut` within the budget; expiry becomes [`Error::Timeout`].
    pub async fn run<F, T>(&self, url: &str, cap: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_expired() {
            return Err(Error::timeout(url));
        }
        match tokio::time::timeout(self.budget(cap), fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(url)),
        }
    }
}
