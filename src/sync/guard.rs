//! Rate-limit guard for remote calls.
//!
//! The remote store enforces a request quota. Every call goes through
//! [`TransportGuard::call`]: a failure is treated as a rate-limit rejection,
//! answered with a fixed cooldown and exactly one retry. Successful calls are
//! followed by a short pacing pause to stay under the quota.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

/// Default wait after a failed call before the single retry.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(20);

/// Default pause after every successful call.
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

/// Blocking pause, injectable for tests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().clone()
    }

    /// Number of recorded pauses equal to `duration`.
    #[must_use]
    pub fn count(&self, duration: Duration) -> usize {
        self.pauses.lock().iter().filter(|d| **d == duration).count()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.pauses.lock().push(duration);
    }
}

/// Wraps remote calls with cooldown-and-retry-once semantics.
#[derive(Clone)]
pub struct TransportGuard {
    cooldown: Duration,
    pacing: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for TransportGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportGuard")
            .field("cooldown", &self.cooldown)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl Default for TransportGuard {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_PACING)
    }
}

impl TransportGuard {
    #[must_use]
    pub fn new(cooldown: Duration, pacing: Duration) -> Self {
        Self {
            cooldown,
            pacing,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    #[must_use]
    pub const fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Run `operation`, retrying once after the cooldown if it fails.
    ///
    /// The retry's error, if any, is returned as is.
    pub fn call<T, F>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let value = match operation() {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    call = label,
                    error = %err,
                    cooldown_secs = self.cooldown.as_secs_f64(),
                    "Remote call failed, assuming rate limit; retrying once after cooldown"
                );
                self.sleeper.sleep(self.cooldown);
                operation()?
            }
        };
        self.sleeper.sleep(self.pacing);
        debug!(call = label, "Remote call completed");
        Ok(value)
    }
}
