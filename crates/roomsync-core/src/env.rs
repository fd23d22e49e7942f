//! Environment abstraction for deterministic testing.
//!
//! The only timing-based behavior in the client is the fixed reconnect delay
//! of the push stream. State machines take the current instant as a
//! parameter; drivers obtain it from an [`Environment`]. Production uses the
//! system clock, the harness a virtual one.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::{Duration, Instant},
};

/// Instant type usable by the state machines.
pub trait Timepoint:
    Copy + Ord + Debug + Send + Sync + Add<Duration, Output = Self> + Sub<Output = Duration>
{
}

impl<T> Timepoint for T where
    T: Copy + Ord + Debug + Send + Sync + Add<Duration, Output = T> + Sub<Output = Duration>
{
}

/// Source of time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type of this environment.
    type Instant: Timepoint;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code sleeps; state machines never do.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production environment backed by the system clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods, reason = "the system clock is read here only")]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let env = SystemEnv::new();
        let first = env.now();
        let second = env.now();
        assert!(second >= first);
    }

    #[tokio::test]
    async fn system_sleep_waits_the_full_duration() {
        let env = SystemEnv::new();
        let start = env.now();
        env.sleep(Duration::from_millis(20)).await;
        assert!(env.now() - start >= Duration::from_millis(20));
    }
}
