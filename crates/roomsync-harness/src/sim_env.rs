//! Virtual-time environment.
//!
//! [`SimEnv`] replaces the system clock in simulation. Time only moves when a
//! test calls [`SimEnv::advance`] (or something sleeps), so reconnect delays
//! are exercised without waiting.

use std::{
    future::Future,
    ops::{Add, Sub},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use roomsync_core::Environment;

/// Instant on the virtual clock: time since the simulation started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Instant `elapsed` after the simulation started.
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self(elapsed)
    }

    /// Time since the simulation started.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Shared virtual clock. Clones observe the same time.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    elapsed_nanos: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock at the simulation epoch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward.
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Time since the simulation started.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.elapsed())
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let env = SimEnv::new();
        let other = env.clone();
        env.advance(Duration::from_secs(3));

        assert_eq!(other.now(), SimInstant::from_elapsed(Duration::from_secs(3)));
    }

    #[test]
    fn instants_subtract_without_underflow() {
        let early = SimInstant::from_elapsed(Duration::from_secs(1));
        let late = early + Duration::from_secs(4);

        assert_eq!(late - early, Duration::from_secs(4));
        assert_eq!(early - late, Duration::ZERO);
    }

    #[tokio::test]
    async fn sleep_advances_clock() {
        let env = SimEnv::new();
        env.sleep(Duration::from_secs(5)).await;
        assert_eq!(env.elapsed(), Duration::from_secs(5));
    }
}
