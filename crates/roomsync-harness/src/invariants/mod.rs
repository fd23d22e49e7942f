//! Dashboard invariants.
//!
//! Each render in a simulation is turned into a [`SystemSnapshot`] (store
//! contents, list rows, open detail and the per-room history of sensor
//! timestamps) and every registered [`Invariant`] is checked against it.
//! Scenario tests then fail at the first render that breaks a rule, not at
//! the final assertion.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&SystemSnapshot::from_app(&app))?;
//! ```

mod checks;
mod snapshot;

pub use checks::{AcLockedInAuto, SensorMonotonicity, TargetInRange, ViewMatchesStore};
pub use snapshot::{DetailObservation, RoomObservation, SensorTimestamps, SystemSnapshot};
use thiserror::Error;

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A broken rule and what was observed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{invariant}: {message}")]
pub struct Violation {
    /// Invariant that failed.
    pub invariant: &'static str,
    /// Observed state that breaks it.
    pub message: String,
}

/// A rule over observable dashboard state.
pub trait Invariant: Send + Sync {
    /// Short name used in violation reports.
    fn name(&self) -> &'static str;

    /// Check `state`.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Set of invariants run together.
#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with nothing to check.
    pub fn new() -> Self {
        Self::default()
    }

    /// The dashboard rules:
    ///
    /// - [`TargetInRange`]
    /// - [`ViewMatchesStore`]
    /// - [`AcLockedInAuto`]
    /// - [`SensorMonotonicity`]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(TargetInRange);
        registry.add(ViewMatchesStore);
        registry.add(AcLockedInAuto);
        registry.add(SensorMonotonicity);
        registry
    }

    /// Register `invariant`.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Run every invariant; collects all violations rather than stopping at
    /// the first.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|invariant| invariant.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Panic listing every violation. For direct use in tests.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let report: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("{} invariant(s) broken {context}:\n  {}", report.len(), report.join("\n  "));
        }
    }

    /// Names of the registered invariants, in check order.
    pub fn names(&self) -> Vec<&'static str> {
        self.invariants.iter().map(|invariant| invariant.name()).collect()
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
