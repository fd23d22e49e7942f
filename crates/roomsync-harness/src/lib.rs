//! Deterministic simulation harness for the room dashboard.
//!
//! In-memory implementations of the backend, the clock and the I/O driver,
//! so the real [`roomsync_app::Runtime`] can be driven step by step with
//! reproducible timing and injected failures.
//!
//! # Scenario Testing
//!
//! [`Simulation`] wires everything together: press keys, deliver backend
//! answers in any order, push stream updates, let virtual time pass.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the
//! dashboard invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod scenario;
pub mod sim_backend;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    AcLockedInAuto, DetailObservation, Invariant, InvariantRegistry, InvariantResult,
    RoomObservation, SensorMonotonicity, SensorTimestamps, SystemSnapshot, TargetInRange,
    ViewMatchesStore, Violation,
};
pub use scenario::Simulation;
pub use sim_backend::{DEFAULT_TARGET, Fault, SimBackend, room, sensor};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
