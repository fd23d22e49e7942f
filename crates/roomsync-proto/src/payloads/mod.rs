//! JSON payloads exchanged with the backend.
//!
//! Field names follow the backend verbatim (`temperature_cible`,
//! `climatisation_active`, ...). Renaming into domain vocabulary happens one
//! layer up, so these structs stay a faithful mirror of the wire.
//!
//! # Invariants
//!
//! - A sensor that is `null` and a sensor that is absent decode identically
//!   (`None`).
//! - Room maps keep the order in which the backend emitted the keys.

pub mod commands;
pub mod rooms;
