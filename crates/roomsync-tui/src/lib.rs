//! Terminal UI for the room dashboard
//!
//! A thin shell over [`roomsync_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic
//! [`roomsync_app::Runtime`].
//!
//! This crate only handles terminal events, HTTP wiring and rendering.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod terminal;
pub mod ui;

pub use roomsync_app::{App, AppAction, AppEvent, Driver, KeyInput, Runtime};
pub use terminal::{TICK_INTERVAL, TerminalDriver, TerminalError};
