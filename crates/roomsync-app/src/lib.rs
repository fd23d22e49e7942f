//! Application layer for the room dashboard
//!
//! Pure state machines and a generic runtime for UI orchestration, enabling
//! deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (input handling, snapshots, command results)
//! - [`OptimisticController`]: optimistic writes and their reconciliation
//! - [`ViewBinder`]: list, detail and statistics view models
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod input;
mod optimistic;
mod runtime;
mod view;

pub use action::AppAction;
pub use app::{App, InputMode, LoadState};
pub use driver::Driver;
pub use event::AppEvent;
pub use input::KeyInput;
pub use optimistic::{
    ControlError, Dispatch, OptimisticController, PendingChange, Resolution, Ticket,
};
pub use runtime::Runtime;
pub use view::{
    DashboardStats, DetailView, MISSING_MEAN, MISSING_VALUE, NEVER_UPDATED, RenderReport,
    RoomView, SensorLine, ToggleView, ViewBinder, format_clock, format_reading, room_title,
};
