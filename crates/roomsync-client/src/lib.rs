//! Client
//!
//! Everything that talks to the backend, split the same way as the rest of
//! the workspace: pure logic here, I/O behind a trait.
//!
//! # Architecture
//!
//! [`CommandClient`] builds requests from [`Command`]s and interprets the
//! replies; the actual exchange goes through a [`Backend`] implementation.
//! [`UpdateStream`] is a Sans-IO reconnect state machine: it receives
//! [`StreamEvent`]s with the current time and returns [`StreamAction`]s for
//! the driver to execute.
//!
//! # Components
//!
//! - [`Command`] / [`CommandOutcome`]: one control operation and its result
//! - [`CommandClient`]: typed operations over a [`Backend`]
//! - [`UpdateStream`]: push-channel lifecycle with fixed-delay reconnect
//! - [`ClientConfig`]: server address and reconnect delay
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::HttpBackend`]: [`Backend`] over HTTP
//! - [`transport::connect_stream`]: open the push channel

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backend;
mod client;
mod command;
mod config;
mod error;
mod stream;

#[cfg(feature = "transport")]
pub mod transport;

pub use backend::{Backend, Request, Response};
pub use client::CommandClient;
pub use command::{Command, CommandOutcome};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_RECONNECT_DELAY};
pub use error::{CommandError, TransportError};
pub use roomsync_core::{Environment, RoomId};
pub use stream::{StreamAction, StreamEvent, StreamSignal, StreamState, UpdateStream};
