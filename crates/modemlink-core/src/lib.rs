//! modemlink-core: Core traits, types, and error definitions for modemlink.
//!
//! This crate defines the protocol-agnostic abstractions the modem driver is
//! built on. Applications depend on these types without pulling in a serial
//! port backend or the AT protocol engine.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`ModemEvent`] -- asynchronous session notifications
//! - [`ConnectionState`] / [`StateMachine`] -- session lifecycle tracking
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod state;
pub mod transport;

// Re-export key types at crate root for ergonomic `use modemlink_core::*`.
pub use error::{BootStep, DeviceError, DeviceErrorCategory, Error, Result};
pub use events::ModemEvent;
pub use state::{ConnectionState, StateMachine};
pub use transport::Transport;
