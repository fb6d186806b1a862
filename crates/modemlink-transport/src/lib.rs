//! Transport implementations for modemlink.
//!
//! Cellular modems present as serial devices, either over a real UART or as
//! USB virtual COM ports (a single modem usually exposes several; the AT
//! command port is the one to open). [`SerialTransport`] implements the
//! [`Transport`](modemlink_core::Transport) trait on top of such a port.

pub mod serial;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
