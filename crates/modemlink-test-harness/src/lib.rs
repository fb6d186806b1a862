//! Test utilities for modemlink.
//!
//! Provides [`MockTransport`], a scripted [`Transport`](modemlink_core::Transport)
//! implementation for exercising the command engine without a modem attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
