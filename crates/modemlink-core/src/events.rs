//! Asynchronous modem session events.
//!
//! Events are emitted by the modem driver through a `tokio::sync::broadcast`
//! channel: connection state changes plus raw wire traces of every command
//! sent and every chunk of text received. Host applications subscribe for
//! status displays and protocol debugging without polling.

use crate::state::ConnectionState;

/// An event emitted by the modem driver.
///
/// Delivery is best-effort through a bounded broadcast channel; slow
/// consumers may miss events under load, and late subscribers never see
/// earlier events.
#[derive(Debug, Clone)]
pub enum ModemEvent {
    /// The session moved to a new connection state.
    StateChanged(ConnectionState),

    /// Raw command text was written to the modem.
    CommandSent {
        /// The exact text written, including terminators.
        text: String,
    },

    /// A raw chunk of text arrived from the modem.
    DataReceived {
        /// The chunk as delivered by the transport.
        text: String,
    },
}
