//! Connection state tracking for a modem session.
//!
//! A session moves `Connecting -> Connected` when the boot sequence
//! completes, and from any state to `Disconnected` on teardown or an
//! unrecoverable failure. `Disconnected` is terminal: a new session must be
//! constructed to reconnect.

use std::fmt;

/// The lifecycle state of a modem session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is open, boot sequence not yet completed.
    Connecting,
    /// Boot sequence completed; the modem is configured and answering.
    Connected,
    /// Session torn down or failed. Terminal.
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        write!(f, "{name}")
    }
}

/// Tracks the current [`ConnectionState`] and enforces the legal transitions.
///
/// The machine itself does not emit notifications; [`apply`](Self::apply)
/// reports whether the state actually changed so the caller can publish a
/// `StateChanged` event exactly once per transition.
#[derive(Debug)]
pub struct StateMachine {
    current: ConnectionState,
}

impl StateMachine {
    /// Create a machine in the `Connecting` state.
    pub fn new() -> Self {
        StateMachine {
            current: ConnectionState::Connecting,
        }
    }

    /// The current state.
    pub fn current(&self) -> ConnectionState {
        self.current
    }

    /// Attempt a transition to `next`.
    ///
    /// Returns `true` if the state changed. Self-transitions and any
    /// transition out of `Disconnected` are rejected, as is moving backwards
    /// from `Connected` to `Connecting`.
    pub fn apply(&mut self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        let allowed = match (self.current, next) {
            (Connecting, Connected) => true,
            (Connecting, Disconnected) | (Connected, Disconnected) => true,
            _ => false,
        };
        if allowed {
            self.current = next;
        }
        allowed
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
