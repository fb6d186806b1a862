//! Error types for modemlink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, device-reported, and
//! session-layer errors are all captured here.

use std::fmt;

/// Which family of error response the modem reported.
///
/// GSM modems distinguish message-service failures (`+CMS ERROR`) from
/// mobile-equipment failures (`+CME ERROR`). A bare `ERROR` line carries
/// no category at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorCategory {
    /// `+CMS ERROR: <code>` -- message service failure (GSM 27.005).
    Cms,
    /// `+CME ERROR: <code>` -- mobile equipment failure (GSM 27.007).
    Cme,
    /// A bare `ERROR` final result code with no further detail.
    Unknown,
}

impl fmt::Display for DeviceErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceErrorCategory::Cms => write!(f, "CMS"),
            DeviceErrorCategory::Cme => write!(f, "CME"),
            DeviceErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// An error explicitly reported by the modem in its response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    /// Error family (CMS, CME, or uncategorised).
    pub category: DeviceErrorCategory,
    /// The error code or token following the marker (e.g. `"321"`).
    pub code: String,
    /// The full raw response text the error was extracted from.
    pub raw: String,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error {}", self.category, self.code)
    }
}

/// A step of the boot configuration sequence.
///
/// Carried by [`Error::Boot`] so callers can report exactly which
/// configuration command the modem rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStep {
    /// `AT` -- verify a modem is present and answering.
    Probe,
    /// `AT+CMGF=0` -- select PDU message format.
    PduMode,
    /// `AT+CMEE=1` -- enable numeric error reporting.
    ErrorReporting,
    /// `ATE0` -- disable command echo.
    EchoOff,
    /// `AT+CPMS` -- select the preferred message storage.
    Storage,
}

impl fmt::Display for BootStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootStep::Probe => "probe",
            BootStep::PduMode => "pdu-mode",
            BootStep::ErrorReporting => "error-reporting",
            BootStep::EchoOff => "echo-off",
            BootStep::Storage => "storage",
        };
        write!(f, "{name}")
    }
}

/// The error type for all modemlink operations.
///
/// Variants cover the full range of failure modes encountered when driving a
/// modem: physical transport failures, device-reported error responses,
/// timeouts, boot-sequence aborts, and message codec failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The modem returned an error response instead of `OK`.
    #[error("device error: {0}")]
    Device(DeviceError),

    /// No terminal response marker arrived within the allotted duration.
    ///
    /// This typically indicates the modem is powered off, the baud rate is
    /// wrong, or the SIM is not ready.
    #[error("timeout waiting for response")]
    Timeout,

    /// A transport-level error (serial port open/configure failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// No session to the modem has been established, or it was torn down.
    #[error("not connected")]
    NotConnected,

    /// The link to the modem was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A boot-sequence configuration step failed.
    ///
    /// Aborts the whole sequence; prior steps are not rolled back because
    /// modem configuration is not transactional.
    #[error("boot step {step} failed: {source}")]
    Boot {
        /// The configuration step that failed.
        step: BootStep,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Message PDU encoding or decoding failed.
    #[error("message codec error: {0}")]
    Codec(String),

    /// A multi-segment message send failed partway through.
    #[error("send failed at segment {segment} ({sent} segments already accepted): {source}")]
    SendFailed {
        /// Zero-based index of the segment that failed.
        segment: usize,
        /// How many segments the modem had already accepted.
        sent: usize,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// An invalid parameter was passed to a modem operation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this error means the session is unusable and the
    /// connection state should fall to `Disconnected`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConnectionLost | Error::Io(_) | Error::Transport(_)
        )
    }
}
