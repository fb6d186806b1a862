//! ModemBuilder -- fluent builder for constructing [`Modem`] sessions.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, timeouts, and message storage before the
//! transport is opened and the boot sequence runs.
//!
//! # Example
//!
//! ```no_run
//! use modemlink_modem::ModemBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> modemlink_core::Result<()> {
//! let modem = ModemBuilder::new()
//!     .serial_port("/dev/ttyUSB2")
//!     .baud_rate(115_200)
//!     .command_timeout(Duration::from_millis(300))
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::sync::broadcast;

use modemlink_core::{Error, Result, Transport};
use modemlink_transport::SerialTransport;

use crate::modem::Modem;
use crate::session;

/// Fluent builder for [`Modem`].
///
/// All configuration has sensible defaults, so the simplest usage is:
///
/// ```ignore
/// let modem = ModemBuilder::new()
///     .serial_port("/dev/ttyUSB2")
///     .connect()
///     .await?;
/// ```
pub struct ModemBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    command_timeout: Duration,
    send_timeout: Duration,
    storage: String,
}

impl ModemBuilder {
    /// Create a new builder with defaults: 115200 baud, 500ms command
    /// timeout, 30s send timeout, `SM` (SIM) message storage.
    pub fn new() -> Self {
        ModemBuilder {
            serial_port: None,
            baud_rate: 115_200,
            command_timeout: Duration::from_millis(500),
            send_timeout: Duration::from_secs(30),
            storage: "SM".to_owned(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB2` or `COM5`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default baud rate (default: 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the deadline for a single configuration or query command
    /// (default: 500ms).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the deadline for a message submission, which includes the
    /// network round trip (default: 30s).
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the preferred message storage area selected during boot
    /// (default: `"SM"`, the SIM card; `"ME"` is modem memory).
    pub fn storage(mut self, area: &str) -> Self {
        self.storage = area.to_string();
        self
    }

    /// Connect with a caller-provided transport and run the boot sequence.
    ///
    /// This is the primary entry point for testing (pass a `MockTransport`
    /// from `modemlink-test-harness`) and for advanced use cases where the
    /// caller manages the transport lifecycle directly.
    pub async fn connect_with_transport(self, transport: Box<dyn Transport>) -> Result<Modem> {
        let (event_tx, _) = broadcast::channel(64);
        let session = session::spawn(transport, event_tx.clone());
        let modem = Modem::new(
            session,
            event_tx,
            self.command_timeout,
            self.send_timeout,
            self.storage,
        );
        modem.connect().await?;
        Ok(modem)
    }

    /// Open a serial transport, connect, and run the boot sequence.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn connect(self) -> Result<Modem> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for connect()".into()))?
            .clone();

        let transport = SerialTransport::open(&port, self.baud_rate).await?;
        self.connect_with_transport(Box::new(transport)).await
    }
}

impl Default for ModemBuilder {
    fn default() -> Self {
        Self::new()
    }
}
