//! Serial port transport.
//!
//! [`SerialTransport`] drives the UART or USB virtual COM port a cellular
//! module hangs off. Most USB modems enumerate several ports; the AT command
//! interface is usually the second or third one (`/dev/ttyUSB2` on a typical
//! Quectel module). 115200 baud covers nearly everything modern; very old
//! embedded modules may want 9600.
//!
//! # Example
//!
//! ```no_run
//! use modemlink_transport::SerialTransport;
//! use modemlink_core::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> modemlink_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB2", 115200).await?;
//! transport.send(b"AT\r").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_millis(500)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use modemlink_core::{Error, Result, Transport};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilder, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, trace, warn};

/// Line settings for a modem serial port.
///
/// The default (115200 8N1, no flow control) is what virtually every USB
/// modem expects. A few modules insist on RTS/CTS at high baud rates; set
/// [`flow_control`](Self::flow_control) for those.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    /// Apply everything except the baud rate (which `tokio_serial::new`
    /// already took) to the port builder.
    fn apply(&self, builder: SerialPortBuilder) -> SerialPortBuilder {
        builder
            .data_bits(match self.data_bits {
                DataBits::Five => tokio_serial::DataBits::Five,
                DataBits::Six => tokio_serial::DataBits::Six,
                DataBits::Seven => tokio_serial::DataBits::Seven,
                DataBits::Eight => tokio_serial::DataBits::Eight,
            })
            .stop_bits(match self.stop_bits {
                StopBits::One => tokio_serial::StopBits::One,
                StopBits::Two => tokio_serial::StopBits::Two,
            })
            .parity(match self.parity {
                Parity::None => tokio_serial::Parity::None,
                Parity::Odd => tokio_serial::Parity::Odd,
                Parity::Even => tokio_serial::Parity::Even,
            })
            .flow_control(match self.flow_control {
                FlowControl::None => tokio_serial::FlowControl::None,
                FlowControl::Software => tokio_serial::FlowControl::Software,
                FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
            })
    }
}

/// Data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

/// A yanked USB cable shows up as one of these kinds mid-read or mid-write.
fn map_link_error(port_name: &str, e: std::io::Error) -> Error {
    error!(port = %port_name, error = %e, "serial io failed");
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => {
            Error::ConnectionLost
        }
        _ => Error::Io(e),
    }
}

/// [`Transport`] over a serial port.
///
/// Closing takes the stream out of the `Option`; later calls report
/// [`Error::NotConnected`].
pub struct SerialTransport {
    port: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open a port at the given baud rate with default line settings.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a port with full control over the line settings.
    ///
    /// ```no_run
    /// # use modemlink_transport::{SerialTransport, SerialConfig, FlowControl};
    /// # async fn example() -> modemlink_core::Result<()> {
    /// let config = SerialConfig {
    ///     baud_rate: 921600,
    ///     flow_control: FlowControl::Hardware,
    ///     ..Default::default()
    /// };
    /// let transport = SerialTransport::open_with_config("/dev/ttyUSB2", config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        debug!(port = %port, config = ?config, "opening serial port");

        let stream = config
            .apply(tokio_serial::new(port, config.baud_rate))
            .open_native_async()
            .map_err(|e| {
                error!(port = %port, error = %e, "opening serial port failed");
                Error::Transport(format!("cannot open serial port {port}: {e}"))
            })?;

        info!(port = %port, baud_rate = config.baud_rate, "serial port open");

        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    /// Path of the underlying port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        trace!(port = %self.port_name, bytes = data.len(), "writing");
        port.write_all(data)
            .await
            .map_err(|e| map_link_error(&self.port_name, e))?;

        // Flush so short commands are not left sitting in the OS buffer.
        port.flush()
            .await
            .map_err(|e| map_link_error(&self.port_name, e))
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                trace!(port = %self.port_name, bytes = n, "read");
                Ok(n)
            }
            Ok(Err(e)) => Err(map_link_error(&self.port_name, e)),
            Err(_) => {
                trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "read timed out"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                warn!(port = %self.port_name, error = %e, "flush on close failed");
            }
            // Dropping the stream releases the port.
            info!(port = %self.port_name, "serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_115200_8n1() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn link_error_maps_a_broken_pipe_to_connection_lost() {
        let e = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(map_link_error("ttyTEST", e), Error::ConnectionLost));

        let e = std::io::Error::new(std::io::ErrorKind::InvalidData, "noise");
        assert!(matches!(map_link_error("ttyTEST", e), Error::Io(_)));
    }

    #[tokio::test]
    async fn opening_a_missing_port_fails() {
        let result = SerialTransport::open("/dev/modemlink-no-such-port", 115200).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
