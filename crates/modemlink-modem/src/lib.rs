//! AT command engine and SMS handling.
//!
//! This crate ties the pieces together: a background session task that owns
//! the transport and correlates AT commands with their terminated responses,
//! a boot sequence that puts the modem into a known state, and the message
//! operations (list, send, delete) built on the PDU codec in
//! [`modemlink_pdu`].
//!
//! The entry point is [`ModemBuilder`]:
//!
//! ```no_run
//! use modemlink_modem::ModemBuilder;
//!
//! # async fn example() -> modemlink_core::Result<()> {
//! let modem = ModemBuilder::new()
//!     .serial_port("/dev/ttyUSB2")
//!     .connect()
//!     .await?;
//!
//! modem.send_message("+31628870634", "hello from modemlink").await?;
//! # Ok(())
//! # }
//! ```

pub mod boot;
pub mod builder;
pub mod modem;
pub mod reassembly;

pub(crate) mod session;

pub use builder::ModemBuilder;
pub use modem::Modem;
pub use reassembly::{assemble, MessageSegment, TextMessage};
