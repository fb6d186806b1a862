//! # modemlink -- Async AT-Command Driver for Cellular Modems
//!
//! `modemlink` drives cellular modems (Quectel, SIMCom, Telit, u-blox, and
//! anything else that speaks the standard AT command set) over a serial
//! port, with first-class support for SMS in PDU mode: sending, reading,
//! and reassembling concatenated multi-part messages.
//!
//! ## Quick Start
//!
//! Add `modemlink` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! modemlink = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect to a modem and send a message:
//!
//! ```no_run
//! use modemlink::ModemBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let modem = ModemBuilder::new()
//!         .serial_port("/dev/ttyUSB2")
//!         .connect()
//!         .await?;
//!
//!     println!("Connected to {}", modem.model().await.unwrap_or_default());
//!     modem.send_message("+31628870634", "hello from modemlink").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                 | Purpose                                          |
//! |-----------------------|--------------------------------------------------|
//! | `modemlink-core`      | [`Transport`] trait, errors, events, state       |
//! | `modemlink-at`        | AT wire protocol: commands, terminators, parsing |
//! | `modemlink-pdu`       | SMS PDU codec: GSM 7-bit, UCS-2, concatenation   |
//! | `modemlink-transport` | Serial transport implementation                  |
//! | `modemlink-modem`     | Session engine, boot sequence, message handling  |
//! | **`modemlink`**       | This facade crate -- re-exports everything       |
//!
//! ## How a Command Runs
//!
//! On connect, a background session task takes ownership of the transport.
//! Every command goes through that task, so at most one command is in
//! flight at a time -- exactly what an AT modem requires. The task
//! accumulates response chunks until the `OK` terminator or an error marker
//! arrives, structures the response, and hands it back. During connect a
//! fixed boot sequence (`AT`, `AT+CMGF=0`, `AT+CMEE=1`, `ATE0`, `AT+CPMS`)
//! puts the modem into the state the rest of the crate assumes; the first
//! failing step aborts the connect with [`Error::Boot`].
//!
//! ## Multi-Part Messages
//!
//! Texts longer than one SMS are sent as concatenated segments and
//! reassembled on the receive side, whatever order the segments landed in
//! storage:
//!
//! ```no_run
//! use modemlink::{MessageStatus, ModemBuilder};
//!
//! # async fn example() -> anyhow::Result<()> {
//! # let modem = ModemBuilder::new().serial_port("/dev/ttyUSB2").connect().await?;
//! for message in modem.list_messages(MessageStatus::All).await? {
//!     println!("{}: {}", message.sender, message.text);
//!     modem.delete(&message).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Events
//!
//! The session broadcasts [`ModemEvent`]s: connection state changes and the
//! raw command traffic, useful for logging consoles and debugging.

pub use modemlink_core::*;

pub use modemlink_at::MessageStatus;
pub use modemlink_modem::{Modem, ModemBuilder, TextMessage};
pub use modemlink_pdu::{EncodeOptions, Encoding, MessageKind};

/// AT wire protocol: command formatting, response terminators, and the
/// response structurer.
pub mod at {
    pub use modemlink_at::*;
}

/// SMS PDU codec: TPDU encode/decode, GSM 7-bit packing, UCS-2, and
/// concatenation headers.
pub mod pdu {
    pub use modemlink_pdu::*;
}

/// Transport implementations (serial).
pub mod transport {
    pub use modemlink_transport::*;
}
