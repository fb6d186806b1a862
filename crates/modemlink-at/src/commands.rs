//! AT command encoding.
//!
//! Pure functions that render each modem operation into the exact wire text
//! the device expects: `AT`-prefixed commands terminated with a carriage
//! return, and the Ctrl-Z terminated payload that follows the `> ` prompt
//! during a PDU send.

use bytes::{BufMut, BytesMut};

use crate::protocol::PAYLOAD_TERMINATOR;

/// Command terminator (carriage return).
pub const CR: char = '\r';

/// Message listing filter, by stored-message status (GSM 27.005 `<stat>`
/// values in PDU mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Received, not yet read.
    ReceivedUnread,
    /// Received and read.
    ReceivedRead,
    /// Stored, not yet sent.
    StoredUnsent,
    /// Stored and sent.
    StoredSent,
    /// Every message in storage.
    All,
}

impl MessageStatus {
    /// The numeric `<stat>` code used in PDU mode.
    pub fn code(self) -> u8 {
        match self {
            MessageStatus::ReceivedUnread => 0,
            MessageStatus::ReceivedRead => 1,
            MessageStatus::StoredUnsent => 2,
            MessageStatus::StoredSent => 3,
            MessageStatus::All => 4,
        }
    }
}

fn command(body: &str) -> String {
    let mut buf = BytesMut::with_capacity(body.len() + 1);
    buf.put_slice(body.as_bytes());
    buf.put_u8(CR as u8);
    // Command bodies are ASCII by construction.
    String::from_utf8(buf.to_vec()).unwrap_or_default()
}

/// `AT` -- probe that a modem is present and answering.
pub fn attention() -> String {
    command("AT")
}

/// `AT+CMGF=<mode>` -- select message format: `false` selects PDU mode,
/// `true` selects text mode.
pub fn set_message_format(text_mode: bool) -> String {
    command(if text_mode { "AT+CMGF=1" } else { "AT+CMGF=0" })
}

/// `AT+CMEE=<level>` -- select error-report verbosity (0 bare, 1 numeric,
/// 2 verbose).
pub fn set_error_reporting(level: u8) -> String {
    command(&format!("AT+CMEE={level}"))
}

/// `ATE0` / `ATE1` -- disable or enable command echo.
pub fn set_echo(enabled: bool) -> String {
    command(if enabled { "ATE1" } else { "ATE0" })
}

/// `AT+CPMS="<mem>","<mem>","<mem>"` -- select the preferred message storage
/// for reading, writing, and receiving.
pub fn set_storage(area: &str) -> String {
    command(&format!("AT+CPMS=\"{area}\",\"{area}\",\"{area}\""))
}

/// `AT+CGMM` -- request the model identification.
pub fn request_model() -> String {
    command("AT+CGMM")
}

/// `AT+CGSN` -- request the product serial number (IMEI).
pub fn request_serial_number() -> String {
    command("AT+CGSN")
}

/// `AT+CMGL=<stat>` -- list stored messages matching `status`.
pub fn list_messages(status: MessageStatus) -> String {
    command(&format!("AT+CMGL={}", status.code()))
}

/// `AT+CMGD=<index>` -- delete the stored message at `index`.
pub fn delete_message(index: u32) -> String {
    command(&format!("AT+CMGD={index}"))
}

/// `AT+CMGS=<length>` -- begin a PDU send. `tpdu_len` is the TPDU length in
/// octets, excluding the service-center address. The modem answers with the
/// `> ` prompt.
pub fn send_message(tpdu_len: usize) -> String {
    command(&format!("AT+CMGS={tpdu_len}"))
}

/// The PDU hex payload written after the `> ` prompt, terminated with
/// Ctrl-Z instead of a carriage return.
pub fn message_payload(hex: &str) -> String {
    let mut s = String::with_capacity(hex.len() + 1);
    s.push_str(hex);
    s.push(PAYLOAD_TERMINATOR);
    s
}

/// Normalise an arbitrary caller-supplied command for raw passthrough:
/// trims trailing whitespace and guarantees exactly one carriage return.
pub fn raw(text: &str) -> String {
    command(text.trim_end_matches(['\r', '\n', ' ']))
}
