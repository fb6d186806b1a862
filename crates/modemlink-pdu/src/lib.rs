//! SMS PDU codec.
//!
//! Decodes SMS-DELIVER, SMS-SUBMIT, and SMS-STATUS-REPORT TPDUs as stored by
//! modems in PDU mode (hex string prefixed with an SMSC address), and encodes
//! SMS-SUBMIT TPDUs for outgoing messages, splitting long texts into
//! concatenated segments with user data headers.
//!
//! Supported user-data alphabets are the GSM 7-bit default alphabet
//! (packed, with the basic extension table) and UCS-2.

pub mod decode;
pub mod encode;
pub mod gsm7;

mod hex;

pub use decode::{decode, DecodedMessage, MessageKind, SegmentInfo};
pub use encode::{encode_submit, EncodeOptions, EncodedSegment, Encoding};

use chrono::{DateTime, FixedOffset};

/// PDU codec failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PduError {
    /// Non-hex character or odd-length hex string at the given byte offset.
    #[error("invalid hex data at byte {0}")]
    InvalidHex(usize),

    /// The PDU ended before a field it declared.
    #[error("truncated PDU")]
    Truncated,

    /// Message type indicator we do not handle.
    #[error("unsupported message type indicator {0:#04x}")]
    UnsupportedMessageType(u8),

    /// Data coding scheme naming an alphabet we do not handle.
    #[error("unsupported data coding scheme {0:#04x}")]
    UnsupportedDcs(u8),

    /// Character that cannot be written in the GSM 7-bit default alphabet.
    #[error("character {0:?} is not representable in the GSM 7-bit alphabet")]
    Unrepresentable(char),

    /// Address field that cannot be encoded or decoded.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Message would need more segments than a concatenation header can carry.
    #[error("message needs {0} segments, more than a concatenated SMS allows")]
    TooManyParts(usize),

    /// UCS-2 user data with an odd length or an unpaired surrogate.
    #[error("malformed UCS-2 user data")]
    InvalidUcs2,
}

impl From<PduError> for modemlink_core::Error {
    fn from(err: PduError) -> Self {
        modemlink_core::Error::Codec(err.to_string())
    }
}

/// Timestamp carried in a DELIVER or STATUS-REPORT TPDU, with the sender's
/// local UTC offset.
pub type PduTimestamp = DateTime<FixedOffset>;
