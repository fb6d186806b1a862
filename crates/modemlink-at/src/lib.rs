//! modemlink-at: Hayes AT text-protocol engine.
//!
//! AT responses have no length framing: the only way to know a response is
//! complete is to recognise a terminal result marker in the accumulated
//! text. This crate owns that boundary detection, the structuring of a
//! terminated response into typed items, and the rendering of modem
//! operations into exact command text.

pub mod commands;
pub mod protocol;
pub mod response;

pub use commands::MessageStatus;
pub use protocol::{classify_error, scan, ScanOutcome, ERROR_MARKER, OK_TERMINATOR, PROMPT};
pub use response::{parse, AtResponse, ResponseItem};
