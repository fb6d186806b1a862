//! Hex string helpers for PDU wire form.

use crate::PduError;

pub(crate) fn parse(text: &str) -> Result<Vec<u8>, PduError> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(PduError::InvalidHex(text.len() / 2));
    }
    let digits = text.as_bytes();
    let mut out = Vec::with_capacity(digits.len() / 2);
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(PduError::InvalidHex(i))?;
        let lo = nibble(pair[1]).ok_or(PduError::InvalidHex(i))?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

pub(crate) fn emit(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out
}
