//! SMS-SUBMIT encoding for outgoing messages.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::gsm7;
use crate::hex;
use crate::PduError;

/// User data alphabet for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Packed GSM 7-bit default alphabet. 160 characters per single message,
    /// 153 per concatenated segment.
    Gsm7,
    /// UCS-2 (UTF-16BE code units). 70 per single message, 67 per segment.
    Ucs2,
}

/// Options for [`encode_submit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Alphabet to use. `None` encodes with [`Encoding::Gsm7`]; callers that
    /// want automatic widening catch [`PduError::Unrepresentable`] and retry
    /// with [`Encoding::Ucs2`].
    pub encoding: Option<Encoding>,
}

/// One ready-to-send segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSegment {
    /// Hex PDU including the leading empty SMSC field.
    pub hex: String,
    /// TPDU length in octets, excluding the SMSC field. This is the value
    /// `AT+CMGS` expects.
    pub tpdu_len: usize,
}

/// Rolling reference for concatenated messages, so segments of consecutive
/// sends do not collide in the receiver's reassembly buffer.
static NEXT_REFERENCE: AtomicU8 = AtomicU8::new(1);

const GSM7_SINGLE: usize = 160;
const GSM7_SEGMENT: usize = 153;
const UCS2_SINGLE: usize = 70;
const UCS2_SEGMENT: usize = 67;

/// Concatenation headers address segments with a single byte.
const MAX_SEGMENTS: usize = 255;

/// Encodes `text` for `destination` as one or more SMS-SUBMIT PDUs.
///
/// Long texts are split into concatenated segments sharing one reference
/// number. Splits never fall inside a GSM escape sequence or a UTF-16
/// surrogate pair.
pub fn encode_submit(
    destination: &str,
    text: &str,
    options: &EncodeOptions,
) -> Result<Vec<EncodedSegment>, PduError> {
    let encoding = options.encoding.unwrap_or(Encoding::Gsm7);
    let address = encode_address(destination)?;

    let parts = split_text(text, encoding)?;
    if parts.len() > MAX_SEGMENTS {
        return Err(PduError::TooManyParts(parts.len()));
    }

    let concat = if parts.len() > 1 {
        Some(NEXT_REFERENCE.fetch_add(1, Ordering::Relaxed))
    } else {
        None
    };
    let total = parts.len() as u8;

    let mut segments = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let header = concat.map(|reference| [0x05, 0x00, 0x03, reference, total, i as u8 + 1]);
        segments.push(build_submit(&address, part, encoding, header.as_ref())?);
    }
    Ok(segments)
}

/// Splits text into parts that each fit one segment, counting septets or
/// UTF-16 units per character so multi-unit characters stay whole.
fn split_text(text: &str, encoding: Encoding) -> Result<Vec<String>, PduError> {
    let cost = |c: char| -> Result<usize, PduError> {
        match encoding {
            Encoding::Gsm7 => gsm7::septet_len(c).ok_or(PduError::Unrepresentable(c)),
            Encoding::Ucs2 => Ok(c.len_utf16()),
        }
    };

    let mut total = 0usize;
    for c in text.chars() {
        total += cost(c)?;
    }
    let single_limit = match encoding {
        Encoding::Gsm7 => GSM7_SINGLE,
        Encoding::Ucs2 => UCS2_SINGLE,
    };
    if total <= single_limit {
        return Ok(vec![text.to_owned()]);
    }

    let segment_limit = match encoding {
        Encoding::Gsm7 => GSM7_SEGMENT,
        Encoding::Ucs2 => UCS2_SEGMENT,
    };
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut used = 0usize;
    for c in text.chars() {
        let units = cost(c)?;
        if used + units > segment_limit {
            parts.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += units;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    Ok(parts)
}

fn build_submit(
    address: &[u8],
    text: &str,
    encoding: Encoding,
    header: Option<&[u8; 6]>,
) -> Result<EncodedSegment, PduError> {
    let mut tpdu = Vec::with_capacity(16 + text.len() * 2);
    // First octet: SMS-SUBMIT, plus the UDHI flag when a header is present.
    tpdu.push(if header.is_some() { 0x41 } else { 0x01 });
    // Message reference, assigned by the modem.
    tpdu.push(0x00);
    tpdu.extend_from_slice(address);
    // Protocol identifier.
    tpdu.push(0x00);

    match encoding {
        Encoding::Gsm7 => {
            tpdu.push(0x00);
            let septets = gsm7::to_septets(text)?;
            let (header_septets, fill) = match header {
                Some(h) => {
                    let octets = h.len();
                    let hs = (octets * 8).div_ceil(7);
                    (hs, hs * 7 - octets * 8)
                }
                None => (0, 0),
            };
            tpdu.push((header_septets + septets.len()) as u8);
            if let Some(h) = header {
                tpdu.extend_from_slice(h);
            }
            tpdu.extend_from_slice(&gsm7::pack(&septets, fill));
        }
        Encoding::Ucs2 => {
            tpdu.push(0x08);
            let mut body = Vec::with_capacity(text.len() * 2);
            for unit in text.encode_utf16() {
                body.extend_from_slice(&unit.to_be_bytes());
            }
            let header_octets = header.map_or(0, |h| h.len());
            tpdu.push((header_octets + body.len()) as u8);
            if let Some(h) = header {
                tpdu.extend_from_slice(h);
            }
            tpdu.extend_from_slice(&body);
        }
    }

    let tpdu_len = tpdu.len();
    // Empty SMSC field: use the address configured in the modem.
    let mut wire = Vec::with_capacity(tpdu_len + 1);
    wire.push(0x00);
    wire.extend_from_slice(&tpdu);
    Ok(EncodedSegment {
        hex: hex::emit(&wire),
        tpdu_len,
    })
}

/// Encodes a destination as length, type octet, and swapped-nibble BCD
/// digits. A leading `+` selects the international type.
fn encode_address(number: &str) -> Result<Vec<u8>, PduError> {
    let (ty, digits) = match number.strip_prefix('+') {
        Some(rest) => (0x91u8, rest),
        None => (0x81u8, number),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PduError::InvalidAddress(number.to_owned()));
    }

    let mut out = Vec::with_capacity(2 + digits.len().div_ceil(2));
    out.push(digits.len() as u8);
    out.push(ty);
    let bytes = digits.as_bytes();
    for pair in bytes.chunks(2) {
        let low = pair[0] - b'0';
        let high = pair.get(1).map_or(0x0F, |d| d - b'0');
        out.push((high << 4) | low);
    }
    Ok(out)
}
