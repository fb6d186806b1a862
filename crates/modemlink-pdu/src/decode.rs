//! TPDU decoding for messages read out of modem storage.

use chrono::{FixedOffset, NaiveDate};

use crate::gsm7;
use crate::hex;
use crate::{PduError, PduTimestamp};

/// Kind of TPDU, from the message type indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Incoming message (SMS-DELIVER).
    Deliver,
    /// Outgoing message as stored by the modem (SMS-SUBMIT).
    Submit,
    /// Delivery report for a previously sent message (SMS-STATUS-REPORT).
    StatusReport,
}

/// Concatenation metadata from a user data header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Reference shared by all segments of one message.
    pub reference: u16,
    /// 1-based position of this segment.
    pub sequence: u8,
    /// Total number of segments.
    pub total: u8,
}

/// One decoded TPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Peer address: originator for DELIVER and STATUS-REPORT, destination
    /// for SUBMIT. International numbers carry a leading `+`.
    pub sender: String,
    /// Service centre timestamp, when the TPDU carries one.
    pub timestamp: Option<PduTimestamp>,
    /// Decoded user data text. Empty for status reports.
    pub text: String,
    pub kind: MessageKind,
    /// Present only when the message is one segment of a concatenated SMS.
    pub segment: Option<SegmentInfo>,
}

/// Decodes a hex PDU as stored by the modem: SMSC address followed by the
/// TPDU.
pub fn decode(pdu_hex: &str) -> Result<DecodedMessage, PduError> {
    let bytes = hex::parse(pdu_hex)?;
    let mut r = Reader::new(&bytes);

    // SMSC address: length in octets, then type and digits. Not needed here.
    let smsc_len = r.take_u8()? as usize;
    r.skip(smsc_len)?;

    let first = r.take_u8()?;
    let has_udh = first & 0x40 != 0;
    match first & 0x03 {
        0x00 => decode_deliver(&mut r, has_udh),
        0x01 => decode_submit(&mut r, first, has_udh),
        0x02 => decode_status_report(&mut r),
        other => Err(PduError::UnsupportedMessageType(other)),
    }
}

fn decode_deliver(r: &mut Reader<'_>, has_udh: bool) -> Result<DecodedMessage, PduError> {
    let sender = decode_address(r)?;
    let _pid = r.take_u8()?;
    let dcs = r.take_u8()?;
    let timestamp = decode_timestamp(r)?;
    let (text, segment) = decode_user_data(r, dcs, has_udh)?;
    Ok(DecodedMessage {
        sender,
        timestamp,
        text,
        kind: MessageKind::Deliver,
        segment,
    })
}

fn decode_submit(r: &mut Reader<'_>, first: u8, has_udh: bool) -> Result<DecodedMessage, PduError> {
    let _reference = r.take_u8()?;
    let dest = decode_address(r)?;
    let _pid = r.take_u8()?;
    let dcs = r.take_u8()?;
    // Validity period, sized by the VPF bits of the first octet.
    match first & 0x18 {
        0x00 => {}
        0x10 => r.skip(1)?,
        _ => r.skip(7)?,
    }
    let (text, segment) = decode_user_data(r, dcs, has_udh)?;
    Ok(DecodedMessage {
        sender: dest,
        timestamp: None,
        text,
        kind: MessageKind::Submit,
        segment,
    })
}

fn decode_status_report(r: &mut Reader<'_>) -> Result<DecodedMessage, PduError> {
    let _reference = r.take_u8()?;
    let recipient = decode_address(r)?;
    let timestamp = decode_timestamp(r)?;
    // Discharge time and status follow; neither carries text.
    r.skip(7)?;
    let _status = r.take_u8()?;
    Ok(DecodedMessage {
        sender: recipient,
        timestamp,
        text: String::new(),
        kind: MessageKind::StatusReport,
        segment: None,
    })
}

const TYPE_INTERNATIONAL: u8 = 0x10;
const TYPE_ALPHANUMERIC: u8 = 0x50;

fn decode_address(r: &mut Reader<'_>) -> Result<String, PduError> {
    let semi_octets = r.take_u8()? as usize;
    let ty = r.take_u8()?;
    let byte_len = semi_octets.div_ceil(2);
    let raw = r.take(byte_len)?;

    if ty & 0x70 == TYPE_ALPHANUMERIC {
        let septets = semi_octets * 4 / 7;
        let unpacked = gsm7::unpack(raw, 0, septets)?;
        return Ok(gsm7::from_septets(&unpacked));
    }

    let mut digits = String::with_capacity(semi_octets);
    for &b in raw {
        for nibble in [b & 0x0F, b >> 4] {
            if nibble == 0x0F {
                continue;
            }
            match char::from_digit(nibble as u32, 16) {
                Some(c) => digits.push(c.to_ascii_uppercase()),
                None => return Err(PduError::InvalidAddress(format!("nibble {nibble:#x}"))),
            }
        }
    }
    if ty & 0x70 == TYPE_INTERNATIONAL {
        Ok(format!("+{digits}"))
    } else {
        Ok(digits)
    }
}

/// Swapped-nibble BCD byte to its decimal value.
fn bcd(b: u8) -> u32 {
    ((b & 0x0F) as u32) * 10 + (b >> 4) as u32
}

/// Seven-octet service centre timestamp. An out-of-range date or offset
/// yields `None` rather than failing the whole message.
fn decode_timestamp(r: &mut Reader<'_>) -> Result<Option<PduTimestamp>, PduError> {
    let raw = r.take(7)?;
    let year = bcd(raw[0]);
    let year = if year >= 70 { 1900 + year } else { 2000 + year };

    // Bit 3 of the first time zone semi-octet is the sign; the rest is the
    // offset in quarter hours.
    let tz = raw[6];
    let quarters = (((tz & 0x07) as i32) * 10 + (tz >> 4) as i32) * 900;
    let offset_secs = if tz & 0x08 != 0 { -quarters } else { quarters };

    let Some(offset) = FixedOffset::east_opt(offset_secs) else {
        return Ok(None);
    };
    let timestamp = NaiveDate::from_ymd_opt(year as i32, bcd(raw[1]), bcd(raw[2]))
        .and_then(|d| d.and_hms_opt(bcd(raw[3]), bcd(raw[4]), bcd(raw[5])))
        .and_then(|dt| dt.and_local_timezone(offset).single());
    Ok(timestamp)
}

fn decode_user_data(
    r: &mut Reader<'_>,
    dcs: u8,
    has_udh: bool,
) -> Result<(String, Option<SegmentInfo>), PduError> {
    let udl = r.take_u8()? as usize;
    let ud = r.rest();

    let mut segment = None;
    let header_octets = if has_udh {
        let udhl = *ud.first().ok_or(PduError::Truncated)? as usize;
        let header = ud.get(1..1 + udhl).ok_or(PduError::Truncated)?;
        segment = parse_concat_header(header);
        1 + udhl
    } else {
        0
    };

    let text = match alphabet(dcs)? {
        Alphabet::Gsm7 => {
            let header_septets = (header_octets * 8).div_ceil(7);
            let fill = header_septets * 7 - header_octets * 8;
            let count = udl.checked_sub(header_septets).ok_or(PduError::Truncated)?;
            let body = ud.get(header_octets..).ok_or(PduError::Truncated)?;
            let septets = gsm7::unpack(body, fill, count)?;
            gsm7::from_septets(&septets)
        }
        Alphabet::Ucs2 => {
            let body = ud.get(header_octets..udl).ok_or(PduError::Truncated)?;
            if body.len() % 2 != 0 {
                return Err(PduError::InvalidUcs2);
            }
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .map_err(|_| PduError::InvalidUcs2)?
        }
    };
    Ok((text, segment))
}

/// Scans header information elements for a concatenation element, either the
/// 8-bit (0x00) or 16-bit (0x08) reference form. Other elements are skipped.
fn parse_concat_header(header: &[u8]) -> Option<SegmentInfo> {
    let mut rest = header;
    while let [id, len, tail @ ..] = rest {
        let data = tail.get(..*len as usize)?;
        match (*id, data) {
            (0x00, [reference, total, sequence]) => {
                return Some(SegmentInfo {
                    reference: *reference as u16,
                    total: *total,
                    sequence: *sequence,
                });
            }
            (0x08, [hi, lo, total, sequence]) => {
                return Some(SegmentInfo {
                    reference: u16::from_be_bytes([*hi, *lo]),
                    total: *total,
                    sequence: *sequence,
                });
            }
            _ => {}
        }
        rest = &tail[*len as usize..];
    }
    None
}

enum Alphabet {
    Gsm7,
    Ucs2,
}

fn alphabet(dcs: u8) -> Result<Alphabet, PduError> {
    match dcs & 0xF0 {
        // General data coding group.
        0x00 | 0x10 | 0x20 | 0x30 => match (dcs >> 2) & 0x03 {
            0 => Ok(Alphabet::Gsm7),
            2 => Ok(Alphabet::Ucs2),
            _ => Err(PduError::UnsupportedDcs(dcs)),
        },
        // Message class group, bit 2 picks 8-bit data over the default alphabet.
        0xF0 if dcs & 0x04 == 0 => Ok(Alphabet::Gsm7),
        _ => Err(PduError::UnsupportedDcs(dcs)),
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take_u8(&mut self) -> Result<u8, PduError> {
        let b = *self.bytes.get(self.pos).ok_or(PduError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PduError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or(PduError::Truncated)?;
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), PduError> {
        self.take(n).map(|_| ())
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}
