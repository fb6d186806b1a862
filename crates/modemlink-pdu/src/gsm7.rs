//! GSM 03.38 default alphabet: character mapping and 7-bit septet packing.

use crate::PduError;

const ESCAPE: u8 = 0x1B;

/// Basic character set, indexed by septet value.
const BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à',
];

/// Basic extension table, reached through the 0x1B escape septet.
const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

fn basic_septet(c: char) -> Option<u8> {
    BASIC
        .iter()
        .position(|&b| b == c && c != '\u{1B}')
        .map(|i| i as u8)
}

fn extension_septet(c: char) -> Option<u8> {
    EXTENSION.iter().find(|&&(_, e)| e == c).map(|&(s, _)| s)
}

fn extension_char(septet: u8) -> Option<char> {
    EXTENSION.iter().find(|&&(s, _)| s == septet).map(|&(_, c)| c)
}

/// True when the character can be written in this alphabet, with or without
/// the escape table.
pub fn is_representable(c: char) -> bool {
    basic_septet(c).is_some() || extension_septet(c).is_some()
}

/// Number of septets the character occupies, 2 for extension-table characters.
pub fn septet_len(c: char) -> Option<usize> {
    if basic_septet(c).is_some() {
        Some(1)
    } else if extension_septet(c).is_some() {
        Some(2)
    } else {
        None
    }
}

/// Converts text to unpacked septet values, inserting escapes for
/// extension-table characters.
pub fn to_septets(text: &str) -> Result<Vec<u8>, PduError> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if let Some(s) = basic_septet(c) {
            out.push(s);
        } else if let Some(s) = extension_septet(c) {
            out.push(ESCAPE);
            out.push(s);
        } else {
            return Err(PduError::Unrepresentable(c));
        }
    }
    Ok(out)
}

/// Converts unpacked septet values back to text. Unknown escape pairs decode
/// as the bare extension septet's basic character, matching common modem
/// behavior for future extension codes.
pub fn from_septets(septets: &[u8]) -> String {
    let mut out = String::with_capacity(septets.len());
    let mut iter = septets.iter().copied();
    while let Some(s) = iter.next() {
        if s == ESCAPE {
            match iter.next() {
                Some(e) => match extension_char(e) {
                    Some(c) => out.push(c),
                    None => out.push(BASIC[(e & 0x7F) as usize]),
                },
                None => break,
            }
        } else {
            out.push(BASIC[(s & 0x7F) as usize]);
        }
    }
    out
}

/// Packs septets into octets, starting at the given fill-bit offset.
///
/// Septet `i` occupies bit positions `fill + 7*i .. fill + 7*(i+1)` of the
/// output stream, least significant bit first within each octet. A non-zero
/// `fill` aligns user data to an octet boundary after a user data header.
pub fn pack(septets: &[u8], fill: usize) -> Vec<u8> {
    let total_bits = fill + septets.len() * 7;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    for (i, &septet) in septets.iter().enumerate() {
        let base = fill + i * 7;
        for j in 0..7 {
            if septet & (1 << j) != 0 {
                let pos = base + j;
                out[pos / 8] |= 1 << (pos % 8);
            }
        }
    }
    out
}

/// Unpacks `count` septets from octets, skipping `fill` leading bits.
pub fn unpack(bytes: &[u8], fill: usize, count: usize) -> Result<Vec<u8>, PduError> {
    if bytes.len() * 8 < fill + count * 7 {
        return Err(PduError::Truncated);
    }
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let base = fill + i * 7;
        let mut septet = 0u8;
        for j in 0..7 {
            let pos = base + j;
            if bytes[pos / 8] & (1 << (pos % 8)) != 0 {
                septet |= 1 << j;
            }
        }
        out.push(septet);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_packs_to_known_octets() {
        let septets = to_septets("hello").unwrap();
        assert_eq!(pack(&septets, 0), vec![0xE8, 0x32, 0x9B, 0xFD, 0x06]);
    }

    #[test]
    fn hello_unpacks_from_known_octets() {
        let septets = unpack(&[0xE8, 0x32, 0x9B, 0xFD, 0x06], 0, 5).unwrap();
        assert_eq!(from_septets(&septets), "hello");
    }

    #[test]
    fn round_trip_with_fill_bits() {
        let septets = to_septets("hello world").unwrap();
        for fill in 0..7 {
            let packed = pack(&septets, fill);
            let unpacked = unpack(&packed, fill, septets.len()).unwrap();
            assert_eq!(from_septets(&unpacked), "hello world", "fill {fill}");
        }
    }

    #[test]
    fn extension_characters_take_two_septets() {
        assert_eq!(septet_len('a'), Some(1));
        assert_eq!(septet_len('€'), Some(2));
        assert_eq!(septet_len('日'), None);

        let septets = to_septets("a€b").unwrap();
        assert_eq!(septets, vec![0x61, 0x1B, 0x65, 0x62]);
        assert_eq!(from_septets(&septets), "a€b");
    }

    #[test]
    fn unrepresentable_character_is_reported() {
        assert_eq!(to_septets("日"), Err(PduError::Unrepresentable('日')));
        assert!(!is_representable('日'));
        assert!(is_representable('ü'));
    }

    #[test]
    fn unpack_rejects_short_input() {
        assert_eq!(unpack(&[0xE8, 0x32], 0, 5), Err(PduError::Truncated));
    }

    #[test]
    fn at_sign_is_septet_zero() {
        let septets = to_septets("@").unwrap();
        assert_eq!(septets, vec![0x00]);
        assert_eq!(from_septets(&septets), "@");
    }
}
