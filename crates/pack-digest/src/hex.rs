//! Hex encoding and decoding for digest values.

use crate::DigestError;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

fn nibble(byte: u8, position: usize) -> Result<u8, DigestError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(DigestError::InvalidHex {
            position,
            character: byte as char,
        }),
    }
}

/// Encode `bytes` as a lowercase hex string.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_CHARS[(b >> 4) as usize] as char);
        out.push(HEX_CHARS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decode a hex string into `buf`. The string length must be exactly
/// `buf.len() * 2`; case is ignored.
pub fn decode(hex: &str, buf: &mut [u8]) -> Result<(), DigestError> {
    let hex = hex.as_bytes();
    if hex.len() != buf.len() * 2 {
        return Err(DigestError::InvalidHexLength {
            expected: buf.len() * 2,
            actual: hex.len(),
        });
    }
    for (i, slot) in buf.iter_mut().enumerate() {
        let hi = nibble(hex[i * 2], i * 2)?;
        let lo = nibble(hex[i * 2 + 1], i * 2 + 1)?;
        *slot = (hi << 4) | lo;
    }
    Ok(())
}

/// Whether `s` consists solely of hex digits (possibly empty).
pub fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}
