//! BER length octets (X.690 8.1.3).
//!
//! Short form for lengths below 128, long form with a leading octet-count
//! byte otherwise. Indefinite lengths are rejected: SNMP uses definite
//! lengths only.

use crate::error::DecodeErrorKind;

/// Append the definite-length encoding of `len`.
pub fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Number of octets `write_length` emits for `len`.
///
/// Used to compute absolute field offsets when splicing authentication
/// parameters into an already-encoded message.
pub fn length_len(len: usize) -> usize {
    if len < 0x80 {
        1
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        1 + bytes.len() - skip
    }
}

/// Decode a length field. Returns (length, octets consumed).
pub fn read_length(data: &[u8]) -> Result<(usize, usize), DecodeErrorKind> {
    let first = *data.first().ok_or(DecodeErrorKind::TruncatedData)?;
    if first < 0x80 {
        return Ok((first as usize, 1));
    }
    if first == 0x80 {
        return Err(DecodeErrorKind::IndefiniteLength);
    }
    let octets = (first & 0x7F) as usize;
    if octets > size_of::<usize>() {
        return Err(DecodeErrorKind::InvalidLength);
    }
    if data.len() < 1 + octets {
        return Err(DecodeErrorKind::TruncatedData);
    }
    let mut len: usize = 0;
    for &byte in &data[1..1 + octets] {
        len = len << 8 | byte as usize;
    }
    Ok((len, 1 + octets))
}
