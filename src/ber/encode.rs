//! BER encoding.
//!
//! Forward-writing encoder. Constructed types encode their contents into a
//! scratch writer first, then emit tag, length, and contents in order. The
//! messages this gateway emits are small and shallow, so the extra copy per
//! nesting level is cheaper than maintaining a reverse buffer.

use super::length::write_length;
use super::tag;
use crate::oid::Oid;

/// Forward-writing BER encoder.
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a writer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current encoded length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append pre-encoded bytes verbatim.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Encode a primitive TLV with the given tag and content.
    pub fn primitive(&mut self, tag: u8, content: &[u8]) {
        self.buf.push(tag);
        write_length(&mut self.buf, content.len());
        self.buf.extend_from_slice(content);
    }

    /// Encode a constructed type: the closure writes the contents.
    pub fn constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Writer),
    {
        let mut inner = Writer::with_capacity(64);
        f(&mut inner);
        self.primitive(tag, &inner.buf);
    }

    /// Encode a SEQUENCE.
    pub fn sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Writer),
    {
        self.constructed(tag::universal::SEQUENCE, f);
    }

    /// Encode an INTEGER.
    pub fn integer(&mut self, value: i64) {
        let bytes = minimal_signed(value);
        self.primitive(tag::universal::INTEGER, &bytes.0[bytes.1..]);
    }

    /// Encode an unsigned 32-bit value under an application tag
    /// (Counter32, Gauge32, TimeTicks).
    pub fn unsigned32(&mut self, tag: u8, value: u32) {
        let bytes = minimal_unsigned(u64::from(value));
        self.primitive(tag, &bytes.0[bytes.1..]);
    }

    /// Encode a Counter64.
    pub fn counter64(&mut self, value: u64) {
        let bytes = minimal_unsigned(value);
        self.primitive(tag::application::COUNTER64, &bytes.0[bytes.1..]);
    }

    /// Encode an OCTET STRING.
    pub fn octet_string(&mut self, data: &[u8]) {
        self.primitive(tag::universal::OCTET_STRING, data);
    }

    /// Encode a NULL.
    pub fn null(&mut self) {
        self.primitive(tag::universal::NULL, &[]);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn oid(&mut self, oid: &Oid) {
        self.primitive(tag::universal::OBJECT_IDENTIFIER, &oid.to_ber());
    }

    /// Encode an IpAddress.
    pub fn ip_address(&mut self, addr: [u8; 4]) {
        self.primitive(tag::application::IP_ADDRESS, &addr);
    }

    /// Finalize and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal two's-complement encoding of a signed integer.
///
/// Returns the big-endian bytes and the index of the first significant byte.
fn minimal_signed(value: i64) -> ([u8; 8], usize) {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    if value >= 0 {
        while start < 7 && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
            start += 1;
        }
    } else {
        while start < 7 && bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0 {
            start += 1;
        }
    }
    (bytes, start)
}

/// Minimal encoding of an unsigned integer, with a leading zero byte when
/// the top bit of the first significant byte is set.
fn minimal_unsigned(value: u64) -> ([u8; 9], usize) {
    let mut out = [0u8; 9];
    out[1..].copy_from_slice(&value.to_be_bytes());
    let mut start = 1;
    while start < 8 && out[start] == 0 {
        start += 1;
    }
    if out[start] & 0x80 != 0 {
        start -= 1;
    }
    (out, start)
}
