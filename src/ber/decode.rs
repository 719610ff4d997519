//! BER decoding.
//!
//! Borrowing slice reader. Constructed types hand out a sub-reader scoped
//! to their contents; absolute offsets are preserved so decode errors point
//! into the original datagram.

use super::length::read_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// Borrowing BER reader over a byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Offset of `data[0]` within the original datagram.
    base: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over a full datagram.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    fn err(&self, kind: DecodeErrorKind) -> Error {
        Error::decode(self.base + self.pos, kind)
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Whether all content has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The unread remainder.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.err(DecodeErrorKind::TruncatedData))
    }

    /// Read the next TLV, returning its tag and content.
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8])> {
        let tag = self.peek_tag()?;
        let (len, len_octets) =
            read_length(&self.data[self.pos + 1..]).map_err(|kind| self.err(kind))?;
        let content_start = self.pos + 1 + len_octets;
        let content_end = content_start
            .checked_add(len)
            .ok_or_else(|| self.err(DecodeErrorKind::TlvOverflow))?;
        if content_end > self.data.len() {
            return Err(self.err(DecodeErrorKind::TlvOverflow));
        }
        let content = &self.data[content_start..content_end];
        self.pos = content_end;
        Ok((tag, content))
    }

    /// Read a TLV and require a specific tag.
    pub fn expect(&mut self, expected: u8) -> Result<&'a [u8]> {
        let at = self.offset();
        let (actual, content) = self.read_tlv()?;
        if actual != expected {
            return Err(Error::decode(
                at,
                DecodeErrorKind::UnexpectedTag { expected, actual },
            ));
        }
        Ok(content)
    }

    /// Enter a constructed type with the given tag.
    pub fn read_constructed(&mut self, expected: u8) -> Result<Reader<'a>> {
        let content = self.expect(expected)?;
        // Parent cursor now sits past the TLV, so the content base is the
        // cursor minus the content length.
        Ok(Reader {
            data: content,
            pos: 0,
            base: self.base + self.pos - content.len(),
        })
    }

    /// Enter a SEQUENCE.
    pub fn read_sequence(&mut self) -> Result<Reader<'a>> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read an INTEGER as i64.
    pub fn read_integer(&mut self) -> Result<i64> {
        let at = self.offset();
        let content = self.expect(tag::universal::INTEGER)?;
        decode_signed(content).map_err(|kind| Error::decode(at, kind))
    }

    /// Read an INTEGER and narrow to i32.
    pub fn read_integer_i32(&mut self) -> Result<i32> {
        let at = self.offset();
        let value = self.read_integer()?;
        i32::try_from(value).map_err(|_| Error::decode(at, DecodeErrorKind::IntegerOverflow))
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<&'a [u8]> {
        self.expect(tag::universal::OCTET_STRING)
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let at = self.offset();
        let content = self.expect(tag::universal::OBJECT_IDENTIFIER)?;
        Oid::from_ber(content).map_err(|kind| Error::decode(at, kind))
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let at = self.offset();
        let content = self.expect(tag::universal::NULL)?;
        if !content.is_empty() {
            return Err(Error::decode(at, DecodeErrorKind::InvalidNull));
        }
        Ok(())
    }
}

/// Decode a two's-complement signed integer of up to 8 bytes.
pub(crate) fn decode_signed(content: &[u8]) -> std::result::Result<i64, DecodeErrorKind> {
    if content.is_empty() {
        return Err(DecodeErrorKind::ZeroLengthInteger);
    }
    if content.len() > 8 {
        return Err(DecodeErrorKind::IntegerOverflow);
    }
    let mut value = if content[0] & 0x80 != 0 { -1i64 } else { 0 };
    for &byte in content {
        value = value << 8 | i64::from(byte);
    }
    Ok(value)
}

/// Decode an unsigned integer of up to 8 significant bytes (a leading zero
/// pad byte is allowed, as emitted for values with the top bit set).
pub(crate) fn decode_unsigned(content: &[u8]) -> std::result::Result<u64, DecodeErrorKind> {
    if content.is_empty() {
        return Err(DecodeErrorKind::ZeroLengthInteger);
    }
    let content = if content.len() > 1 && content[0] == 0 {
        &content[1..]
    } else {
        content
    };
    if content.len() > 8 {
        return Err(DecodeErrorKind::IntegerOverflow);
    }
    let mut value: u64 = 0;
    for &byte in content {
        value = value << 8 | u64::from(byte);
    }
    Ok(value)
}
