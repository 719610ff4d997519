//! USM security parameters (RFC 3414 section 2.4).
//!
//! The parameters travel as a BER SEQUENCE wrapped in an OCTET STRING
//! inside the v3 message header. Authentication signs the whole message
//! with the msgAuthenticationParameters field zeroed, then splices the
//! MAC back in, so encoding reports where that field landed.

use bytes::Bytes;

use crate::ber::{Reader, Writer, length_len};
use crate::error::Result;

/// Decoded msgSecurityParameters for the User-based Security Model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UsmSecurityParams {
    pub engine_id: Bytes,
    pub engine_boots: i32,
    pub engine_time: i32,
    pub user: Bytes,
    pub auth_params: Bytes,
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    /// Parameters for an engine discovery probe: everything empty.
    pub fn discovery() -> Self {
        Self::default()
    }

    /// Encode as a SEQUENCE TLV.
    ///
    /// Returns the encoded bytes and, when authentication parameters are
    /// present, the offset of their content within the returned buffer.
    /// Adding the buffer's own position in the enclosing message gives
    /// the absolute splice point for the MAC.
    pub fn encode(&self) -> (Vec<u8>, Option<usize>) {
        let mut inner = Writer::with_capacity(64);
        inner.octet_string(&self.engine_id);
        inner.integer(i64::from(self.engine_boots));
        inner.integer(i64::from(self.engine_time));
        inner.octet_string(&self.user);
        // Auth params are at most 12 bytes, so the TLV header is 2 bytes.
        let auth_in_content = (!self.auth_params.is_empty()).then(|| inner.len() + 2);
        inner.octet_string(&self.auth_params);
        inner.octet_string(&self.priv_params);
        let content = inner.finish();

        let header_len = 1 + length_len(content.len());
        let mut w = Writer::with_capacity(header_len + content.len());
        w.primitive(crate::ber::tag::universal::SEQUENCE, &content);
        (w.finish(), auth_in_content.map(|off| header_len + off))
    }

    /// Decode from a reader positioned at the SEQUENCE.
    ///
    /// Also returns the absolute offset of the authentication parameters
    /// content (in the reader's offset frame) when present, for MAC
    /// verification against the zeroed message.
    pub fn decode(r: &mut Reader<'_>) -> Result<(Self, Option<usize>)> {
        let mut seq = r.read_sequence()?;
        let engine_id = Bytes::copy_from_slice(seq.read_octet_string()?);
        let engine_boots = seq.read_integer_i32()?;
        let engine_time = seq.read_integer_i32()?;
        let user = Bytes::copy_from_slice(seq.read_octet_string()?);
        let auth_content = seq.read_octet_string()?;
        let auth_offset =
            (!auth_content.is_empty()).then(|| seq.offset() - auth_content.len());
        let auth_params = Bytes::copy_from_slice(auth_content);
        let priv_params = Bytes::copy_from_slice(seq.read_octet_string()?);
        Ok((
            Self {
                engine_id,
                engine_boots,
                engine_time,
                user,
                auth_params,
                priv_params,
            },
            auth_offset,
        ))
    }
}
