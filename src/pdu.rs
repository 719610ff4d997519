//! SNMP PDU encoding and decoding.
//!
//! All PDU types this gateway touches share the v2 shape: request-id,
//! error-status, error-index, varbind list.

use crate::ber::{Reader, Writer, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// PDU type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    GetRequest,
    GetNextRequest,
    Response,
    SetRequest,
    TrapV2,
    Report,
}

impl PduType {
    /// BER tag for this PDU type.
    pub const fn tag(self) -> u8 {
        match self {
            Self::GetRequest => tag::pdu::GET_REQUEST,
            Self::GetNextRequest => tag::pdu::GET_NEXT_REQUEST,
            Self::Response => tag::pdu::RESPONSE,
            Self::SetRequest => tag::pdu::SET_REQUEST,
            Self::TrapV2 => tag::pdu::TRAP_V2,
            Self::Report => tag::pdu::REPORT,
        }
    }

    /// Resolve a BER tag to a PDU type.
    pub const fn from_tag(value: u8) -> Option<Self> {
        match value {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::TRAP_V2 => Some(Self::TrapV2),
            tag::pdu::REPORT => Some(Self::Report),
            _ => None,
        }
    }
}

/// An SNMP PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    pub error_status: i32,
    pub error_index: i32,
    /// Bindings in wire order. Order is positional: a non-zero
    /// `error_index` is 1-based into this list.
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Create a request PDU with zero status and index.
    pub fn request(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, w: &mut Writer) {
        w.constructed(self.pdu_type.tag(), |w| {
            w.integer(i64::from(self.request_id));
            w.integer(i64::from(self.error_status));
            w.integer(i64::from(self.error_index));
            encode_varbind_list(w, &self.varbinds);
        });
    }

    /// Decode from BER, accepting any known PDU tag.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let at = r.offset();
        let pdu_tag = r.peek_tag()?;
        let pdu_type = PduType::from_tag(pdu_tag)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownPduType(pdu_tag)))?;
        let mut body = r.read_constructed(pdu_tag)?;
        let request_id = body.read_integer_i32()?;
        let error_status = body.read_integer_i32()?;
        let error_index = body.read_integer_i32()?;
        let varbinds = decode_varbind_list(&mut body)?;
        Ok(Self {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }
}
