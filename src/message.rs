//! SNMP message framing.
//!
//! Covers the SNMPv3 global header with USM security parameters (RFC 3412)
//! for commands, and the v2c community wrapper for received traps.

use bytes::Bytes;

use crate::ber::{Reader, Writer, length_len, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::{Pdu, PduType};
use crate::v3::UsmSecurityParams;

/// msgFlags: message is authenticated.
pub const FLAG_AUTH: u8 = 0x01;
/// msgFlags: scoped PDU is encrypted.
pub const FLAG_PRIV: u8 = 0x02;
/// msgFlags: sender expects a response or report.
pub const FLAG_REPORTABLE: u8 = 0x04;

/// msgSecurityModel for USM.
const USM_MODEL: i64 = 3;

const VERSION_3: i64 = 3;
const VERSION_2C: i64 = 1;

/// msgMaxSize advertised in outgoing messages: the largest UDP payload.
pub const MAX_MESSAGE_SIZE: i64 = 65507;

/// Scoped PDU: context identification plus the PDU itself (RFC 3412 6.8).
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedPdu {
    pub context_engine_id: Bytes,
    pub context_name: Bytes,
    pub pdu: Pdu,
}

impl ScopedPdu {
    /// Wrap a PDU in the default (empty-named) context of an engine.
    pub fn new(context_engine_id: Bytes, pdu: Pdu) -> Self {
        Self {
            context_engine_id,
            context_name: Bytes::new(),
            pdu,
        }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.sequence(|w| {
            w.octet_string(&self.context_engine_id);
            w.octet_string(&self.context_name);
            self.pdu.encode(w);
        });
    }

    /// Encode standalone, as needed before encryption.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.finish()
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let mut seq = r.read_sequence()?;
        let context_engine_id = Bytes::copy_from_slice(seq.read_octet_string()?);
        let context_name = Bytes::copy_from_slice(seq.read_octet_string()?);
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Self {
            context_engine_id,
            context_name,
            pdu,
        })
    }
}

/// The msgData portion of a v3 message.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopedPduData {
    Plain(ScopedPdu),
    /// Ciphertext of an encrypted scoped PDU.
    Encrypted(Vec<u8>),
}

/// A decoded SNMPv3 message.
#[derive(Debug, Clone, PartialEq)]
pub struct V3Message {
    pub msg_id: i32,
    pub flags: u8,
    pub security: UsmSecurityParams,
    pub data: ScopedPduData,
    /// Absolute offset of the 12-byte authentication parameters within the
    /// original datagram, when the message carries them.
    pub auth_params_offset: Option<usize>,
}

impl V3Message {
    pub fn is_authenticated(&self) -> bool {
        self.flags & FLAG_AUTH != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_PRIV != 0
    }
}

/// Encode a complete v3 message.
///
/// Returns the datagram and, when the security parameters carry a MAC
/// placeholder, the absolute offset of that field so the caller can zero
/// it, sign, and splice the real MAC in.
pub fn encode_v3(
    msg_id: i32,
    flags: u8,
    security: &UsmSecurityParams,
    data: &ScopedPduData,
) -> (Vec<u8>, Option<usize>) {
    let mut global = Writer::with_capacity(24);
    global.sequence(|w| {
        w.integer(i64::from(msg_id));
        w.integer(MAX_MESSAGE_SIZE);
        w.octet_string(&[flags]);
        w.integer(USM_MODEL);
    });
    let global = global.finish();

    let (usm, usm_auth_offset) = security.encode();

    let mut body = Writer::with_capacity(64);
    match data {
        ScopedPduData::Plain(scoped) => scoped.encode(&mut body),
        ScopedPduData::Encrypted(ciphertext) => body.octet_string(ciphertext),
    }
    let body = body.finish();

    // version INTEGER is always 3 bytes (02 01 03).
    let version_len = 3;
    let secparams_header = 1 + length_len(usm.len());
    let content_len = version_len + global.len() + secparams_header + usm.len() + body.len();

    let mut w = Writer::with_capacity(content_len + 4);
    w.constructed(tag::universal::SEQUENCE, |w| {
        w.integer(VERSION_3);
        w.raw(&global);
        w.constructed(tag::universal::OCTET_STRING, |w| w.raw(&usm));
        w.raw(&body);
    });
    let datagram = w.finish();

    let auth_offset = usm_auth_offset.map(|off| {
        // Outer header, then version and global header, then the OCTET
        // STRING header around the security parameters.
        (1 + length_len(content_len)) + version_len + global.len() + secparams_header + off
    });
    (datagram, auth_offset)
}

/// Decode a v3 datagram down to its scoped PDU data, leaving decryption
/// and MAC verification to the caller.
pub fn decode_v3(data: &[u8]) -> Result<V3Message> {
    let mut r = Reader::new(data);
    let mut msg = r.read_sequence()?;

    let at = msg.offset();
    let version = msg.read_integer()?;
    if version != VERSION_3 {
        return Err(Error::decode(at, DecodeErrorKind::UnknownVersion(version)));
    }

    let mut global = msg.read_sequence()?;
    let msg_id = global.read_integer_i32()?;
    let _max_size = global.read_integer()?;
    let flags_at = global.offset();
    let flags_content = global.read_octet_string()?;
    let &[flags] = flags_content else {
        return Err(Error::decode(flags_at, DecodeErrorKind::InvalidMsgFlags));
    };
    let model_at = global.offset();
    let model = global.read_integer()?;
    if model != USM_MODEL {
        return Err(Error::decode(
            model_at,
            DecodeErrorKind::UnknownSecurityModel(model),
        ));
    }

    let mut secparams = msg.read_constructed(tag::universal::OCTET_STRING)?;
    let (security, auth_params_offset) = UsmSecurityParams::decode(&mut secparams)?;

    let data_at = msg.offset();
    let data_tag = msg.peek_tag()?;
    let data = if flags & FLAG_PRIV != 0 {
        if data_tag != tag::universal::OCTET_STRING {
            return Err(Error::decode(data_at, DecodeErrorKind::ExpectedEncryption));
        }
        ScopedPduData::Encrypted(msg.read_octet_string()?.to_vec())
    } else {
        if data_tag == tag::universal::OCTET_STRING {
            return Err(Error::decode(data_at, DecodeErrorKind::UnexpectedEncryption));
        }
        ScopedPduData::Plain(ScopedPdu::decode(&mut msg)?)
    };

    Ok(V3Message {
        msg_id,
        flags,
        security,
        data,
        auth_params_offset,
    })
}

/// Build an engine discovery probe: reportable, unauthenticated, empty
/// engine id and user, empty GET (RFC 3414 4).
pub fn encode_discovery(msg_id: i32, request_id: i32) -> Vec<u8> {
    let scoped = ScopedPdu::new(Bytes::new(), Pdu::request(PduType::GetRequest, request_id, vec![]));
    let (datagram, _) = encode_v3(
        msg_id,
        FLAG_REPORTABLE,
        &UsmSecurityParams::discovery(),
        &ScopedPduData::Plain(scoped),
    );
    datagram
}

/// A decoded v2c message, as received from trap senders.
#[derive(Debug, Clone, PartialEq)]
pub struct V2cMessage {
    pub community: Bytes,
    pub pdu: Pdu,
}

/// Decode a community-string datagram (SNMPv2c).
pub fn decode_v2c(data: &[u8]) -> Result<V2cMessage> {
    let mut r = Reader::new(data);
    let mut msg = r.read_sequence()?;
    let at = msg.offset();
    let version = msg.read_integer()?;
    if version != VERSION_2C {
        return Err(Error::decode(at, DecodeErrorKind::UnknownVersion(version)));
    }
    let community = Bytes::copy_from_slice(msg.read_octet_string()?);
    let pdu = Pdu::decode(&mut msg)?;
    Ok(V2cMessage { community, pdu })
}
