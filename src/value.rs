//! SNMP value type.
//!
//! A closed tagged union over the value types the gateway can read and
//! write, plus the SNMPv2 response-only exception markers. SET requests
//! select the variant through a string tag with a total mapping from tag to
//! conversion rule; unknown tags are rejected, never dispatched dynamically.

use bytes::Bytes;

use crate::ber::tag;
use crate::ber::{Reader, Writer, decode_signed, decode_unsigned};
use crate::error::{DecodeErrorKind, Error, Result, ValidationErrorKind};
use crate::oid::Oid;

/// An SNMP value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// INTEGER / Integer32.
    Integer(i64),
    /// OCTET STRING.
    OctetString(Bytes),
    /// NULL (used as the placeholder value in GET/GETNEXT requests).
    Null,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier(Oid),
    /// IpAddress (4 bytes).
    IpAddress([u8; 4]),
    /// Counter32.
    Counter32(u32),
    /// Gauge32 / Unsigned32.
    Gauge32(u32),
    /// TimeTicks (hundredths of a second).
    TimeTicks(u32),
    /// Opaque (uninterpreted bytes).
    Opaque(Bytes),
    /// Counter64.
    Counter64(u64),
    /// BITS pseudo-type (an OCTET STRING on the wire).
    Bits(Bytes),
    /// noSuchObject exception (responses only).
    NoSuchObject,
    /// noSuchInstance exception (responses only).
    NoSuchInstance,
    /// endOfMibView exception (responses only).
    EndOfMibView,
}

impl Value {
    /// Build a value from a string type tag and a raw value, the conversion
    /// used by SET requests.
    ///
    /// Integer-like tags parse `raw` as a base-10 integer; `IpAddress`
    /// parses a dotted quad; string-like tags pass the raw bytes through.
    /// Unknown tags fail with `UnsupportedType`, bad integer text with
    /// `InvalidValueFormat`.
    pub fn from_tagged(tag: &str, raw: &str) -> Result<Self> {
        fn int_err(tag: &'static str, raw: &str) -> Error {
            Error::validation(ValidationErrorKind::InvalidValueFormat {
                tag,
                value: raw.to_string(),
            })
        }

        match tag {
            "Integer" | "Integer32" => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| int_err("Integer", raw)),
            "Counter32" => raw
                .trim()
                .parse::<u32>()
                .map(Value::Counter32)
                .map_err(|_| int_err("Counter32", raw)),
            "Gauge32" | "Unsigned32" => raw
                .trim()
                .parse::<u32>()
                .map(Value::Gauge32)
                .map_err(|_| int_err("Gauge32", raw)),
            "TimeTicks" => raw
                .trim()
                .parse::<u32>()
                .map(Value::TimeTicks)
                .map_err(|_| int_err("TimeTicks", raw)),
            "Counter64" => raw
                .trim()
                .parse::<u64>()
                .map(Value::Counter64)
                .map_err(|_| int_err("Counter64", raw)),
            "IpAddress" => parse_dotted_quad(raw)
                .map(Value::IpAddress)
                .ok_or_else(|| int_err("IpAddress", raw)),
            "OctetString" => Ok(Value::OctetString(Bytes::copy_from_slice(raw.as_bytes()))),
            "Opaque" => Ok(Value::Opaque(Bytes::copy_from_slice(raw.as_bytes()))),
            "Bits" => Ok(Value::Bits(Bytes::copy_from_slice(raw.as_bytes()))),
            other => Err(Error::validation(ValidationErrorKind::UnsupportedType(
                other.to_string(),
            ))),
        }
    }

    /// Whether this is one of the response-only exception markers.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Encode to BER.
    pub fn encode(&self, w: &mut Writer) {
        match self {
            Value::Integer(v) => w.integer(*v),
            Value::OctetString(b) | Value::Bits(b) => w.octet_string(b),
            Value::Null => w.null(),
            Value::ObjectIdentifier(oid) => w.oid(oid),
            Value::IpAddress(addr) => w.ip_address(*addr),
            Value::Counter32(v) => w.unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => w.unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => w.unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(b) => w.primitive(tag::application::OPAQUE, b),
            Value::Counter64(v) => w.counter64(*v),
            Value::NoSuchObject => w.primitive(tag::context::NO_SUCH_OBJECT, &[]),
            Value::NoSuchInstance => w.primitive(tag::context::NO_SUCH_INSTANCE, &[]),
            Value::EndOfMibView => w.primitive(tag::context::END_OF_MIB_VIEW, &[]),
        }
    }

    /// Decode from BER.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let at = r.offset();
        let (value_tag, content) = r.read_tlv()?;
        let err = |kind| Error::decode(at, kind);
        match value_tag {
            tag::universal::INTEGER => Ok(Value::Integer(decode_signed(content).map_err(err)?)),
            tag::universal::OCTET_STRING => {
                Ok(Value::OctetString(Bytes::copy_from_slice(content)))
            }
            tag::universal::NULL => {
                if content.is_empty() {
                    Ok(Value::Null)
                } else {
                    Err(err(DecodeErrorKind::InvalidNull))
                }
            }
            tag::universal::OBJECT_IDENTIFIER => Ok(Value::ObjectIdentifier(
                Oid::from_ber(content).map_err(err)?,
            )),
            tag::application::IP_ADDRESS => {
                let addr: [u8; 4] = content.try_into().map_err(|_| {
                    err(DecodeErrorKind::InvalidIpAddressLength {
                        length: content.len(),
                    })
                })?;
                Ok(Value::IpAddress(addr))
            }
            tag::application::COUNTER32 => {
                Ok(Value::Counter32(decode_u32(content).map_err(err)?))
            }
            tag::application::GAUGE32 => Ok(Value::Gauge32(decode_u32(content).map_err(err)?)),
            tag::application::TIMETICKS => {
                Ok(Value::TimeTicks(decode_u32(content).map_err(err)?))
            }
            tag::application::OPAQUE => Ok(Value::Opaque(Bytes::copy_from_slice(content))),
            tag::application::COUNTER64 => {
                Ok(Value::Counter64(decode_unsigned(content).map_err(err)?))
            }
            tag::context::NO_SUCH_OBJECT => Ok(Value::NoSuchObject),
            tag::context::NO_SUCH_INSTANCE => Ok(Value::NoSuchInstance),
            tag::context::END_OF_MIB_VIEW => Ok(Value::EndOfMibView),
            other => Err(err(DecodeErrorKind::UnknownValueTag(other))),
        }
    }
}

fn decode_u32(content: &[u8]) -> std::result::Result<u32, DecodeErrorKind> {
    let value = decode_unsigned(content)?;
    u32::try_from(value).map_err(|_| DecodeErrorKind::IntegerOverflow)
}

fn parse_dotted_quad(raw: &str) -> Option<[u8; 4]> {
    raw.trim()
        .parse::<std::net::Ipv4Addr>()
        .ok()
        .map(|addr| addr.octets())
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::OctetString(b) | Value::Bits(b) => write_text_or_hex(f, b),
            Value::Null => Ok(()),
            Value::ObjectIdentifier(oid) => write!(f, "{oid}"),
            Value::IpAddress([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{v}"),
            Value::Opaque(b) => write_hex(f, b),
            Value::Counter64(v) => write!(f, "{v}"),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

/// Print printable UTF-8 as text, anything else as hex.
fn write_text_or_hex(f: &mut std::fmt::Formatter<'_>, bytes: &[u8]) -> std::fmt::Result {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.chars().any(|c| c.is_control() && c != '\t') => write!(f, "{s}"),
        _ => write_hex(f, bytes),
    }
}

fn write_hex(f: &mut std::fmt::Formatter<'_>, bytes: &[u8]) -> std::fmt::Result {
    write!(f, "0x")?;
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;

    #[test]
    fn test_from_tagged_integer() {
        assert_eq!(
            Value::from_tagged("Integer", "42").unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            Value::from_tagged("Integer", "-7").unwrap(),
            Value::Integer(-7)
        );
    }

    #[test]
    fn test_from_tagged_integer_rejects_text() {
        let err = Value::from_tagged("Integer", "abc").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::InvalidValueFormat { .. }
            }
        ));
    }

    #[test]
    fn test_from_tagged_unknown_tag() {
        let err = Value::from_tagged("Unknown", "42").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::UnsupportedType(_)
            }
        ));
    }

    #[test]
    fn test_from_tagged_string_passthrough() {
        assert_eq!(
            Value::from_tagged("OctetString", "hello").unwrap(),
            Value::OctetString(Bytes::from_static(b"hello"))
        );
    }

    #[test]
    fn test_from_tagged_ip_address() {
        assert_eq!(
            Value::from_tagged("IpAddress", "192.168.1.5").unwrap(),
            Value::IpAddress([192, 168, 1, 5])
        );
        assert!(Value::from_tagged("IpAddress", "999.1.1.1").is_err());
    }

    #[test]
    fn test_from_tagged_counter_ranges() {
        assert!(Value::from_tagged("Counter32", "4294967295").is_ok());
        assert!(Value::from_tagged("Counter32", "4294967296").is_err());
        assert!(Value::from_tagged("Counter64", "18446744073709551615").is_ok());
    }

    #[test]
    fn test_decode_unknown_tag_names_value_tag() {
        // 0x47 is an unassigned application tag.
        let data = [0x47, 0x01, 0x00];
        let mut r = Reader::new(&data);
        assert!(matches!(
            Value::decode(&mut r).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::UnknownValueTag(0x47),
                ..
            }
        ));
    }

    fn roundtrip(value: Value) {
        let mut w = Writer::new();
        value.encode(&mut w);
        let data = w.finish();
        let mut r = Reader::new(&data);
        assert_eq!(Value::decode(&mut r).unwrap(), value);
    }

    #[test]
    fn test_encode_decode_variants() {
        roundtrip(Value::Integer(-42));
        roundtrip(Value::OctetString(Bytes::from_static(b"myhost")));
        roundtrip(Value::Null);
        roundtrip(Value::ObjectIdentifier(crate::oid!(1, 3, 6, 1, 4)));
        roundtrip(Value::IpAddress([10, 0, 0, 1]));
        roundtrip(Value::Counter32(1000));
        roundtrip(Value::Gauge32(0x8000_0000));
        roundtrip(Value::TimeTicks(12345));
        roundtrip(Value::Opaque(Bytes::from_static(&[0x9F, 0x78])));
        roundtrip(Value::Counter64(u64::MAX));
        roundtrip(Value::NoSuchObject);
        roundtrip(Value::EndOfMibView);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(
            Value::OctetString(Bytes::from_static(b"myhost")).to_string(),
            "myhost"
        );
        assert_eq!(
            Value::OctetString(Bytes::from_static(&[0x00, 0xFF])).to_string(),
            "0x00ff"
        );
        assert_eq!(Value::IpAddress([192, 168, 1, 5]).to_string(), "192.168.1.5");
        assert_eq!(Value::TimeTicks(12345).to_string(), "12345");
        assert_eq!(Value::Null.to_string(), "");
    }
}
