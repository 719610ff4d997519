//! Variable binding (VarBind) type.
//!
//! A VarBind pairs an OID with a value. Reply order is preserved wherever
//! lists of VarBinds travel: the protocol's error-index is positional.

use crate::ber::{Reader, Writer};
use crate::error::Result;
use crate::oid::Oid;
use crate::value::Value;

/// Variable binding - an OID-value pair. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    /// The object identifier.
    pub oid: Oid,
    /// The value.
    pub value: Value,
}

impl VarBind {
    /// Create a new VarBind.
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Create a VarBind with a NULL value (for GET/GETNEXT requests).
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: Value::Null,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, w: &mut Writer) {
        w.sequence(|w| {
            w.oid(&self.oid);
            self.value.encode(w);
        });
    }

    /// Decode from BER.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let mut seq = r.read_sequence()?;
        let oid = seq.read_oid()?;
        let value = Value::decode(&mut seq)?;
        Ok(VarBind { oid, value })
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Encode a list of VarBinds as a SEQUENCE.
pub fn encode_varbind_list(w: &mut Writer, varbinds: &[VarBind]) {
    w.sequence(|w| {
        for vb in varbinds {
            vb.encode(w);
        }
    });
}

/// Decode a SEQUENCE of VarBinds, preserving order.
pub fn decode_varbind_list(r: &mut Reader<'_>) -> Result<Vec<VarBind>> {
    let mut seq = r.read_sequence()?;
    let mut varbinds = Vec::new();
    while !seq.is_empty() {
        varbinds.push(VarBind::decode(&mut seq)?);
    }
    Ok(varbinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use bytes::Bytes;

    #[test]
    fn test_varbind_roundtrip() {
        let vb = VarBind::new(oid!(1, 3, 6, 1), Value::Integer(42));
        let mut w = Writer::new();
        vb.encode(&mut w);
        let data = w.finish();
        let mut r = Reader::new(&data);
        assert_eq!(VarBind::decode(&mut r).unwrap(), vb);
    }

    #[test]
    fn test_varbind_list_preserves_order() {
        let varbinds = vec![
            VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                Value::OctetString(Bytes::from_static(b"Linux router")),
            ),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(123_456)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 99, 0), Value::NoSuchObject),
        ];
        let mut w = Writer::new();
        encode_varbind_list(&mut w, &varbinds);
        let data = w.finish();
        let mut r = Reader::new(&data);
        let decoded = decode_varbind_list(&mut r).unwrap();
        assert_eq!(decoded, varbinds);
        assert!(decoded[2].value.is_exception());
    }

    #[test]
    fn test_varbind_list_empty() {
        let mut w = Writer::new();
        encode_varbind_list(&mut w, &[]);
        let data = w.finish();
        let mut r = Reader::new(&data);
        assert!(decode_varbind_list(&mut r).unwrap().is_empty());
    }

    #[test]
    fn test_display_matches_result_line_format() {
        let vb = VarBind::new(
            oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
            Value::OctetString(Bytes::from_static(b"myhost")),
        );
        assert_eq!(vb.to_string(), "1.3.6.1.2.1.1.5.0 = myhost");
    }
}
