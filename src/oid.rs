//! Object identifier type.
//!
//! OIDs are dotted sequences of unsigned integer arcs naming a value in the
//! target's object tree. The gateway treats them as opaque beyond structural
//! validation: non-empty, every component an unsigned integer.

use smallvec::SmallVec;

use crate::error::DecodeErrorKind;

/// Inline capacity for OID arcs. Most real-world OIDs fit without heap
/// allocation (sysDescr.0 has 9 arcs, typical table cells 12-14).
const INLINE_ARCS: usize = 12;

/// An object identifier: an ordered sequence of non-negative integer arcs.
///
/// Ordering is lexicographic over the arc sequence, which matches the
/// protocol's GETNEXT traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; INLINE_ARCS]>,
}

/// Error returned when parsing an OID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOidError {
    input: String,
}

impl std::fmt::Display for ParseOidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid OID '{}': expected non-empty dotted unsigned integers",
            self.input
        )
    }
}

impl std::error::Error for ParseOidError {}

impl Oid {
    /// Create an OID from a slice of arcs.
    pub fn from_arcs(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// The arcs of this OID.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Whether the OID has no arcs. Parsed OIDs are never empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Whether `prefix` is a prefix of this OID.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.len() >= prefix.arcs.len() && self.arcs[..prefix.arcs.len()] == prefix.arcs[..]
    }

    /// Encode the arcs in BER subidentifier form (X.690 8.19).
    ///
    /// The first two arcs combine into a single subidentifier; remaining
    /// arcs use base-128 with continuation bits.
    pub fn to_ber(&self) -> SmallVec<[u8; 24]> {
        let mut out = SmallVec::new();
        if self.arcs.is_empty() {
            return out;
        }
        let first = self.arcs[0].min(2) * 40 + self.arcs.get(1).copied().unwrap_or(0);
        push_subidentifier(&mut out, first);
        for &arc in self.arcs.iter().skip(2) {
            push_subidentifier(&mut out, arc);
        }
        out
    }

    /// Decode from BER subidentifier form.
    pub fn from_ber(data: &[u8]) -> Result<Self, DecodeErrorKind> {
        if data.is_empty() {
            return Err(DecodeErrorKind::InvalidOidEncoding);
        }
        let mut arcs: SmallVec<[u32; INLINE_ARCS]> = SmallVec::new();
        let mut iter = data.iter().peekable();
        let mut first = true;
        while iter.peek().is_some() {
            let mut value: u32 = 0;
            loop {
                let byte = *iter.next().ok_or(DecodeErrorKind::InvalidOidEncoding)?;
                value = value
                    .checked_mul(128)
                    .ok_or(DecodeErrorKind::IntegerOverflow)?
                    .checked_add(u32::from(byte & 0x7F))
                    .ok_or(DecodeErrorKind::IntegerOverflow)?;
                if byte & 0x80 == 0 {
                    break;
                }
            }
            if first {
                first = false;
                if value < 80 {
                    arcs.push(value / 40);
                    arcs.push(value % 40);
                } else {
                    arcs.push(2);
                    arcs.push(value - 80);
                }
            } else {
                arcs.push(value);
            }
        }
        Ok(Self { arcs })
    }
}

fn push_subidentifier(out: &mut SmallVec<[u8; 24]>, value: u32) {
    if value < 0x80 {
        out.push(value as u8);
        return;
    }
    let mut chunks = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    while v > 0 {
        chunks[n] = (v & 0x7F) as u8;
        v >>= 7;
        n += 1;
    }
    for i in (0..n).rev() {
        let cont = if i == 0 { 0 } else { 0x80 };
        out.push(chunks[i] | cont);
    }
}

impl std::str::FromStr for Oid {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(ParseOidError {
                input: s.to_string(),
            });
        }
        let mut arcs: SmallVec<[u32; INLINE_ARCS]> = SmallVec::new();
        for part in trimmed.split('.') {
            let arc = part.parse::<u32>().map_err(|_| ParseOidError {
                input: s.to_string(),
            })?;
            arcs.push(arc);
        }
        Ok(Self { arcs })
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

/// Construct an [`Oid`] from literal arcs.
///
/// ```
/// use snmp_gateway::oid;
/// let sys_name = oid!(1, 3, 6, 1, 2, 1, 1, 5, 0);
/// assert_eq!(sys_name.to_string(), "1.3.6.1.2.1.1.5.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),+ $(,)?) => {
        $crate::oid::Oid::from_arcs(&[$($arc),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let oid: Oid = "1.3.6.1.2.1.1.5.0".parse().unwrap();
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.5.0");
        assert_eq!(oid.len(), 9);
    }

    #[test]
    fn test_parse_leading_dot() {
        let oid: Oid = ".1.3.6.1".parse().unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("".parse::<Oid>().is_err());
        assert!("   ".parse::<Oid>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!("1.3.6.x".parse::<Oid>().is_err());
        assert!("1..3".parse::<Oid>().is_err());
        assert!("1.-3.6".parse::<Oid>().is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(oid!(1, 3, 6, 1) < oid!(1, 3, 6, 1, 0));
        assert!(oid!(1, 3, 6, 1, 2) < oid!(1, 3, 6, 2));
        assert!(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0) > oid!(1, 3, 6, 1, 2, 1, 1, 4, 0));
    }

    #[test]
    fn test_ber_roundtrip() {
        let oid = oid!(1, 3, 6, 1, 4, 1, 9999, 1, 128, 0);
        let ber = oid.to_ber();
        let decoded = Oid::from_ber(&ber).unwrap();
        assert_eq!(oid, decoded);
    }

    #[test]
    fn test_ber_first_pair_packing() {
        // 1.3 encodes to the single subidentifier 0x2B.
        assert_eq!(&oid!(1, 3).to_ber()[..], &[0x2B]);
        // Arc 2.100 crosses the 80 boundary.
        let decoded = Oid::from_ber(&oid!(2, 100).to_ber()).unwrap();
        assert_eq!(decoded, oid!(2, 100));
    }

    #[test]
    fn test_large_arc() {
        let oid = oid!(1, 3, 6, 1, 4, 1, u32::MAX);
        let decoded = Oid::from_ber(&oid.to_ber()).unwrap();
        assert_eq!(oid, decoded);
    }

    #[test]
    fn test_starts_with() {
        let base = oid!(1, 3, 6, 1, 2, 1);
        assert!(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0).starts_with(&base));
        assert!(!oid!(1, 3, 6, 2).starts_with(&base));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_arcs() -> impl Strategy<Value = Vec<u32>> {
            // First two arcs are range-limited by the X.690 packing rule.
            (0u32..=2, 0u32..40, proptest::collection::vec(any::<u32>(), 0..12)).prop_map(
                |(first, second, rest)| {
                    let mut arcs = vec![first, second];
                    arcs.extend(rest);
                    arcs
                },
            )
        }

        proptest! {
            #[test]
            fn ber_roundtrip(arcs in arbitrary_arcs()) {
                let oid = Oid::from_arcs(&arcs);
                let decoded = Oid::from_ber(&oid.to_ber()).unwrap();
                prop_assert_eq!(decoded, oid);
            }

            #[test]
            fn display_parse_roundtrip(arcs in proptest::collection::vec(any::<u32>(), 1..16)) {
                let oid = Oid::from_arcs(&arcs);
                let parsed: Oid = oid.to_string().parse().unwrap();
                prop_assert_eq!(parsed, oid);
            }
        }
    }
}
