//! BER (Basic Encoding Rules) codec for the SNMP subset the gateway speaks.
//!
//! Follows X.690 with permissive parsing aligned with net-snmp behavior:
//! definite lengths only, minimal integer forms on encode, tolerant of
//! non-minimal integers on decode.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::Reader;
pub(crate) use decode::{decode_signed, decode_unsigned};
pub use encode::Writer;
pub use length::{length_len, read_length, write_length};
