//! Error types for the gateway.
//!
//! The taxonomy mirrors how failures surface over HTTP: validation errors
//! are client errors raised before any network I/O, transport errors cover
//! timeouts and I/O or framing failures, and protocol errors carry the
//! agent's non-zero error-status together with the best-effort failing OID.

use std::net::SocketAddr;
use std::time::Duration;

/// Result type alias using the gateway's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error kinds.
///
/// These are all detectable from the request alone and map to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Security level requires authentication but no auth key was supplied.
    MissingAuthKey,
    /// authPriv requires a privacy key but none was supplied.
    MissingPrivKey,
    /// SET value type tag is not one of the recognized tags.
    UnsupportedType(String),
    /// SET raw value does not parse for an integer-like type tag.
    InvalidValueFormat { tag: &'static str, value: String },
    /// OID failed structural validation.
    InvalidOid(String),
    /// Target host did not parse as an IP address or resolvable name.
    InvalidTarget(String),
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAuthKey => {
                write!(f, "auth_key is required for authNoPriv and authPriv")
            }
            Self::MissingPrivKey => write!(f, "priv_key is required for authPriv"),
            Self::UnsupportedType(tag) => write!(f, "unsupported value type '{tag}'"),
            Self::InvalidValueFormat { tag, value } => {
                write!(f, "value '{value}' is not valid for type '{tag}'")
            }
            Self::InvalidOid(input) => write!(f, "invalid OID '{input}'"),
            Self::InvalidTarget(input) => write!(f, "invalid target address '{input}'"),
        }
    }
}

/// BER decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Expected different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Data truncated unexpectedly.
    TruncatedData,
    /// Invalid BER length encoding.
    InvalidLength,
    /// Indefinite length not supported.
    IndefiniteLength,
    /// Integer value overflow.
    IntegerOverflow,
    /// Zero-length integer.
    ZeroLengthInteger,
    /// Invalid OID encoding.
    InvalidOidEncoding,
    /// Unknown SNMP version.
    UnknownVersion(i64),
    /// Unknown PDU type.
    UnknownPduType(u8),
    /// Unknown varbind value tag.
    UnknownValueTag(u8),
    /// Missing required PDU.
    MissingPdu,
    /// Invalid msgFlags (priv without auth, or wrong length).
    InvalidMsgFlags,
    /// Unknown security model.
    UnknownSecurityModel(i64),
    /// NULL with non-zero length.
    InvalidNull,
    /// Expected plaintext scoped PDU, got encrypted.
    UnexpectedEncryption,
    /// Expected encrypted scoped PDU, got plaintext.
    ExpectedEncryption,
    /// Invalid IP address length.
    InvalidIpAddressLength { length: usize },
    /// TLV extends past end of data.
    TlvOverflow,
    /// Empty response datagram.
    EmptyResponse,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{expected:02X}, got 0x{actual:02X}")
            }
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::InvalidLength => write!(f, "invalid length encoding"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not supported"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::InvalidOidEncoding => write!(f, "invalid OID encoding"),
            Self::UnknownVersion(v) => write!(f, "unknown SNMP version: {v}"),
            Self::UnknownPduType(t) => write!(f, "unknown PDU type: 0x{t:02X}"),
            Self::UnknownValueTag(t) => write!(f, "unknown value tag: 0x{t:02X}"),
            Self::MissingPdu => write!(f, "missing PDU in message"),
            Self::InvalidMsgFlags => write!(f, "invalid msgFlags"),
            Self::UnknownSecurityModel(m) => write!(f, "unknown security model: {m}"),
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::UnexpectedEncryption => write!(f, "expected plaintext scoped PDU"),
            Self::ExpectedEncryption => write!(f, "expected encrypted scoped PDU"),
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IP address must be 4 bytes, got {length}")
            }
            Self::TlvOverflow => write!(f, "TLV extends past end of data"),
            Self::EmptyResponse => write!(f, "empty response"),
        }
    }
}

/// SNMP error status codes (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown/future error status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::WrongType => write!(f, "wrongType"),
            Self::WrongLength => write!(f, "wrongLength"),
            Self::WrongEncoding => write!(f, "wrongEncoding"),
            Self::WrongValue => write!(f, "wrongValue"),
            Self::NoCreation => write!(f, "noCreation"),
            Self::InconsistentValue => write!(f, "inconsistentValue"),
            Self::ResourceUnavailable => write!(f, "resourceUnavailable"),
            Self::CommitFailed => write!(f, "commitFailed"),
            Self::UndoFailed => write!(f, "undoFailed"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::NotWritable => write!(f, "notWritable"),
            Self::InconsistentName => write!(f, "inconsistentName"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// Gateway error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Request failed validation before any network I/O.
    #[error("{kind}")]
    Validation { kind: ValidationErrorKind },

    /// I/O error during communication.
    #[error("I/O error{}: {source}", target.map(|t| format!(" communicating with {t}")).unwrap_or_default())]
    Io {
        target: Option<SocketAddr>,
        #[source]
        source: std::io::Error,
    },

    /// Request timed out.
    #[error("timeout after {elapsed:?}{}", target.map(|t| format!(" waiting for {t}")).unwrap_or_default())]
    Timeout {
        target: Option<SocketAddr>,
        elapsed: Duration,
    },

    /// SNMP protocol error returned by the agent.
    #[error("{status} at {}", oid.as_ref().map(|o| o.to_string()).unwrap_or_else(|| "?".to_string()))]
    Protocol {
        target: Option<SocketAddr>,
        status: ErrorStatus,
        index: u32,
        oid: Option<crate::oid::Oid>,
    },

    /// BER decoding error (malformed reply encoding).
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// Response request ID doesn't match.
    #[error("request ID mismatch: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: i32, actual: i32 },

    /// Authentication failed (HMAC mismatch on a reply).
    #[error("authentication failed for reply from {}", target.map(|t| t.to_string()).unwrap_or_else(|| "?".to_string()))]
    AuthenticationFailed { target: Option<SocketAddr> },

    /// Scoped PDU encryption failed.
    #[error("encryption failed: {detail}")]
    EncryptionFailed { detail: &'static str },

    /// Scoped PDU decryption failed.
    #[error("decryption failed: {detail}")]
    DecryptionFailed { detail: &'static str },

    /// Agent returned a usmStats report instead of a response.
    #[error("agent report: {oid}")]
    Report { oid: crate::oid::Oid },
}

impl Error {
    /// Create a validation error.
    pub fn validation(kind: ValidationErrorKind) -> Self {
        Self::Validation { kind }
    }

    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Whether this error maps to an HTTP client error (400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this is a transport-level indication rather than an
    /// application-level protocol status.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Timeout { .. }
                | Self::Decode { .. }
                | Self::EncryptionFailed { .. }
                | Self::DecryptionFailed { .. }
        )
    }

    /// Get the target address if this error has one.
    pub fn target(&self) -> Option<SocketAddr> {
        match self {
            Self::Io { target, .. } => *target,
            Self::Timeout { target, .. } => *target,
            Self::Protocol { target, .. } => *target,
            Self::AuthenticationFailed { target } => *target,
            _ => None,
        }
    }
}
