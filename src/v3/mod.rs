//! SNMPv3 security.
//!
//! Implements the slice of the User-based Security Model (RFC 3414,
//! RFC 3826) the gateway needs: security levels, MD5/SHA-1 authentication,
//! DES-CBC and AES-128-CFB privacy, and per-request credential assembly.
//! Engine caches and time-window resynchronization are out of scope; the
//! command executor learns engine parameters with a single probe exchange.

pub mod auth;
pub mod privacy;
mod usm;

pub use privacy::SaltCounter;
pub use usm::UsmSecurityParams;

use crate::error::{Error, Result, ValidationErrorKind};

/// USM security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SecurityLevel {
    /// No authentication, no privacy.
    #[serde(rename = "noAuthNoPriv")]
    NoAuthNoPriv,
    /// Authentication, no privacy.
    #[serde(rename = "authNoPriv")]
    AuthNoPriv,
    /// Authentication and privacy.
    #[serde(rename = "authPriv")]
    AuthPriv,
}

impl SecurityLevel {
    /// Whether this level requires an authentication key.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Self::NoAuthNoPriv)
    }

    /// Whether this level requires a privacy key.
    pub fn requires_priv(self) -> bool {
        matches!(self, Self::AuthPriv)
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAuthNoPriv => write!(f, "noAuthNoPriv"),
            Self::AuthNoPriv => write!(f, "authNoPriv"),
            Self::AuthPriv => write!(f, "authPriv"),
        }
    }
}

impl std::str::FromStr for SecurityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "noAuthNoPriv" => Ok(Self::NoAuthNoPriv),
            "authNoPriv" => Ok(Self::AuthNoPriv),
            "authPriv" => Ok(Self::AuthPriv),
            other => Err(Error::validation(ValidationErrorKind::InvalidTarget(
                format!("unknown security level '{other}'"),
            ))),
        }
    }
}

/// Authentication protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    /// HMAC-MD5-96 (RFC 3414).
    Md5,
    /// HMAC-SHA-96 (RFC 3414).
    Sha1,
    /// No authentication.
    None,
}

impl AuthProtocol {
    /// Resolve a protocol name from a request.
    ///
    /// An absent name defaults to MD5 (the conventional default when an
    /// auth key is supplied); an unrecognized name falls back to the no-op
    /// protocol rather than rejecting the request. The fallback mirrors
    /// the upstream gateway behavior and can hide misconfiguration, so it
    /// is logged.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            None => Self::Md5,
            Some(s) => match s.to_ascii_uppercase().as_str() {
                "MD5" => Self::Md5,
                "SHA" | "SHA1" | "SHA-1" => Self::Sha1,
                other => {
                    tracing::debug!(protocol = other, "unknown auth protocol, using none");
                    Self::None
                }
            },
        }
    }

    /// Digest output length in bytes (also the localized key length).
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::None => 0,
        }
    }
}

impl std::fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Privacy protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivProtocol {
    /// DES-CBC (RFC 3414).
    Des,
    /// AES-128-CFB (RFC 3826).
    Aes128,
    /// No privacy.
    None,
}

impl PrivProtocol {
    /// Resolve a protocol name from a request. Same permissive policy as
    /// [`AuthProtocol::from_name`]; the default with a priv key present
    /// is DES.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            None => Self::Des,
            Some(s) => match s.to_ascii_uppercase().as_str() {
                "DES" => Self::Des,
                "AES" | "AES128" | "AES-128" => Self::Aes128,
                other => {
                    tracing::debug!(protocol = other, "unknown priv protocol, using none");
                    Self::None
                }
            },
        }
    }

    /// Localized key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Des => 16, // 8 key + 8 pre-IV
            Self::Aes128 => 16,
            Self::None => 0,
        }
    }
}

impl std::fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Des => write!(f, "DES"),
            Self::Aes128 => write!(f, "AES"),
            Self::None => write!(f, "none"),
        }
    }
}

/// A per-request security descriptor: user identity, security level, and
/// the auth/priv material needed on the wire.
///
/// Built fresh for each command invocation, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub user: String,
    pub level: SecurityLevel,
    pub auth_protocol: AuthProtocol,
    pub auth_key: Option<String>,
    pub priv_protocol: PrivProtocol,
    pub priv_key: Option<String>,
}

impl Credentials {
    /// Validate and assemble credentials from loosely-typed request input.
    ///
    /// Pure construction, no side effects. Fails with `MissingAuthKey`
    /// when the level requires authentication and no key is present, and
    /// with `MissingPrivKey` when the level is authPriv and no privacy key
    /// is present. At noAuthNoPriv any supplied keys are ignored.
    pub fn build(
        user: &str,
        level: SecurityLevel,
        auth_key: Option<&str>,
        auth_protocol: Option<&str>,
        priv_key: Option<&str>,
        priv_protocol: Option<&str>,
    ) -> Result<Self> {
        let auth_key = auth_key.filter(|k| !k.is_empty());
        let priv_key = priv_key.filter(|k| !k.is_empty());

        if level.requires_auth() && auth_key.is_none() {
            return Err(Error::validation(ValidationErrorKind::MissingAuthKey));
        }
        if level.requires_priv() && priv_key.is_none() {
            return Err(Error::validation(ValidationErrorKind::MissingPrivKey));
        }

        if level.requires_auth() {
            Ok(Self {
                user: user.to_string(),
                level,
                auth_protocol: AuthProtocol::from_name(auth_protocol),
                auth_key: auth_key.map(str::to_string),
                priv_protocol: if level.requires_priv() {
                    PrivProtocol::from_name(priv_protocol)
                } else {
                    PrivProtocol::None
                },
                priv_key: if level.requires_priv() {
                    priv_key.map(str::to_string)
                } else {
                    None
                },
            })
        } else {
            Ok(Self {
                user: user.to_string(),
                level,
                auth_protocol: AuthProtocol::None,
                auth_key: None,
                priv_protocol: PrivProtocol::None,
                priv_key: None,
            })
        }
    }

    /// The effective auth protocol on the wire: the no-op fallback means a
    /// request can carry a key and still go out unauthenticated.
    pub fn wire_auth(&self) -> AuthProtocol {
        if self.level.requires_auth() {
            self.auth_protocol
        } else {
            AuthProtocol::None
        }
    }

    /// The effective privacy protocol on the wire. Privacy is only applied
    /// when authentication is also applied (priv-without-auth is invalid).
    pub fn wire_priv(&self) -> PrivProtocol {
        if self.level.requires_priv() && self.wire_auth() != AuthProtocol::None {
            self.priv_protocol
        } else {
            PrivProtocol::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_levels_require_auth_key() {
        for level in [SecurityLevel::AuthNoPriv, SecurityLevel::AuthPriv] {
            let err =
                Credentials::build("u", level, None, Some("MD5"), Some("pk"), None).unwrap_err();
            assert!(matches!(
                err,
                Error::Validation {
                    kind: ValidationErrorKind::MissingAuthKey
                }
            ));
            // Empty string counts as absent.
            let err =
                Credentials::build("u", level, Some(""), None, Some("pk"), None).unwrap_err();
            assert!(matches!(
                err,
                Error::Validation {
                    kind: ValidationErrorKind::MissingAuthKey
                }
            ));
        }
    }

    #[test]
    fn test_auth_priv_requires_priv_key() {
        let err = Credentials::build(
            "u",
            SecurityLevel::AuthPriv,
            Some("authkey"),
            Some("SHA"),
            None,
            Some("AES"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                kind: ValidationErrorKind::MissingPrivKey
            }
        ));
    }

    #[test]
    fn test_no_auth_no_priv_ignores_keys() {
        let creds = Credentials::build(
            "u",
            SecurityLevel::NoAuthNoPriv,
            Some("authkey"),
            Some("MD5"),
            Some("privkey"),
            Some("DES"),
        )
        .unwrap();
        assert_eq!(creds.auth_protocol, AuthProtocol::None);
        assert_eq!(creds.auth_key, None);
        assert_eq!(creds.priv_key, None);
        assert_eq!(creds.wire_auth(), AuthProtocol::None);
    }

    #[test]
    fn test_unknown_protocol_names_fall_back_to_none() {
        let creds = Credentials::build(
            "u",
            SecurityLevel::AuthNoPriv,
            Some("authkey"),
            Some("SHA-512"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(creds.auth_protocol, AuthProtocol::None);
        assert_eq!(creds.wire_auth(), AuthProtocol::None);
    }

    #[test]
    fn test_default_protocols_when_names_absent() {
        let creds = Credentials::build(
            "u",
            SecurityLevel::AuthPriv,
            Some("authkey"),
            None,
            Some("privkey"),
            None,
        )
        .unwrap();
        assert_eq!(creds.auth_protocol, AuthProtocol::Md5);
        assert_eq!(creds.priv_protocol, PrivProtocol::Des);
        assert_eq!(creds.wire_priv(), PrivProtocol::Des);
    }

    #[test]
    fn test_priv_disabled_when_auth_falls_back() {
        // Unknown auth protocol at authPriv: no auth on the wire, so
        // privacy must not be applied either.
        let creds = Credentials::build(
            "u",
            SecurityLevel::AuthPriv,
            Some("authkey"),
            Some("bogus"),
            Some("privkey"),
            Some("AES"),
        )
        .unwrap();
        assert_eq!(creds.wire_auth(), AuthProtocol::None);
        assert_eq!(creds.wire_priv(), PrivProtocol::None);
    }

    #[test]
    fn test_security_level_from_str() {
        assert_eq!(
            "noAuthNoPriv".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::NoAuthNoPriv
        );
        assert_eq!(
            "authPriv".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::AuthPriv
        );
        assert!("AuthPriv".parse::<SecurityLevel>().is_err());
    }
}
