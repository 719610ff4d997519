//! USM authentication: password-to-key derivation and HMAC-96 signing
//! (RFC 3414 sections 2.6 and 6/7).

use digest::Digest;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;

use super::AuthProtocol;
use crate::error::{Error, Result};

/// Bytes of password stream hashed during key expansion (RFC 3414 A.2).
const EXPANSION_BYTES: usize = 1_048_576;

/// Truncated MAC length for both HMAC-MD5-96 and HMAC-SHA-96.
pub const MAC_LEN: usize = 12;

fn expand_password<D: Digest>(password: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    let mut buf = [0u8; 64];
    let mut index = 0usize;
    let mut remaining = EXPANSION_BYTES;
    while remaining > 0 {
        for slot in buf.iter_mut() {
            *slot = password[index % password.len()];
            index += 1;
        }
        hasher.update(buf);
        remaining -= buf.len();
    }
    hasher.finalize().to_vec()
}

fn localize<D: Digest>(ku: &[u8], engine_id: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(ku);
    hasher.update(engine_id);
    hasher.update(ku);
    hasher.finalize().to_vec()
}

/// Derive the localized key for `password` under `engine_id`.
///
/// Two-step derivation per RFC 3414 A.2: hash a 1 MiB stream of the
/// password repeated, then fold the engine id in. An empty password
/// yields an empty key (the caller treats that as no key material).
pub fn password_to_key(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    match protocol {
        AuthProtocol::Md5 => localize::<Md5>(&expand_password::<Md5>(password), engine_id),
        AuthProtocol::Sha1 => localize::<Sha1>(&expand_password::<Sha1>(password), engine_id),
        AuthProtocol::None => Vec::new(),
    }
}

fn hmac_digest(protocol: AuthProtocol, key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    match protocol {
        AuthProtocol::Md5 => {
            let mut mac = Hmac::<Md5>::new_from_slice(key)
                .map_err(|_| Error::EncryptionFailed { detail: "bad auth key length" })?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        AuthProtocol::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key)
                .map_err(|_| Error::EncryptionFailed { detail: "bad auth key length" })?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        AuthProtocol::None => Err(Error::EncryptionFailed { detail: "no auth protocol" }),
    }
}

/// Compute the 12-byte authentication parameters over `message`, which
/// must already carry zeroed authentication parameters at the signing
/// offset.
pub fn sign(protocol: AuthProtocol, key: &[u8], message: &[u8]) -> Result<[u8; MAC_LEN]> {
    let digest = hmac_digest(protocol, key, message)?;
    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&digest[..MAC_LEN]);
    Ok(mac)
}

/// Verify a received MAC against `message` (authentication parameters
/// already zeroed in place). Constant-length comparison over 12 bytes.
pub fn verify(protocol: AuthProtocol, key: &[u8], message: &[u8], received: &[u8]) -> Result<bool> {
    if received.len() != MAC_LEN {
        return Ok(false);
    }
    let expected = sign(protocol, key, message)?;
    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(received) {
        diff |= a ^ b;
    }
    Ok(diff == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 3414 A.3 vectors: password "maplesyrup", engine id
    // 00 00 00 00 00 00 00 00 00 00 00 02.
    const ENGINE_ID: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

    #[test]
    fn test_md5_key_localization_rfc_vector() {
        let key = password_to_key(AuthProtocol::Md5, b"maplesyrup", &ENGINE_ID);
        assert_eq!(
            key,
            [
                0x52, 0x6f, 0x5e, 0xed, 0x9f, 0xcc, 0xe2, 0x6f, 0x89, 0x64, 0xc2, 0x93, 0x07,
                0x87, 0xd8, 0x2b
            ]
        );
    }

    #[test]
    fn test_sha1_key_localization_rfc_vector() {
        let key = password_to_key(AuthProtocol::Sha1, b"maplesyrup", &ENGINE_ID);
        assert_eq!(
            key,
            [
                0x66, 0x95, 0xfe, 0xbc, 0x92, 0x88, 0xe3, 0x62, 0x82, 0x23, 0x5f, 0xc7, 0x15,
                0x1f, 0x12, 0x84, 0x97, 0xb3, 0x8f, 0x3f
            ]
        );
    }

    #[test]
    fn test_empty_password_yields_empty_key() {
        assert!(password_to_key(AuthProtocol::Md5, b"", &ENGINE_ID).is_empty());
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let key = password_to_key(AuthProtocol::Sha1, b"maplesyrup", &ENGINE_ID);
        let message = b"arbitrary message bytes with zeroed auth params";
        let mac = sign(AuthProtocol::Sha1, &key, message).unwrap();
        assert!(verify(AuthProtocol::Sha1, &key, message, &mac).unwrap());
        let mut tampered = mac;
        tampered[0] ^= 0xFF;
        assert!(!verify(AuthProtocol::Sha1, &key, message, &tampered).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        let key = password_to_key(AuthProtocol::Md5, b"maplesyrup", &ENGINE_ID);
        assert!(!verify(AuthProtocol::Md5, &key, b"msg", &[0u8; 11]).unwrap());
    }
}
