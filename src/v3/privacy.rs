//! USM privacy: DES-CBC (RFC 3414 section 8) and AES-128-CFB (RFC 3826).
//!
//! Both ciphers take the 16-byte localized privacy key. DES splits it
//! into 8 key bytes and 8 pre-IV bytes and zero-pads plaintext to the
//! block size; AES-CFB is a stream mode and needs no padding.

use std::sync::atomic::{AtomicU64, Ordering};

use aes::Aes128;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use cfb_mode::cipher::AsyncStreamCipher;
use des::Des;

use super::PrivProtocol;
use crate::error::{Error, Result};

type DesCbcEnc = cbc::Encryptor<Des>;
type DesCbcDec = cbc::Decryptor<Des>;
type AesCfbEnc = cfb_mode::Encryptor<Aes128>;
type AesCfbDec = cfb_mode::Decryptor<Aes128>;

/// Monotonic salt source shared by all requests on a client.
///
/// Seeded from the OS RNG so restarts do not reuse (boots, salt) pairs
/// against agents that have not rebooted.
#[derive(Debug)]
pub struct SaltCounter(AtomicU64);

impl SaltCounter {
    pub fn new() -> Result<Self> {
        let mut seed = [0u8; 8];
        getrandom::fill(&mut seed).map_err(|_| Error::EncryptionFailed {
            detail: "salt seed unavailable",
        })?;
        Ok(Self(AtomicU64::new(u64::from_be_bytes(seed))))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// An encrypted scoped PDU plus the privacy parameters that decrypt it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedPdu {
    pub ciphertext: Vec<u8>,
    /// Wire msgPrivacyParameters: 8 bytes for both DES and AES.
    pub priv_params: Vec<u8>,
}

fn des_iv(key: &[u8], salt: &[u8; 8]) -> [u8; 8] {
    let mut iv = [0u8; 8];
    for i in 0..8 {
        iv[i] = key[8 + i] ^ salt[i];
    }
    iv
}

fn aes_iv(engine_boots: i32, engine_time: i32, salt: &[u8; 8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
    iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
    iv[8..].copy_from_slice(salt);
    iv
}

/// Encrypt an encoded scoped PDU.
pub fn encrypt(
    protocol: PrivProtocol,
    key: &[u8],
    engine_boots: i32,
    engine_time: i32,
    salt: u64,
    plaintext: &[u8],
) -> Result<EncryptedPdu> {
    if key.len() < protocol.key_len() {
        return Err(Error::EncryptionFailed { detail: "priv key too short" });
    }
    match protocol {
        PrivProtocol::Des => {
            // Salt is engineBoots || local counter, and doubles as the
            // wire privacy parameters (RFC 3414 8.1.1.1).
            let mut salt_bytes = [0u8; 8];
            salt_bytes[..4].copy_from_slice(&engine_boots.to_be_bytes());
            salt_bytes[4..].copy_from_slice(&(salt as u32).to_be_bytes());
            let iv = des_iv(key, &salt_bytes);

            let mut buf = plaintext.to_vec();
            let pad = (8 - buf.len() % 8) % 8;
            buf.extend(std::iter::repeat_n(0u8, pad));
            let len = buf.len();
            let enc = DesCbcEnc::new_from_slices(&key[..8], &iv)
                .map_err(|_| Error::EncryptionFailed { detail: "des init" })?;
            enc.encrypt_padded_mut::<NoPadding>(&mut buf, len)
                .map_err(|_| Error::EncryptionFailed { detail: "des encrypt" })?;
            Ok(EncryptedPdu {
                ciphertext: buf,
                priv_params: salt_bytes.to_vec(),
            })
        }
        PrivProtocol::Aes128 => {
            let salt_bytes = salt.to_be_bytes();
            let iv = aes_iv(engine_boots, engine_time, &salt_bytes);
            let mut buf = plaintext.to_vec();
            let enc = AesCfbEnc::new_from_slices(&key[..16], &iv)
                .map_err(|_| Error::EncryptionFailed { detail: "aes init" })?;
            enc.encrypt(&mut buf);
            Ok(EncryptedPdu {
                ciphertext: buf,
                priv_params: salt_bytes.to_vec(),
            })
        }
        PrivProtocol::None => Err(Error::EncryptionFailed { detail: "no priv protocol" }),
    }
}

/// Decrypt a received scoped PDU. The result may carry DES zero padding
/// past the inner sequence; the BER reader's length fields bound it.
pub fn decrypt(
    protocol: PrivProtocol,
    key: &[u8],
    engine_boots: i32,
    engine_time: i32,
    priv_params: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if key.len() < protocol.key_len() {
        return Err(Error::DecryptionFailed { detail: "priv key too short" });
    }
    let salt: [u8; 8] = priv_params
        .try_into()
        .map_err(|_| Error::DecryptionFailed { detail: "bad privacy parameters length" })?;
    match protocol {
        PrivProtocol::Des => {
            if ciphertext.is_empty() || ciphertext.len() % 8 != 0 {
                return Err(Error::DecryptionFailed { detail: "ciphertext not block aligned" });
            }
            let iv = des_iv(key, &salt);
            let mut buf = ciphertext.to_vec();
            let dec = DesCbcDec::new_from_slices(&key[..8], &iv)
                .map_err(|_| Error::DecryptionFailed { detail: "des init" })?;
            dec.decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| Error::DecryptionFailed { detail: "des decrypt" })?;
            Ok(buf)
        }
        PrivProtocol::Aes128 => {
            let iv = aes_iv(engine_boots, engine_time, &salt);
            let mut buf = ciphertext.to_vec();
            let dec = AesCfbDec::new_from_slices(&key[..16], &iv)
                .map_err(|_| Error::DecryptionFailed { detail: "aes init" })?;
            dec.decrypt(&mut buf);
            Ok(buf)
        }
        PrivProtocol::None => Err(Error::DecryptionFailed { detail: "no priv protocol" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [
        0x52, 0x6f, 0x5e, 0xed, 0x9f, 0xcc, 0xe2, 0x6f, 0x89, 0x64, 0xc2, 0x93, 0x07, 0x87,
        0xd8, 0x2b,
    ];

    #[test]
    fn test_des_roundtrip_pads_to_block() {
        let plain = b"scoped pdu bytes"; // 16 bytes, already aligned
        let enc = encrypt(PrivProtocol::Des, &KEY, 3, 100, 42, plain).unwrap();
        assert_eq!(enc.ciphertext.len() % 8, 0);
        assert_eq!(enc.priv_params.len(), 8);
        assert_eq!(&enc.priv_params[..4], &3i32.to_be_bytes());
        let dec = decrypt(PrivProtocol::Des, &KEY, 3, 100, &enc.priv_params, &enc.ciphertext)
            .unwrap();
        assert_eq!(&dec[..plain.len()], plain);
    }

    #[test]
    fn test_des_roundtrip_unaligned_input() {
        let plain = b"odd length payload!";
        let enc = encrypt(PrivProtocol::Des, &KEY, 1, 0, 7, plain).unwrap();
        assert_eq!(enc.ciphertext.len(), 24);
        let dec =
            decrypt(PrivProtocol::Des, &KEY, 1, 0, &enc.priv_params, &enc.ciphertext).unwrap();
        assert_eq!(&dec[..plain.len()], plain);
        assert!(dec[plain.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_aes_roundtrip_preserves_length() {
        let plain = b"no padding in cfb mode";
        let enc = encrypt(PrivProtocol::Aes128, &KEY, 9, 12345, 99, plain).unwrap();
        assert_eq!(enc.ciphertext.len(), plain.len());
        assert_ne!(&enc.ciphertext[..], &plain[..]);
        let dec = decrypt(
            PrivProtocol::Aes128,
            &KEY,
            9,
            12345,
            &enc.priv_params,
            &enc.ciphertext,
        )
        .unwrap();
        assert_eq!(dec, plain);
    }

    #[test]
    fn test_aes_wrong_engine_time_garbles() {
        let plain = b"sensitive";
        let enc = encrypt(PrivProtocol::Aes128, &KEY, 9, 100, 5, plain).unwrap();
        let dec = decrypt(
            PrivProtocol::Aes128,
            &KEY,
            9,
            101,
            &enc.priv_params,
            &enc.ciphertext,
        )
        .unwrap();
        assert_ne!(dec, plain);
    }

    #[test]
    fn test_des_rejects_unaligned_ciphertext() {
        let err = decrypt(PrivProtocol::Des, &KEY, 0, 0, &[0u8; 8], &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed { .. }));
    }

    #[test]
    fn test_salt_counter_advances() {
        let counter = SaltCounter::new().unwrap();
        let a = counter.next();
        let b = counter.next();
        assert_eq!(b, a.wrapping_add(1));
    }
}
