//! The ECIES envelope used to encrypt `pubkey` v4, `msg` and `broadcast` payloads:
//! `IV(16) ‖ ephemeralPublicKey(65) ‖ ciphertext ‖ HMAC-SHA256(32)`.
//!
//! Shared secret derivation: `SHA512(ECDH(ephemeral_private, recipient_public).x)`,
//! split into a 32-byte AES-256-CBC key and a 32-byte HMAC-SHA256 key.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::crypto::ecc;
use crate::crypto::hash::sha512;
use crate::error::{BmError, BmResult};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;
const PUBKEY_LEN: usize = 65;
const MAC_LEN: usize = 32;

struct DerivedKeys {
    aes_key: [u8; 32],
    mac_key: [u8; 32],
}

fn derive_keys(shared_x: &[u8; 32]) -> DerivedKeys {
    let digest = sha512(shared_x);
    let mut aes_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    aes_key.copy_from_slice(&digest[0..32]);
    mac_key.copy_from_slice(&digest[32..64]);
    DerivedKeys { aes_key, mac_key }
}

fn hmac_tag(mac_key: &[u8; 32], data: &[u8]) -> BmResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(mac_key).map_err(|e| BmError::crypto(format!("invalid HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Encrypts `plain` to `recipient_public` (a 65-byte uncompressed secp256k1 point),
/// returning the full ECIES envelope.
pub fn encrypt(recipient_public: &[u8; 65], plain: &[u8]) -> BmResult<Vec<u8>> {
    let ephemeral_private = ecc::get_private();
    let ephemeral_public = ecc::get_public(&ephemeral_private)?;

    let shared_x = ecc::ecdh_x_coordinate(&ephemeral_private, recipient_public)?;
    let keys = derive_keys(&shared_x);

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(&keys.aes_key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plain);

    let mut envelope = Vec::with_capacity(IV_LEN + PUBKEY_LEN + ciphertext.len() + MAC_LEN);
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&ephemeral_public);
    envelope.extend_from_slice(&ciphertext);

    let mac = hmac_tag(&keys.mac_key, &envelope)?;
    envelope.extend_from_slice(&mac);

    Ok(envelope)
}

/// Decrypts an ECIES envelope with `recipient_private`, verifying its HMAC tag first.
pub fn decrypt(recipient_private: &[u8; 32], envelope: &[u8]) -> BmResult<Vec<u8>> {
    if envelope.len() < IV_LEN + PUBKEY_LEN + MAC_LEN {
        return Err(BmError::crypto("ECIES envelope too short"));
    }

    let iv = &envelope[0..IV_LEN];
    let ephemeral_public_slice = &envelope[IV_LEN..IV_LEN + PUBKEY_LEN];
    let ciphertext = &envelope[IV_LEN + PUBKEY_LEN..envelope.len() - MAC_LEN];
    let received_mac = &envelope[envelope.len() - MAC_LEN..];

    let mut ephemeral_public = [0u8; PUBKEY_LEN];
    ephemeral_public.copy_from_slice(ephemeral_public_slice);

    let shared_x = ecc::ecdh_x_coordinate(recipient_private, &ephemeral_public)?;
    let keys = derive_keys(&shared_x);

    let expected_mac = hmac_tag(&keys.mac_key, &envelope[..envelope.len() - MAC_LEN])?;
    if !constant_time_eq(&expected_mac, received_mac) {
        return Err(BmError::crypto("ECIES MAC verification failed"));
    }

    let mut iv_arr = [0u8; IV_LEN];
    iv_arr.copy_from_slice(iv);

    Aes256CbcDec::new(&keys.aes_key.into(), &iv_arr.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| BmError::crypto(format!("ECIES padding/decrypt failed: {}", e)))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let private = ecc::get_private();
        let public = ecc::get_public(&private).unwrap();

        let plain = b"Subject:Тема\nBody:Сообщение".to_vec();
        let envelope = encrypt(&public, &plain).unwrap();
        let decrypted = decrypt(&private, &envelope).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let private = ecc::get_private();
        let public = ecc::get_public(&private).unwrap();
        let other_private = ecc::get_private();

        let envelope = encrypt(&public, b"hello").unwrap();
        assert!(decrypt(&other_private, &envelope).is_err());
    }

    #[test]
    fn decrypt_rejects_tampered_envelope() {
        let private = ecc::get_private();
        let public = ecc::get_public(&private).unwrap();
        let mut envelope = encrypt(&public, b"hello").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;
        assert!(decrypt(&private, &envelope).is_err());
    }
}
