//! secp256k1 key generation, ECDSA sign/verify, and raw (non-hashed) point
//! multiplication for ECDH-derived ECIES shared secrets.

use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use crate::error::{BmError, BmResult};

/// Generates a fresh 32-byte secp256k1 private key.
pub fn get_private() -> [u8; 32] {
    let secret = SecretKey::new(&mut OsRng);
    secret.secret_bytes()
}

/// Derives the 65-byte uncompressed public key (`0x04 || x || y`) for a private key.
pub fn get_public(private: &[u8; 32]) -> BmResult<[u8; 65]> {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(private).map_err(|e| BmError::crypto(format!("invalid private key: {}", e)))?;
    let public = PublicKey::from_secret_key(&secp, &secret);
    Ok(public.serialize_uncompressed())
}

/// Signs a message digest with ECDSA, returning a DER-encoded signature.
///
/// `msg` is hashed with SHA-256 before signing, matching the Bitmessage reference
/// client's convention for object signatures (the caller passes the plaintext region
/// to sign; this function owns the final digest step).
pub fn sign(private: &[u8; 32], msg: &[u8]) -> BmResult<Vec<u8>> {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(private).map_err(|e| BmError::crypto(format!("invalid private key: {}", e)))?;
    let digest = crate::crypto::hash::sha256(msg);
    let message = Message::from_digest(digest);
    let signature = secp.sign_ecdsa(&message, &secret);
    Ok(signature.serialize_der().to_vec())
}

/// Verifies a DER-encoded ECDSA signature against a 65-byte uncompressed public key.
pub fn verify(public: &[u8; 65], msg: &[u8], signature: &[u8]) -> BmResult<()> {
    let secp = Secp256k1::new();
    let public_key =
        PublicKey::from_slice(public).map_err(|e| BmError::crypto(format!("invalid public key: {}", e)))?;
    let signature =
        Signature::from_der(signature).map_err(|e| BmError::crypto(format!("malformed DER signature: {}", e)))?;
    let digest = crate::crypto::hash::sha256(msg);
    let message = Message::from_digest(digest);
    secp.verify_ecdsa(&message, &signature, &public_key)
        .map_err(|e| BmError::crypto(format!("signature verification failed: {}", e)))
}

/// Raw ECDH: scalar-multiplies `public` by `private` and returns the resulting point's
/// x-coordinate (32 bytes), as used to derive an ECIES shared secret.
///
/// This deliberately bypasses `secp256k1::ecdh::SharedSecret`, which hashes the point
/// before returning it; Bitmessage's ECIES derives its shared secret from the raw
/// x-coordinate instead.
pub fn ecdh_x_coordinate(private: &[u8; 32], public: &[u8; 65]) -> BmResult<[u8; 32]> {
    let secret = SecretKey::from_slice(private).map_err(|e| BmError::crypto(format!("invalid private key: {}", e)))?;
    let public_key =
        PublicKey::from_slice(public).map_err(|e| BmError::crypto(format!("invalid public key: {}", e)))?;
    let tweaked = public_key
        .mul_tweak(&Secp256k1::new(), &secret.into())
        .map_err(|e| BmError::crypto(format!("ECDH scalar multiplication failed: {}", e)))?;
    let uncompressed = tweaked.serialize_uncompressed();
    let mut x = [0u8; 32];
    x.copy_from_slice(&uncompressed[1..33]);
    Ok(x)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let private = get_private();
        let public = get_public(&private).unwrap();
        let msg = b"attack at dawn";
        let sig = sign(&private, msg).unwrap();
        verify(&public, msg, &sig).unwrap();
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let private = get_private();
        let public = get_public(&private).unwrap();
        let sig = sign(&private, b"attack at dawn").unwrap();
        assert!(verify(&public, b"retreat at dawn", &sig).is_err());
    }

    #[test]
    fn ecdh_is_symmetric() {
        let alice_priv = get_private();
        let alice_pub = get_public(&alice_priv).unwrap();
        let bob_priv = get_private();
        let bob_pub = get_public(&bob_priv).unwrap();

        let alice_secret = ecdh_x_coordinate(&alice_priv, &bob_pub).unwrap();
        let bob_secret = ecdh_x_coordinate(&bob_priv, &alice_pub).unwrap();
        assert_eq!(alice_secret, bob_secret);
    }
}
