//! The crypto façade: a narrow, object-safe trait every other component consumes, plus
//! one concrete implementation (`DefaultCrypto`) backed by `sha1`/`sha2`/`ripemd`,
//! `secp256k1`, and an AES-256-CBC + HMAC-SHA256 ECIES stack. A caller embedding this
//! library (e.g. behind an HSM, or inside a WASM host with native crypto bindings) can
//! swap in their own `CryptoProvider` instead.

pub mod ecc;
pub mod ecies;
pub mod hash;

use crate::error::BmResult;

/// Abstract crypto collaborator: SHA/RIPEMD hashing, secp256k1 key derivation and
/// signing, and ECIES-style encrypt/decrypt, kept narrow enough for an embedder to
/// swap in its own implementation.
pub trait CryptoProvider {
    fn sha1(&self, input: &[u8]) -> [u8; 20];
    fn sha256(&self, input: &[u8]) -> [u8; 32];
    fn sha512(&self, input: &[u8]) -> [u8; 64];
    fn ripemd160(&self, input: &[u8]) -> [u8; 20];

    fn random_bytes(&self, n: usize) -> Vec<u8>;

    fn get_private(&self) -> [u8; 32];
    fn get_public(&self, private: &[u8; 32]) -> BmResult<[u8; 65]>;

    fn sign(&self, private: &[u8; 32], msg: &[u8]) -> BmResult<Vec<u8>>;
    fn verify(&self, public: &[u8; 65], msg: &[u8], signature: &[u8]) -> BmResult<()>;

    fn encrypt(&self, public: &[u8; 65], plain: &[u8]) -> BmResult<Vec<u8>>;
    fn decrypt(&self, private: &[u8; 32], envelope: &[u8]) -> BmResult<Vec<u8>>;
}

/// The crate's default `CryptoProvider`, used unless a caller supplies its own.
#[derive(Default, Clone, Copy)]
pub struct DefaultCrypto;

impl CryptoProvider for DefaultCrypto {
    fn sha1(&self, input: &[u8]) -> [u8; 20] {
        hash::sha1(input)
    }

    fn sha256(&self, input: &[u8]) -> [u8; 32] {
        hash::sha256(input)
    }

    fn sha512(&self, input: &[u8]) -> [u8; 64] {
        hash::sha512(input)
    }

    fn ripemd160(&self, input: &[u8]) -> [u8; 20] {
        hash::ripemd160(input)
    }

    fn random_bytes(&self, n: usize) -> Vec<u8> {
        use rand::RngCore;
        let mut buf = vec![0u8; n];
        rand::thread_rng().fill_bytes(&mut buf);
        buf
    }

    fn get_private(&self) -> [u8; 32] {
        ecc::get_private()
    }

    fn get_public(&self, private: &[u8; 32]) -> BmResult<[u8; 65]> {
        ecc::get_public(private)
    }

    fn sign(&self, private: &[u8; 32], msg: &[u8]) -> BmResult<Vec<u8>> {
        ecc::sign(private, msg)
    }

    fn verify(&self, public: &[u8; 65], msg: &[u8], signature: &[u8]) -> BmResult<()> {
        ecc::verify(public, msg, signature)
    }

    fn encrypt(&self, public: &[u8; 65], plain: &[u8]) -> BmResult<Vec<u8>> {
        ecies::encrypt(public, plain)
    }

    fn decrypt(&self, private: &[u8; 32], envelope: &[u8]) -> BmResult<Vec<u8>> {
        ecies::decrypt(private, envelope)
    }
}
