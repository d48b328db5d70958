//! Pure hash helpers shared by every codec. These are plain functions rather than
//! [`super::CryptoProvider`] trait calls because every codec in this crate needs them
//! unconditionally (checksums, `inv_vect`, key derivation) and there is no meaningful
//! alternative backend for "compute a SHA-512 digest" the way there is for ECDSA
//! signing, which does need to be pluggable (HSMs, WASM host bindings, …).

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

pub fn sha1(input: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(input);
    hasher.finalize().into()
}

pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

pub fn sha512(input: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(input);
    hasher.finalize().into()
}

pub fn ripemd160(input: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(input);
    hasher.finalize().into()
}

pub fn sha256d(input: &[u8]) -> [u8; 32] {
    sha256(&sha256(input))
}

pub fn sha512d(input: &[u8]) -> [u8; 64] {
    sha512(&sha512(input))
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn sha256_known_answer() {
        assert_eq!(
            sha256(b"hello world"),
            hex!("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }

    #[test]
    fn sha512_known_answer() {
        assert_eq!(
            sha512(b"")[..8],
            hex!("cf83e1357eefb8bd")
        );
    }
}
