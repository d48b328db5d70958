//! `inv_vect`: the 32-byte inventory vector identifying an object, the first half of
//! `SHA512(SHA512(payload))`.

use crate::crypto::hash::sha512d;

pub fn inv_vect(payload: &[u8]) -> [u8; 32] {
    let digest = sha512d(payload);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[0..32]);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn is_deterministic_and_half_length() {
        let a = inv_vect(b"some object payload");
        let b = inv_vect(b"some object payload");
        assert_eq!(a, b);
        let different = inv_vect(b"a different payload");
        assert_ne!(a, different);
    }
}
