//! Wallet Import Format: Base58Check with a `0x80` version byte and a double-SHA256
//! checksum (Bitcoin-standard, unlike the double-SHA512 checksum the address codec uses).

use crate::base58;
use crate::crypto::hash::sha256d;
use crate::error::{BmError, BmResult};

const PREFIX: u8 = 0x80;
const KEY_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;

pub fn encode(private_key: &[u8; KEY_LEN]) -> String {
    let mut payload = Vec::with_capacity(1 + KEY_LEN + CHECKSUM_LEN);
    payload.push(PREFIX);
    payload.extend_from_slice(private_key);
    let checksum = sha256d(&payload);
    payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    base58::encode(&payload)
}

pub fn decode(wif: &str) -> BmResult<[u8; KEY_LEN]> {
    let bytes = base58::decode(wif)?;
    if bytes.len() != 1 + KEY_LEN + CHECKSUM_LEN {
        return Err(BmError::codec(format!("WIF decodes to {} bytes, expected {}", bytes.len(), 1 + KEY_LEN + CHECKSUM_LEN)));
    }
    if bytes[0] != PREFIX {
        return Err(BmError::codec(format!("WIF version byte is {:#x}, expected {:#x}", bytes[0], PREFIX)));
    }
    let (prefixed_key, checksum) = bytes.split_at(1 + KEY_LEN);
    let expected = sha256d(prefixed_key);
    if checksum != &expected[..CHECKSUM_LEN] {
        return Err(BmError::codec("WIF checksum mismatch"));
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&prefixed_key[1..]);
    Ok(key)
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn known_answer_round_trip() {
        let key = hex!("71c95d26c716a5e85e9af9efe26fb5f744dc98005a13d05d23ee92c77e038d9f");
        assert_eq!(encode(&key), "5JgQ79vTBusc61xYPtUEHYQ38AXKdDZgQ5rFp7Cbb4ZjXUKFZEV");
        assert_eq!(decode("5JgQ79vTBusc61xYPtUEHYQ38AXKdDZgQ5rFp7Cbb4ZjXUKFZEV").unwrap(), key);
    }

    #[test]
    fn rejects_wrong_version_byte() {
        // Base58Check-encode the same payload under a bitcoin mainnet p2pkh version byte (0x00)
        // instead of the WIF version byte (0x80).
        let mut payload = vec![0x00u8];
        payload.extend_from_slice(&[0u8; 32]);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        let encoded = base58::encode(&payload);
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn rejects_bad_checksum() {
        let key = [1u8; 32];
        let mut encoded = encode(&key);
        encoded.pop();
        encoded.push(if encoded.ends_with('1') { '2' } else { '1' });
        assert!(decode(&encoded).is_err());
    }
}
