//! Raw Base58 encode/decode shared by the address codec (double-SHA512 checksum)
//! and the WIF codec (double-SHA256 checksum). The two can't share `bs58`'s
//! built-in `::check()` helper, which is hardwired to SHA-256, so both checksum
//! variants call the raw alphabet codec here and apply their own digest.

use crate::error::{BmError, BmResult};

pub fn encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn decode(s: &str) -> BmResult<Vec<u8>> {
    bs58::decode(s).into_vec().map_err(|e| BmError::codec(format!("invalid base58 string: {}", e)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips() {
        let data = [0x00, 0xde, 0xad, 0xbe, 0xef];
        let encoded = encode(&data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn rejects_invalid_alphabet_characters() {
        assert!(decode("0OIl").is_err());
    }
}
