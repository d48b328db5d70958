//! `getpubkey`: requests a peer's public key, addressed by ripe (address v2/v3) or by
//! tag (address v4+, which hides the ripe from anyone who isn't the recipient).

use crate::address::Address;
use crate::error::{BmError, BmResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetPubkey {
    Ripe([u8; 20]),
    Tag([u8; 32]),
}

impl GetPubkey {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            GetPubkey::Ripe(ripe) => ripe.to_vec(),
            GetPubkey::Tag(tag) => tag.to_vec(),
        }
    }
}

/// Resolves the right form of `getpubkey` for `address`, by its version.
pub fn encode(address: &Address) -> GetPubkey {
    if address.version >= 4 {
        GetPubkey::Tag(address.tag())
    } else {
        GetPubkey::Ripe(*address.ripe())
    }
}

pub fn decode(version: u64, bytes: &[u8]) -> BmResult<GetPubkey> {
    match version {
        2 | 3 => {
            if bytes.len() != 20 {
                return Err(BmError::codec(format!(
                    "getpubkey v{} payload must be 20 bytes, got {}",
                    version,
                    bytes.len()
                )));
            }
            let mut ripe = [0u8; 20];
            ripe.copy_from_slice(bytes);
            Ok(GetPubkey::Ripe(ripe))
        }
        4.. => {
            if bytes.len() != 32 {
                return Err(BmError::codec(format!(
                    "getpubkey v{} payload must be 32 bytes, got {}",
                    version,
                    bytes.len()
                )));
            }
            let mut tag = [0u8; 32];
            tag.copy_from_slice(bytes);
            Ok(GetPubkey::Tag(tag))
        }
        _ => Err(BmError::argument(format!("unsupported getpubkey address version {}", version))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::address;

    #[test]
    fn v3_address_encodes_as_ripe() {
        let identity = address::from_passphrase("test", 19, 3, 1).unwrap();
        let encoded = encode(&identity.address);
        assert!(matches!(encoded, GetPubkey::Ripe(ripe) if &ripe == identity.address.ripe()));
        assert_eq!(decode(3, &encoded.to_bytes()).unwrap(), encoded);
    }

    #[test]
    fn v4_address_encodes_as_tag() {
        let identity = address::from_passphrase("test", 19, 4, 1).unwrap();
        let encoded = encode(&identity.address);
        assert!(matches!(encoded, GetPubkey::Tag(tag) if tag == identity.address.tag()));
        assert_eq!(decode(4, &encoded.to_bytes()).unwrap(), encoded);
    }

    #[test]
    fn rejects_wrong_length_payload() {
        assert!(decode(3, &[0u8; 19]).is_err());
        assert!(decode(4, &[0u8; 31]).is_err());
    }
}
