//! Bitmessage addresses: version/stream/ripe Base58 codec with a double-SHA-512
//! checksum, and the key derivations (`pubkeyPrivateKey`, `tag`, `broadcastPrivateKey`)
//! that let anyone address a `pubkey` or `broadcast` object without holding the
//! recipient's private key.
//!
//! An [`Address`] is public-only, the way decoding a Base58 string produces it.
//! [`Identity`] pairs one with the sign/enc private keys that generated it.

use std::fmt;
use std::str::FromStr;

use crate::base58;
use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::var_int::{read_var_int, write_var_int};
use crate::crypto::ecc;
use crate::crypto::hash::{ripemd160, sha512, sha512d};
use crate::error::{BmError, BmResult};

pub const RIPE_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;

/// A Bitmessage address: version, stream, and the RIPEMD-160 digest identifying a
/// recipient's key pair. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub version: u64,
    pub stream: u64,
    ripe: [u8; RIPE_LEN],
}

impl Address {
    pub fn new(version: u64, stream: u64, ripe: [u8; RIPE_LEN]) -> BmResult<Self> {
        let address = Address { version, stream, ripe };
        address.validate_ripe_length()?;
        Ok(address)
    }

    pub fn ripe(&self) -> &[u8; RIPE_LEN] {
        &self.ripe
    }

    fn validate_ripe_length(&self) -> BmResult<()> {
        let (min, max) = version_bounds(self.version)?;
        let len = short_len(&self.ripe);
        if len < min || len > max {
            return Err(BmError::argument(format!(
                "address version {} requires a short ripe length in {}..={}, got {}",
                self.version, min, max, len
            )));
        }
        Ok(())
    }

    /// The ripe as it appears on the wire: leading zero bytes stripped, but never
    /// below the version's minimum short-ripe length.
    fn wire_ripe(&self) -> &[u8] {
        let (min, _) = version_bounds(self.version).expect("version validated at construction");
        let lead = leading_zero_count(&self.ripe).min(RIPE_LEN - min);
        &self.ripe[lead..]
    }

    pub fn encode(&self) -> String {
        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, self.version);
        write_var_int(&mut composer, self.stream);
        composer.append(self.wire_ripe());
        let mut payload = composer.result();
        let checksum = sha512d(&payload);
        payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        format!("BM-{}", base58::encode(&payload))
    }

    /// Decodes a Base58 address string. Tolerates surrounding whitespace and an
    /// optional `BM-` prefix; the recovered ripe is always re-padded to 20 bytes.
    pub fn decode(s: &str) -> BmResult<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("BM-").unwrap_or(trimmed);
        let payload = base58::decode(trimmed)?;
        if payload.len() < CHECKSUM_LEN {
            return Err(BmError::codec("address payload shorter than its checksum"));
        }
        let (data, checksum) = payload.split_at(payload.len() - CHECKSUM_LEN);
        if checksum != &sha512d(data)[..CHECKSUM_LEN] {
            return Err(BmError::codec("address checksum mismatch"));
        }

        let mut parser = ByteBufferParser::new(data);
        let version = read_var_int(&mut parser)?;
        let stream = read_var_int(&mut parser)?;
        let short = parser.read(parser.remaining())?;
        if short.len() > RIPE_LEN {
            return Err(BmError::codec("decoded ripe longer than 20 bytes"));
        }
        if version >= 4 && short.first() == Some(&0) {
            return Err(BmError::codec("non-canonical v4 address: encoded ripe has a redundant leading zero byte"));
        }

        let mut ripe = [0u8; RIPE_LEN];
        ripe[RIPE_LEN - short.len()..].copy_from_slice(short);
        Address::new(version, stream, ripe)
    }

    /// `SHA512(var_int(version) ‖ var_int(stream) ‖ ripe)`, the seed every
    /// derivation below hashes again.
    fn hash(&self) -> [u8; 64] {
        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, self.version);
        write_var_int(&mut composer, self.stream);
        composer.append(&self.ripe);
        sha512(&composer.result())
    }

    /// Private key a v4 `pubkey` object addressed to this identity is ECIES-encrypted to.
    pub fn pubkey_private_key(&self) -> [u8; 32] {
        let h = sha512(&self.hash());
        let mut out = [0u8; 32];
        out.copy_from_slice(&h[..32]);
        out
    }

    /// 32-byte public identifier used to index v4 pubkeys and v5 broadcasts without
    /// revealing the ripe.
    pub fn tag(&self) -> [u8; 32] {
        let h = sha512(&self.hash());
        let mut out = [0u8; 32];
        out.copy_from_slice(&h[32..64]);
        out
    }

    /// Private key a broadcast addressed to this address is encrypted to: v4+
    /// addresses hash `hash` a second time, earlier versions use it directly.
    pub fn broadcast_private_key(&self) -> [u8; 32] {
        let hash = self.hash();
        let mut out = [0u8; 32];
        if self.version >= 4 {
            out.copy_from_slice(&sha512(&hash)[..32]);
        } else {
            out.copy_from_slice(&hash[..32]);
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Address {
    type Err = BmError;

    fn from_str(s: &str) -> BmResult<Self> {
        Address::decode(s)
    }
}

/// An address together with the private keys that derive it. Owns everything
/// needed to sign objects addressed from it and decrypt messages addressed to it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub address: Address,
    sign_private: [u8; 32],
    enc_private: [u8; 32],
    sign_public: [u8; 65],
    enc_public: [u8; 65],
}

impl Identity {
    pub fn sign_private(&self) -> &[u8; 32] {
        &self.sign_private
    }

    pub fn enc_private(&self) -> &[u8; 32] {
        &self.enc_private
    }

    pub fn sign_public(&self) -> &[u8; 65] {
        &self.sign_public
    }

    pub fn enc_public(&self) -> &[u8; 65] {
        &self.enc_public
    }
}

/// Generates a fresh identity: draws one signing key, then repeatedly draws an
/// encryption key until the resulting ripe's shortened length is no greater than
/// `ripe_length` (the conventional default is 19, i.e. at least one leading zero byte).
pub fn from_random(ripe_length: usize, version: u64, stream: u64) -> BmResult<Identity> {
    version_bounds(version)?;
    let sign_private = ecc::get_private();
    let sign_public = ecc::get_public(&sign_private)?;
    loop {
        let enc_private = ecc::get_private();
        let enc_public = ecc::get_public(&enc_private)?;
        let ripe = compute_ripe(&sign_public, &enc_public);
        if accept(&ripe, ripe_length, version)? {
            let address = Address::new(version, stream, ripe)?;
            return Ok(Identity { address, sign_private, enc_private, sign_public, enc_public });
        }
    }
}

/// Deterministically derives an identity from a passphrase: `signNonce` starts at 0,
/// `encNonce` at 1; each candidate key pair is `SHA512(passphrase ‖ var_int(nonce))[0..32]`.
/// Retries with both nonces advanced by 2 until the ripe length rule is met. Same
/// passphrase, version, and stream always yield the same identity.
pub fn from_passphrase(passphrase: &str, ripe_length: usize, version: u64, stream: u64) -> BmResult<Identity> {
    version_bounds(version)?;
    let passphrase_bytes = passphrase.as_bytes();
    let mut sign_nonce: u64 = 0;
    let mut enc_nonce: u64 = 1;
    loop {
        let sign_private = nonce_derived_key(passphrase_bytes, sign_nonce);
        let enc_private = nonce_derived_key(passphrase_bytes, enc_nonce);
        let sign_public = ecc::get_public(&sign_private)?;
        let enc_public = ecc::get_public(&enc_private)?;
        let ripe = compute_ripe(&sign_public, &enc_public);
        if accept(&ripe, ripe_length, version)? {
            let address = Address::new(version, stream, ripe)?;
            return Ok(Identity { address, sign_private, enc_private, sign_public, enc_public });
        }
        sign_nonce += 2;
        enc_nonce += 2;
    }
}

fn nonce_derived_key(passphrase: &[u8], nonce: u64) -> [u8; 32] {
    let mut composer = ByteBufferComposer::new();
    composer.append(passphrase);
    write_var_int(&mut composer, nonce);
    let digest = sha512(&composer.result());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest[..32]);
    key
}

fn compute_ripe(sign_public: &[u8; 65], enc_public: &[u8; 65]) -> [u8; RIPE_LEN] {
    let mut concatenated = Vec::with_capacity(sign_public.len() + enc_public.len());
    concatenated.extend_from_slice(sign_public);
    concatenated.extend_from_slice(enc_public);
    ripemd160(&sha512(&concatenated))
}

fn accept(ripe: &[u8; RIPE_LEN], ripe_length: usize, version: u64) -> BmResult<bool> {
    let (min, _) = version_bounds(version)?;
    let len = short_len(ripe);
    Ok(len <= ripe_length && len >= min)
}

fn version_bounds(version: u64) -> BmResult<(usize, usize)> {
    match version {
        1 => Ok((RIPE_LEN, RIPE_LEN)),
        2 | 3 => Ok((18, RIPE_LEN)),
        4 => Ok((4, RIPE_LEN)),
        _ => Err(BmError::argument(format!("unsupported address version {}", version))),
    }
}

/// Counts leading zero bytes in a 20-byte ripe (the source's equivalent loop used
/// the comma operator instead of `&&`, silently only ever checking byte 0; the
/// intent (count every leading zero byte) is implemented correctly here).
fn leading_zero_count(ripe: &[u8; RIPE_LEN]) -> usize {
    ripe.iter().take_while(|&&b| b == 0).count()
}

fn short_len(ripe: &[u8; RIPE_LEN]) -> usize {
    RIPE_LEN - leading_zero_count(ripe)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wif;
    use hex_literal::hex;

    #[test]
    fn passphrase_derivation_matches_known_vectors() {
        let identity = from_passphrase("test", 19, 4, 1).unwrap();
        assert_eq!(wif::encode(identity.sign_private()), "5JY1CFeeyN4eyfL35guWAuUqu5VLmd7LojtkNP6wmt5msZxxZ57");
        assert_eq!(wif::encode(identity.enc_private()), "5J1oDgZDicNhUgbfzBDQqi2m5jUPnDrfZinnTqEEEaLv63jVFTM");
        assert_eq!(identity.address.ripe(), &hex!("00ac14944b00decea5628eb40d0ff4b0f9ee9eca"));
        assert_eq!(identity.address.encode(), "BM-2cWFkyuXXFw6d393RGnin2RpSXj8wxtt6F");
    }

    #[test]
    fn passphrase_derivation_is_deterministic() {
        let a = from_passphrase("test", 19, 4, 1).unwrap();
        let b = from_passphrase("test", 19, 4, 1).unwrap();
        assert_eq!(a.sign_private(), b.sign_private());
        assert_eq!(a.enc_private(), b.enc_private());
    }

    #[test]
    fn tag_and_pubkey_private_key_match_known_vectors() {
        let address = Address::decode("BM-2cTux3PGRqHTEH6wyUP2sWeT4LrsGgy63z").unwrap();
        assert_eq!(address.version, 4);
        assert_eq!(
            address.tag(),
            hex!("facf1e3e6c74916203b7f714ca100d4d60604f0917696d0f09330f82f52bed1a")
        );
        assert_eq!(
            address.pubkey_private_key(),
            hex!("15e516173769dc87d4a8e8ed90200362fa58c0228bb2b70b06f26c089a9823a4")
        );
    }

    #[test]
    fn encode_decode_round_trips() {
        let ripe = hex!("00ac14944b00decea5628eb40d0ff4b0f9ee9eca");
        let address = Address::new(4, 1, ripe).unwrap();
        let encoded = address.encode();
        assert_eq!(Address::decode(&encoded).unwrap(), address);
    }

    #[test]
    fn decode_tolerates_whitespace_and_missing_prefix() {
        let address = Address::decode("BM-2cTux3PGRqHTEH6wyUP2sWeT4LrsGgy63z").unwrap();
        assert_eq!(Address::decode("  BM-2cTux3PGRqHTEH6wyUP2sWeT4LrsGgy63z  ").unwrap(), address);
        assert_eq!(Address::decode("2cTux3PGRqHTEH6wyUP2sWeT4LrsGgy63z").unwrap(), address);
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut encoded = Address::decode("BM-2cTux3PGRqHTEH6wyUP2sWeT4LrsGgy63z").unwrap().encode();
        encoded.pop();
        encoded.push(if encoded.ends_with('1') { '2' } else { '1' });
        assert!(Address::decode(&encoded).is_err());
    }

    #[test]
    fn v1_requires_full_length_ripe() {
        let full = hex!("71ec100837328034d52302de6e6c09a56821eed1");
        assert!(Address::new(1, 1, full).is_ok());

        let one_leading_zero = hex!("0071ec100837328034d52302de6e6c09a56821ee");
        assert!(Address::new(1, 1, one_leading_zero).is_err());
    }

    #[test]
    fn v4_rejects_non_canonical_leading_zero_short_ripe() {
        // A ripe with two leading zero bytes properly trims to an 18-byte short
        // form. Encoding only the last 19 bytes instead leaves a redundant leading
        // zero byte that a correct encoder would never have produced.
        let ripe: [u8; RIPE_LEN] = [0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18];
        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, 4);
        write_var_int(&mut composer, 1);
        composer.append(&ripe[1..]);
        let data = composer.result();
        let checksum = sha512d(&data);
        let mut payload = data;
        payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        let encoded = format!("BM-{}", base58::encode(&payload));
        assert!(Address::decode(&encoded).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        assert!(Address::new(5, 1, [0u8; RIPE_LEN]).is_err());
    }
}
