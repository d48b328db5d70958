//! `pubkey`: a sender's signing/encryption public keys, broadcast so the network can
//! route objects addressed to them. Three wire shapes, one per protocol version: v2 is
//! bare key material, v3 adds a self-signature and PoW-tuning advice, v4 wraps the v3
//! shape in an ECIES envelope keyed by the recipient's address so only someone who
//! already knows the address can read it.

use std::collections::HashMap;

use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::var_int::{read_var_int, read_var_int_safe, write_var_int};
use crate::crypto::{ecc, ecies};
use crate::error::{BmError, BmResult};

const UNCOMPRESSED_LEN: usize = 65;
const STRIPPED_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubkeyV2 {
    pub behavior: u32,
    pub sign_public: [u8; UNCOMPRESSED_LEN],
    pub enc_public: [u8; UNCOMPRESSED_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubkeyV3 {
    pub v2: PubkeyV2,
    pub nonce_trials_per_byte: u64,
    pub payload_length_extra_bytes: u64,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubkeyV4 {
    pub tag: [u8; 32],
    pub inner: PubkeyV3,
}

fn strip_prefix(public: &[u8; UNCOMPRESSED_LEN]) -> [u8; STRIPPED_LEN] {
    let mut out = [0u8; STRIPPED_LEN];
    out.copy_from_slice(&public[1..]);
    out
}

fn add_prefix(stripped: &[u8]) -> [u8; UNCOMPRESSED_LEN] {
    let mut out = [0u8; UNCOMPRESSED_LEN];
    out[0] = 0x04;
    out[1..].copy_from_slice(stripped);
    out
}

fn encode_v2_body(v2: &PubkeyV2) -> Vec<u8> {
    let mut composer = ByteBufferComposer::new();
    composer.append_u32_be(v2.behavior);
    composer.append(&strip_prefix(&v2.sign_public));
    composer.append(&strip_prefix(&v2.enc_public));
    composer.result()
}

fn parse_v2_body(parser: &mut ByteBufferParser<'_>) -> BmResult<PubkeyV2> {
    let behavior = parser.read_u32_be()?;
    let sign_public = add_prefix(parser.read(STRIPPED_LEN)?);
    let enc_public = add_prefix(parser.read(STRIPPED_LEN)?);
    Ok(PubkeyV2 { behavior, sign_public, enc_public })
}

pub fn encode_v2(v2: &PubkeyV2) -> Vec<u8> {
    encode_v2_body(v2)
}

pub fn decode_v2(bytes: &[u8]) -> BmResult<PubkeyV2> {
    let mut parser = ByteBufferParser::new(bytes);
    let v2 = parse_v2_body(&mut parser)?;
    if parser.remaining() != 0 {
        return Err(BmError::codec("pubkey v2 payload has trailing bytes"));
    }
    Ok(v2)
}

/// `v2Body ‖ var_int(trials) ‖ var_int(extra)`: the v3-shaped body before its signature,
/// reused as-is as the ciphertext prefix of a v4 pubkey's inner structure.
fn v3_body_without_signature(v2: &PubkeyV2, trials: u64, extra: u64) -> Vec<u8> {
    let mut body = encode_v2_body(v2);
    let mut composer = ByteBufferComposer::new();
    write_var_int(&mut composer, trials);
    write_var_int(&mut composer, extra);
    body.extend_from_slice(&composer.result());
    body
}

fn signed_region(header_without_nonce: &[u8], prefix: &[u8], body_without_signature: &[u8]) -> Vec<u8> {
    let mut region = Vec::with_capacity(header_without_nonce.len() + prefix.len() + body_without_signature.len());
    region.extend_from_slice(header_without_nonce);
    region.extend_from_slice(prefix);
    region.extend_from_slice(body_without_signature);
    region
}

/// Signs and encodes a v3 `pubkey` body. `header_without_nonce` is the object header
/// region (`expiresTime..stream`) this body will be wrapped under.
pub fn encode_v3(
    sign_private: &[u8; 32],
    header_without_nonce: &[u8],
    v2: &PubkeyV2,
    nonce_trials_per_byte: u64,
    payload_length_extra_bytes: u64,
) -> BmResult<Vec<u8>> {
    let body_without_sig = v3_body_without_signature(v2, nonce_trials_per_byte, payload_length_extra_bytes);
    let region = signed_region(header_without_nonce, &[], &body_without_sig);
    let signature = ecc::sign(sign_private, &region)?;

    let mut out = body_without_sig;
    let mut composer = ByteBufferComposer::new();
    write_var_int(&mut composer, signature.len() as u64);
    out.extend_from_slice(&composer.result());
    out.extend_from_slice(&signature);
    Ok(out)
}

fn parse_v3_tail(parser: &mut ByteBufferParser<'_>) -> BmResult<(u64, u64, Vec<u8>)> {
    let trials = read_var_int_safe(parser)?;
    let extra = read_var_int_safe(parser)?;
    let sig_len = read_var_int_safe(parser)? as usize;
    let sig = parser.read(sig_len)?.to_vec();
    Ok((trials, extra, sig))
}

/// Decodes and signature-verifies a v3 `pubkey` body against the object header it was
/// wrapped under.
pub fn decode_v3(header_without_nonce: &[u8], bytes: &[u8]) -> BmResult<PubkeyV3> {
    let mut parser = ByteBufferParser::new(bytes);
    let v2 = parse_v2_body(&mut parser)?;
    let (trials, extra, signature) = parse_v3_tail(&mut parser)?;
    if parser.remaining() != 0 {
        return Err(BmError::codec("pubkey v3 payload has trailing bytes"));
    }

    let body_without_sig = v3_body_without_signature(&v2, trials, extra);
    let region = signed_region(header_without_nonce, &[], &body_without_sig);
    ecc::verify(&v2.sign_public, &region, &signature)?;

    Ok(PubkeyV3 { v2, nonce_trials_per_byte: trials, payload_length_extra_bytes: extra, signature })
}

/// Signs the v3-shaped inner structure (now additionally covering `tag`), ECIES-encrypts
/// it to `recipient_public`, and prepends the plaintext tag.
pub fn encode_v4(
    sign_private: &[u8; 32],
    recipient_public: &[u8; UNCOMPRESSED_LEN],
    header_without_nonce: &[u8],
    tag: [u8; 32],
    v2: &PubkeyV2,
    nonce_trials_per_byte: u64,
    payload_length_extra_bytes: u64,
) -> BmResult<Vec<u8>> {
    let body_without_sig = v3_body_without_signature(v2, nonce_trials_per_byte, payload_length_extra_bytes);
    let region = signed_region(header_without_nonce, &tag, &body_without_sig);
    let signature = ecc::sign(sign_private, &region)?;

    let mut inner_plain = body_without_sig;
    let mut composer = ByteBufferComposer::new();
    write_var_int(&mut composer, signature.len() as u64);
    inner_plain.extend_from_slice(&composer.result());
    inner_plain.extend_from_slice(&signature);

    let envelope = ecies::encrypt(recipient_public, &inner_plain)?;

    let mut out = Vec::with_capacity(32 + envelope.len());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&envelope);
    Ok(out)
}

/// Decrypts and verifies a v4 `pubkey` body. `needed` maps a tag to the private key that
/// can decrypt it (normally the single recipient's `pubkeyPrivateKey`, or a batch of
/// several being watched at once). Returns `Ok(None)`, not an error, if `tag` is not
/// in `needed`: the object is simply not addressed to anyone this decoder represents.
pub fn decode_v4(
    header_without_nonce: &[u8],
    bytes: &[u8],
    needed: &HashMap<[u8; 32], [u8; 32]>,
) -> BmResult<Option<PubkeyV4>> {
    if bytes.len() < 32 {
        return Err(BmError::codec("pubkey v4 payload shorter than its tag"));
    }
    let mut tag = [0u8; 32];
    tag.copy_from_slice(&bytes[..32]);
    let envelope = &bytes[32..];

    let Some(private_key) = needed.get(&tag) else {
        return Ok(None);
    };

    let inner_plain = ecies::decrypt(private_key, envelope)?;
    let mut parser = ByteBufferParser::new(&inner_plain);
    let v2 = parse_v2_body(&mut parser)?;
    let (trials, extra, signature) = parse_v3_tail(&mut parser)?;
    if parser.remaining() != 0 {
        return Err(BmError::codec("pubkey v4 inner payload has trailing bytes"));
    }

    let body_without_sig = v3_body_without_signature(&v2, trials, extra);
    let region = signed_region(header_without_nonce, &tag, &body_without_sig);
    ecc::verify(&v2.sign_public, &region, &signature)?;

    let inner = PubkeyV3 { v2, nonce_trials_per_byte: trials, payload_length_extra_bytes: extra, signature };
    Ok(Some(PubkeyV4 { tag, inner }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::ecc;

    fn sample_v2() -> (PubkeyV2, [u8; 32], [u8; 32]) {
        let sign_private = ecc::get_private();
        let enc_private = ecc::get_private();
        let sign_public = ecc::get_public(&sign_private).unwrap();
        let enc_public = ecc::get_public(&enc_private).unwrap();
        (PubkeyV2 { behavior: 1, sign_public, enc_public }, sign_private, enc_private)
    }

    #[test]
    fn v2_round_trips() {
        let (v2, _, _) = sample_v2();
        let bytes = encode_v2(&v2);
        assert_eq!(bytes.len(), 4 + 64 + 64);
        assert_eq!(decode_v2(&bytes).unwrap(), v2);
    }

    #[test]
    fn v3_round_trips_and_verifies() {
        let (v2, sign_private, _) = sample_v2();
        let header = b"fake-header-region";
        let bytes = encode_v3(&sign_private, header, &v2, 1000, 1000).unwrap();
        let decoded = decode_v3(header, &bytes).unwrap();
        assert_eq!(decoded.v2, v2);
        assert_eq!(decoded.nonce_trials_per_byte, 1000);
        assert_eq!(decoded.payload_length_extra_bytes, 1000);
    }

    #[test]
    fn v3_rejects_tampered_header() {
        let (v2, sign_private, _) = sample_v2();
        let header = b"fake-header-region";
        let bytes = encode_v3(&sign_private, header, &v2, 1000, 1000).unwrap();
        assert!(decode_v3(b"different-header!!!", &bytes).is_err());
    }

    #[test]
    fn v4_round_trips_and_is_invisible_without_the_key() {
        let (v2, sign_private, _) = sample_v2();
        let recipient_private = ecc::get_private();
        let recipient_public = ecc::get_public(&recipient_private).unwrap();
        let header = b"fake-header-region";
        let tag = [7u8; 32];

        let bytes = encode_v4(&sign_private, &recipient_public, header, tag, &v2, 1000, 1000).unwrap();

        let mut needed = HashMap::new();
        needed.insert(tag, recipient_private);
        let decoded = decode_v4(header, &bytes, &needed).unwrap().unwrap();
        assert_eq!(decoded.tag, tag);
        assert_eq!(decoded.inner.v2, v2);

        let empty = HashMap::new();
        assert!(decode_v4(header, &bytes, &empty).unwrap().is_none());
    }
}
