//! `broadcast`: a message addressed to everyone subscribed to an address rather than to
//! one recipient. Encrypted to a key derived from the sender address itself (so only
//! subscribers who already know the address, or its tag, can read it) instead of ECIES
//! to a recipient's own key pair.
//!
//! Two wire versions differ only in the key derivation and an extra tag prefix, mirroring
//! [`crate::address::Address::broadcast_private_key`]: v4 objects (carried by v2/v3
//! addresses) use `SHA512(header)[0..32]` directly; v5 objects (v4+ addresses) use
//! `SHA512(SHA512(header))[0..32]` and prepend the address's `tag` in plaintext so a
//! subscriber can pick out their broadcasts without attempting every decryption.

use std::collections::HashMap;

use crate::address::{Address, Identity};
use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::var_int::{read_var_int, read_var_int_safe, write_var_int};
use crate::crypto::{ecc, ecies};
use crate::error::{BmError, BmResult};

pub const WIRE_VERSION_V4: u64 = 4;
pub const WIRE_VERSION_V5: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPlaintext {
    pub sender_version: u64,
    pub sender_stream: u64,
    pub behavior: u32,
    pub sign_public: [u8; 65],
    pub enc_public: [u8; 65],
    pub pow_params: Option<(u64, u64)>,
    pub encoding: u64,
    pub message: Vec<u8>,
    pub ack: Vec<u8>,
    pub signature: Vec<u8>,
}

fn strip_prefix(public: &[u8; 65]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&public[1..]);
    out
}

fn add_prefix(stripped: &[u8]) -> [u8; 65] {
    let mut out = [0u8; 65];
    out[0] = 0x04;
    out[1..].copy_from_slice(stripped);
    out
}

#[allow(clippy::too_many_arguments)]
fn encode_without_signature(
    sender_version: u64,
    sender_stream: u64,
    behavior: u32,
    sign_public: &[u8; 65],
    enc_public: &[u8; 65],
    pow_params: Option<(u64, u64)>,
    encoding: u64,
    message: &[u8],
    ack: &[u8],
) -> Vec<u8> {
    let mut composer = ByteBufferComposer::new();
    write_var_int(&mut composer, sender_version);
    write_var_int(&mut composer, sender_stream);
    composer.append_u32_be(behavior);
    composer.append(&strip_prefix(sign_public));
    composer.append(&strip_prefix(enc_public));
    if sender_version >= 3 {
        let (trials, extra) = pow_params.expect("sender_version >= 3 must carry pow_params");
        write_var_int(&mut composer, trials);
        write_var_int(&mut composer, extra);
    }
    write_var_int(&mut composer, encoding);
    write_var_int(&mut composer, message.len() as u64);
    composer.append(message);
    write_var_int(&mut composer, ack.len() as u64);
    composer.append(ack);
    composer.result()
}

/// Determines which wire version a broadcast sent from `sender_address` must use.
pub fn wire_version_for(sender_address: &Address) -> u64 {
    if sender_address.version >= 4 {
        WIRE_VERSION_V5
    } else {
        WIRE_VERSION_V4
    }
}

/// Builds, signs and encrypts a broadcast body sent from `sender`. `header_without_nonce`
/// is the enclosing object's `expiresTime..stream` region (with `type=broadcast` and
/// `version` set to [`wire_version_for`]'s result), which the signature also covers.
#[allow(clippy::too_many_arguments)]
pub fn encode(
    sender: &Identity,
    header_without_nonce: &[u8],
    encoding: u64,
    message: &[u8],
    ack: &[u8],
    pow_params: Option<(u64, u64)>,
) -> BmResult<Vec<u8>> {
    let body_without_sig = encode_without_signature(
        sender.address.version,
        sender.address.stream,
        0,
        sender.sign_public(),
        sender.enc_public(),
        pow_params,
        encoding,
        message,
        ack,
    );

    let wire_version = wire_version_for(&sender.address);
    let tag_prefix: Vec<u8> = if wire_version == WIRE_VERSION_V5 { sender.address.tag().to_vec() } else { vec![] };

    let mut region = Vec::with_capacity(header_without_nonce.len() + tag_prefix.len() + body_without_sig.len());
    region.extend_from_slice(header_without_nonce);
    region.extend_from_slice(&tag_prefix);
    region.extend_from_slice(&body_without_sig);
    let signature = ecc::sign(sender.sign_private(), &region)?;

    let mut plaintext = body_without_sig;
    let mut composer = ByteBufferComposer::new();
    write_var_int(&mut composer, signature.len() as u64);
    plaintext.extend_from_slice(&composer.result());
    plaintext.extend_from_slice(&signature);

    let key = sender.address.broadcast_private_key();
    let public = ecc::get_public(&key)?;
    let envelope = ecies::encrypt(&public, &plaintext)?;

    let mut out = Vec::with_capacity(tag_prefix.len() + envelope.len());
    out.extend_from_slice(&tag_prefix);
    out.extend_from_slice(&envelope);
    Ok(out)
}

fn parse(header_without_nonce: &[u8], tag_prefix: &[u8], plaintext: &[u8]) -> BmResult<BroadcastPlaintext> {
    let mut parser = ByteBufferParser::new(plaintext);
    let sender_version = read_var_int(&mut parser)?;
    let sender_stream = read_var_int(&mut parser)?;
    let behavior = parser.read_u32_be()?;
    let sign_public = add_prefix(parser.read(64)?);
    let enc_public = add_prefix(parser.read(64)?);
    let pow_params = if sender_version >= 3 {
        let trials = read_var_int_safe(&mut parser)?;
        let extra = read_var_int_safe(&mut parser)?;
        Some((trials, extra))
    } else {
        None
    };
    let encoding = read_var_int(&mut parser)?;
    let msg_len = read_var_int_safe(&mut parser)? as usize;
    let message = parser.read(msg_len)?.to_vec();
    let ack_len = read_var_int_safe(&mut parser)? as usize;
    let ack = parser.read(ack_len)?.to_vec();

    let signed_len = parser.pos();
    let sig_len = read_var_int_safe(&mut parser)? as usize;
    let signature = parser.read(sig_len)?.to_vec();
    if parser.remaining() != 0 {
        return Err(BmError::codec("broadcast payload has trailing bytes"));
    }

    let mut region = Vec::with_capacity(header_without_nonce.len() + tag_prefix.len() + signed_len);
    region.extend_from_slice(header_without_nonce);
    region.extend_from_slice(tag_prefix);
    region.extend_from_slice(&plaintext[..signed_len]);
    ecc::verify(&sign_public, &region, &signature)?;

    Ok(BroadcastPlaintext {
        sender_version,
        sender_stream,
        behavior,
        sign_public,
        enc_public,
        pow_params,
        encoding,
        message,
        ack,
        signature,
    })
}

/// Decrypts a v4 broadcast body against `subscription`'s derived key.
pub fn decode_v4(header_without_nonce: &[u8], bytes: &[u8], subscription: &Address) -> BmResult<BroadcastPlaintext> {
    let key = subscription.broadcast_private_key();
    let plaintext = ecies::decrypt(&key, bytes)?;
    parse(header_without_nonce, &[], &plaintext)
}

/// Decrypts a v5 broadcast body. `subscriptions` maps a tag to the derived private key
/// for every address this decoder is watching; `bytes` carries its own plaintext tag
/// prefix so the right key can be picked without trial-decryption. Returns `Ok(None)`,
/// not an error, if the tag isn't in `subscriptions`.
pub fn decode_v5(
    header_without_nonce: &[u8],
    bytes: &[u8],
    subscriptions: &HashMap<[u8; 32], [u8; 32]>,
) -> BmResult<Option<BroadcastPlaintext>> {
    if bytes.len() < 32 {
        return Err(BmError::codec("broadcast v5 payload shorter than its tag"));
    }
    let mut tag = [0u8; 32];
    tag.copy_from_slice(&bytes[..32]);
    let envelope = &bytes[32..];

    let Some(key) = subscriptions.get(&tag) else {
        return Ok(None);
    };

    let plaintext = ecies::decrypt(key, envelope)?;
    parse(header_without_nonce, &tag, &plaintext).map(Some)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::address;

    #[test]
    fn v4_broadcast_round_trips_for_a_v3_address() {
        let sender = address::from_passphrase("channel", 19, 3, 1).unwrap();
        assert_eq!(wire_version_for(&sender.address), WIRE_VERSION_V4);
        let header = b"object-header-region";

        let bytes = encode(&sender, header, ENCODING_TEST, b"hello subscribers", &[], Some((1000, 1000))).unwrap();
        let decoded = decode_v4(header, &bytes, &sender.address).unwrap();
        assert_eq!(decoded.message, b"hello subscribers");
    }

    #[test]
    fn v5_broadcast_round_trips_for_a_v4_address() {
        let sender = address::from_passphrase("channel", 19, 4, 1).unwrap();
        assert_eq!(wire_version_for(&sender.address), WIRE_VERSION_V5);
        let header = b"object-header-region";

        let bytes = encode(&sender, header, ENCODING_TEST, b"hello subscribers", &[], Some((1000, 1000))).unwrap();

        let mut subscriptions = HashMap::new();
        subscriptions.insert(sender.address.tag(), sender.address.broadcast_private_key());
        let decoded = decode_v5(header, &bytes, &subscriptions).unwrap().unwrap();
        assert_eq!(decoded.message, b"hello subscribers");

        let empty = HashMap::new();
        assert!(decode_v5(header, &bytes, &empty).unwrap().is_none());
    }

    const ENCODING_TEST: u64 = 1;
}
