//! `msg`: a private, end-to-end encrypted message from one address to another.
//! Encrypted with ECIES to the recipient's encryption public key; the plaintext inside
//! carries the sender's own keys (so the recipient can reply) and a self-signature.

use crate::address::Identity;
use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::var_int::{read_var_int, read_var_int_safe, write_var_int};
use crate::crypto::{ecc, ecies};
use crate::error::{BmError, BmResult};

pub const ENCODING_IGNORE: u64 = 0;
pub const ENCODING_TRIVIAL: u64 = 1;
pub const ENCODING_SIMPLE: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgPlaintext {
    pub sender_version: u64,
    pub sender_stream: u64,
    pub behavior: u32,
    pub sign_public: [u8; 65],
    pub enc_public: [u8; 65],
    /// Present only for `sender_version >= 3`.
    pub pow_params: Option<(u64, u64)>,
    pub destination_ripe: [u8; 20],
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
    destination_ripe: &[u8; 20],
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
    composer.append(destination_ripe);
    write_var_int(&mut composer, encoding);
    write_var_int(&mut composer, message.len() as u64);
    composer.append(message);
    write_var_int(&mut composer, ack.len() as u64);
    composer.append(ack);
    composer.result()
}

/// Builds, signs and ECIES-encrypts a `msg` object body. `header_without_nonce` is the
/// enclosing object's `expiresTime..stream` region, which the signature also covers.
#[allow(clippy::too_many_arguments)]
pub fn encode(
    sender: &Identity,
    recipient_enc_public: &[u8; 65],
    header_without_nonce: &[u8],
    destination_ripe: [u8; 20],
    encoding: u64,
    message: &[u8],
    ack: &[u8],
    pow_params: Option<(u64, u64)>,
) -> BmResult<Vec<u8>> {
    let sender_version = sender.address.version;
    let body_without_sig = encode_without_signature(
        sender_version,
        sender.address.stream,
        0,
        sender.sign_public(),
        sender.enc_public(),
        pow_params,
        &destination_ripe,
        encoding,
        message,
        ack,
    );

    let mut region = Vec::with_capacity(header_without_nonce.len() + body_without_sig.len());
    region.extend_from_slice(header_without_nonce);
    region.extend_from_slice(&body_without_sig);
    let signature = ecc::sign(sender.sign_private(), &region)?;

    let mut plaintext = body_without_sig;
    let mut composer = ByteBufferComposer::new();
    write_var_int(&mut composer, signature.len() as u64);
    plaintext.extend_from_slice(&composer.result());
    plaintext.extend_from_slice(&signature);

    ecies::encrypt(recipient_enc_public, &plaintext)
}

fn parse(header_without_nonce: &[u8], plaintext: &[u8]) -> BmResult<MsgPlaintext> {
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
    let mut destination_ripe = [0u8; 20];
    destination_ripe.copy_from_slice(parser.read(20)?);
    let encoding = read_var_int(&mut parser)?;
    let msg_len = read_var_int_safe(&mut parser)? as usize;
    let message = parser.read(msg_len)?.to_vec();
    let ack_len = read_var_int_safe(&mut parser)? as usize;
    let ack = parser.read(ack_len)?.to_vec();

    let signed_len = parser.pos();
    let sig_len = read_var_int_safe(&mut parser)? as usize;
    let signature = parser.read(sig_len)?.to_vec();
    if parser.remaining() != 0 {
        return Err(BmError::codec("msg payload has trailing bytes"));
    }

    let mut region = Vec::with_capacity(header_without_nonce.len() + signed_len);
    region.extend_from_slice(header_without_nonce);
    region.extend_from_slice(&plaintext[..signed_len]);
    ecc::verify(&sign_public, &region, &signature)?;

    Ok(MsgPlaintext {
        sender_version,
        sender_stream,
        behavior,
        sign_public,
        enc_public,
        pow_params,
        destination_ripe,
        encoding,
        message,
        ack,
        signature,
    })
}

/// Trial-decrypts `bytes` with each of `identities` until one succeeds, then verifies the
/// result was actually addressed to that identity. Fails with a uniform message if none
/// of the identities' keys decrypt the envelope.
pub fn decode(header_without_nonce: &[u8], bytes: &[u8], identities: &[Identity]) -> BmResult<MsgPlaintext> {
    for identity in identities {
        let plaintext = match ecies::decrypt(identity.enc_private(), bytes) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let record = parse(header_without_nonce, &plaintext)?;
        if &record.destination_ripe != identity.address.ripe() {
            return Err(BmError::crypto("msg destination ripe does not match the decrypting identity"));
        }
        return Ok(record);
    }
    Err(BmError::crypto("failed to decrypt with given identities"))
}

/// `"Subject:"<subject>"\nBody:"<body>`, the `SIMPLE` wire encoding.
pub fn encode_simple(subject: &str, body: &str) -> Vec<u8> {
    format!("Subject:{}\nBody:{}", subject, body).into_bytes()
}

/// Splits a `SIMPLE`-encoded message. If it doesn't start with `"Subject:"` or has no
/// `"\nBody:"` separator, the whole thing is treated as the body with an empty subject.
pub fn decode_simple(message: &[u8]) -> BmResult<(String, String)> {
    let text = String::from_utf8(message.to_vec())
        .map_err(|e| BmError::codec(format!("SIMPLE message is not valid UTF-8: {}", e)))?;
    match text.strip_prefix("Subject:") {
        Some(rest) => match rest.split_once("\nBody:") {
            Some((subject, body)) => Ok((subject.to_string(), body.to_string())),
            None => Ok((String::new(), text)),
        },
        None => Ok((String::new(), text)),
    }
}
