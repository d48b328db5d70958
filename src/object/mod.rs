//! The `object` envelope shared by every flooded payload type (`getpubkey`, `pubkey`,
//! `msg`, `broadcast`): a nonce/expiry/type/version/stream header ahead of a
//! type-specific body.
//!
//! Grounded on the teacher's `RawMessage` framing (`peer/wire_protocol.rs`), generalized
//! one layer down: a `message` frame carries one object, and an object carries its own
//! PoW-gated header ahead of a type-specific body rather than a bare command/payload pair.

pub mod broadcast;
pub mod getpubkey;
pub mod msg;
pub mod pubkey;

use strum::{EnumIter, IntoEnumIterator};

use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::var_int::{read_var_int, write_var_int};
use crate::crypto::hash::sha512;
use crate::error::{BmError, BmResult};
use crate::pow;

/// Matches the outer `message` frame's payload ceiling; an object never needs to be
/// larger than a single frame can carry.
pub const MAX_OBJECT_PAYLOAD_LEN: usize = 1 << 18;
const NONCE_LEN: usize = 8;

pub const TYPE_GETPUBKEY: u32 = 0;
pub const TYPE_PUBKEY: u32 = 1;
pub const TYPE_MSG: u32 = 2;
pub const TYPE_BROADCAST: u32 = 3;

/// The known object types, for callers that want to enumerate or recognize them rather
/// than match the raw wire code directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ObjectType {
    GetPubkey,
    Pubkey,
    Msg,
    Broadcast,
}

impl ObjectType {
    pub fn code(self) -> u32 {
        match self {
            ObjectType::GetPubkey => TYPE_GETPUBKEY,
            ObjectType::Pubkey => TYPE_PUBKEY,
            ObjectType::Msg => TYPE_MSG,
            ObjectType::Broadcast => TYPE_BROADCAST,
        }
    }

    /// Resolves a wire type code to the known `ObjectType` it matches, if any.
    pub fn from_code(code: u32) -> Option<Self> {
        ObjectType::iter().find(|t| t.code() == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub expires_time: u64,
    pub object_type: u32,
    pub version: u64,
    pub stream: u64,
}

/// `expiresTime(8) ‖ type(4) ‖ var_int(version) ‖ var_int(stream) ‖ objectPayload`, ready
/// for a PoW search to prepend the nonce it finds.
pub fn encode_payload_without_nonce(header: &ObjectHeader, object_payload: &[u8]) -> Vec<u8> {
    let mut composer = ByteBufferComposer::new();
    composer.append_u64_be(header.expires_time);
    composer.append_u32_be(header.object_type);
    write_var_int(&mut composer, header.version);
    write_var_int(&mut composer, header.stream);
    composer.append(object_payload);
    composer.result()
}

/// Prepends a found nonce to the result of [`encode_payload_without_nonce`].
pub fn encode_payload(nonce: u64, payload_without_nonce: &[u8]) -> Vec<u8> {
    let mut composer = ByteBufferComposer::new();
    composer.append_u64_be(nonce);
    composer.append(payload_without_nonce);
    composer.result()
}

/// The proof-of-work parameters to verify a decoded object against. `None` skips the
/// check entirely (e.g. a node re-validating an object it already admitted).
#[derive(Debug, Clone, Copy)]
pub struct PowParams {
    pub nonce_trials_per_byte: u64,
    pub payload_length_extra_bytes: u64,
}

/// A decoded object envelope. `header_length` is the byte offset (from the start of
/// `bytes`, i.e. including the 8-byte nonce) where `object_payload` begins; per-type
/// decoders use it to recover the exact `objectHeaderWithoutNonce` region they sign over.
#[derive(Debug, Clone)]
pub struct DecodedObject {
    pub nonce: u64,
    pub header: ObjectHeader,
    pub ttl: i64,
    pub header_length: usize,
    pub object_payload: Vec<u8>,
}

impl DecodedObject {
    pub fn header_without_nonce<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[NONCE_LEN..self.header_length]
    }
}

/// Decodes an object's envelope out of `bytes` (nonce included). `now` is the decoder's
/// wall-clock time in unix seconds, used only to compute `ttl`. Passing `pow` verifies
/// the proof-of-work against the given parameters; `None` skips verification.
pub fn decode(bytes: &[u8], now: u64, pow_verification: Option<PowParams>) -> BmResult<DecodedObject> {
    if bytes.len() > NONCE_LEN + MAX_OBJECT_PAYLOAD_LEN {
        return Err(BmError::argument(format!(
            "object of {} bytes exceeds the maximum payload of {} bytes",
            bytes.len(),
            MAX_OBJECT_PAYLOAD_LEN
        )));
    }

    let mut parser = ByteBufferParser::new(bytes);
    let nonce = parser.read_u64_be()?;
    let expires_time = parser.read_u64_be()?;
    let object_type = parser.read_u32_be()?;
    let version = read_var_int(&mut parser)?;
    let stream = read_var_int(&mut parser)?;
    let header_length = parser.pos();
    let object_payload = parser.read(parser.remaining())?.to_vec();

    if let Some(params) = pow_verification {
        let payload_without_nonce = &bytes[NONCE_LEN..];
        let initial_hash = sha512(payload_without_nonce);
        let ttl = expires_time.saturating_sub(now);
        let target = pow::get_target(
            ttl,
            payload_without_nonce.len() as u64,
            params.nonce_trials_per_byte,
            params.payload_length_extra_bytes,
        )?;
        if !pow::check(nonce, target, &initial_hash) {
            return Err(BmError::pow("object does not meet its declared proof-of-work target"));
        }
    }

    Ok(DecodedObject {
        nonce,
        header: ObjectHeader { expires_time, object_type, version, stream },
        ttl: expires_time as i64 - now as i64,
        header_length,
        object_payload,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object_type_round_trips_through_its_wire_code() {
        for t in ObjectType::iter() {
            assert_eq!(ObjectType::from_code(t.code()), Some(t));
        }
        assert_eq!(ObjectType::from_code(99), None);
    }

    #[test]
    fn round_trips_without_pow_check() {
        let header = ObjectHeader { expires_time: 2_000_000_000, object_type: TYPE_MSG, version: 1, stream: 1 };
        let payload_without_nonce = encode_payload_without_nonce(&header, b"body");
        let bytes = encode_payload(42, &payload_without_nonce);

        let decoded = decode(&bytes, 1_999_999_000, None).unwrap();
        assert_eq!(decoded.nonce, 42);
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.ttl, 1000);
        assert_eq!(decoded.object_payload, b"body");
        assert_eq!(decoded.header_without_nonce(&bytes), &payload_without_nonce[..payload_without_nonce.len() - 4]);
    }

    #[test]
    fn rejects_oversize_object() {
        let header = ObjectHeader { expires_time: 0, object_type: TYPE_MSG, version: 1, stream: 1 };
        let oversized_body = vec![0u8; MAX_OBJECT_PAYLOAD_LEN + 1];
        let payload_without_nonce = encode_payload_without_nonce(&header, &oversized_body);
        let bytes = encode_payload(0, &payload_without_nonce);
        assert!(decode(&bytes, 0, None).is_err());
    }

    #[test]
    fn pow_check_rejects_insufficient_nonce() {
        let header = ObjectHeader { expires_time: 1000, object_type: TYPE_MSG, version: 1, stream: 1 };
        let payload_without_nonce = encode_payload_without_nonce(&header, b"x");
        let bytes = encode_payload(0, &payload_without_nonce);
        let params = PowParams { nonce_trials_per_byte: 1_000_000_000, payload_length_extra_bytes: 1000 };
        assert!(decode(&bytes, 0, Some(params)).is_err());
    }
}
