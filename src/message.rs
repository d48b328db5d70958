//! The outer `message` envelope: `magic(4) ‖ command(12) ‖ payloadLength(4) ‖ checksum(4) ‖ payload`.
//!
//! Grounded on the teacher's `RawMessage`/`try_consume_message` (`wire_protocol/raw_message.rs`),
//! generalized from Bitcoin's little-endian/double-SHA256 framing to Bitmessage's
//! big-endian/single-SHA512 framing, and from a fixed-size socket buffer to a growable one
//! since Bitmessage payloads run up to 2^18 bytes.

use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser, IOBuffer};
use crate::crypto::hash::sha512;
use crate::error::{BmError, BmResult};

pub const MAGIC: u32 = 0xE9BEB4D9;
pub const COMMAND_LEN: usize = 12;
pub const MAX_PAYLOAD_LEN: usize = 1 << 18;
const HEADER_LEN: usize = 4 + COMMAND_LEN + 4 + 4;

/// A fully framed wire message: a command name and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: String,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(command: impl Into<String>, payload: Vec<u8>) -> BmResult<Self> {
        let command = command.into();
        validate_command(&command)?;
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(BmError::argument(format!(
                "payload of {} bytes exceeds the maximum of {} bytes",
                payload.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        Ok(Message { command, payload })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut composer = ByteBufferComposer::new();
        composer.append_u32_be(MAGIC);
        composer.append(&command_bytes(&self.command));
        composer.append_u32_be(self.payload.len() as u32);
        let checksum = sha512(&self.payload);
        composer.append(&checksum[..4]);
        composer.append(&self.payload);
        composer.result()
    }
}

fn validate_command(command: &str) -> BmResult<()> {
    if command.len() > COMMAND_LEN {
        return Err(BmError::argument(format!(
            "command '{}' is longer than {} bytes",
            command, COMMAND_LEN
        )));
    }
    if !command.is_ascii() {
        return Err(BmError::argument(format!("command '{}' contains non-ASCII characters", command)));
    }
    Ok(())
}

fn command_bytes(command: &str) -> [u8; COMMAND_LEN] {
    let mut bytes = [0u8; COMMAND_LEN];
    bytes[..command.len()].copy_from_slice(command.as_bytes());
    bytes
}

fn parse_command(bytes: &[u8]) -> BmResult<String> {
    let nul_pos = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let (name, padding) = bytes.split_at(nul_pos);
    if !padding.iter().all(|&b| b == 0) {
        return Err(BmError::codec("command field has non-NUL bytes after the name"));
    }
    if !name.iter().all(|&b| b <= 0x7F) {
        return Err(BmError::codec("command field is not ASCII"));
    }
    Ok(String::from_utf8(name.to_vec()).expect("validated ASCII is valid UTF-8"))
}

fn verify_checksum(payload: &[u8], checksum: &[u8]) -> BmResult<()> {
    if checksum == &sha512(payload)[..4] {
        Ok(())
    } else {
        Err(BmError::codec("message checksum mismatch"))
    }
}

/// Decodes exactly one message from a byte slice with no resync; used by callers who
/// already know `bytes` holds a single complete frame.
pub fn decode(bytes: &[u8]) -> BmResult<Message> {
    let mut parser = ByteBufferParser::new(bytes);
    let magic = parser.read_u32_be()?;
    if magic != MAGIC {
        return Err(BmError::codec(format!("expected magic {:#x}, got {:#x}", MAGIC, magic)));
    }
    let command = parse_command(parser.read(COMMAND_LEN)?)?;
    let payload_len = parser.read_u32_be()? as usize;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(BmError::codec(format!("declared payload length {} exceeds the maximum", payload_len)));
    }
    let checksum = parser.read(4)?.to_vec();
    let payload = parser.read(payload_len)?.to_vec();
    verify_checksum(&payload, &checksum)?;
    Ok(Message { command, payload })
}

/// Outcome of a single streaming-decode attempt over a (possibly partial, possibly
/// leading-garbage) buffer.
pub enum DecodeOutcome {
    /// Not enough bytes buffered yet for a full frame.
    Pending,
    /// The buffer did not start with a valid, checksum-clean frame. `bytes_to_drop` bytes
    /// should be removed from the front of the buffer (either up to the next plausible
    /// magic occurrence, or the whole buffer if none was found) before trying again.
    Corrupt { bytes_to_drop: usize },
    /// A complete, valid frame was decoded, consuming `consumed` bytes from the front.
    Ok { message: Message, consumed: usize },
}

/// Streaming decoder: tries to decode one frame from the front of `buffer.content()`.
/// Call in a loop, shifting `buffer` left by the reported byte count after each call,
/// until `Pending` is returned.
pub fn try_decode(buffer: &IOBuffer) -> DecodeOutcome {
    let content = buffer.content();
    if content.len() < HEADER_LEN {
        return DecodeOutcome::Pending;
    }

    let magic_pos = match find_magic(content) {
        Some(0) => 0,
        Some(pos) => return DecodeOutcome::Corrupt { bytes_to_drop: pos },
        None => return DecodeOutcome::Corrupt { bytes_to_drop: content.len() },
    };
    debug_assert_eq!(magic_pos, 0);

    let mut parser = ByteBufferParser::new(content);
    // magic already confirmed present at position 0
    let _ = parser.read_u32_be();
    let command_bytes = match parser.read(COMMAND_LEN) {
        Ok(b) => b,
        Err(_) => return DecodeOutcome::Pending,
    };
    let command = match parse_command(command_bytes) {
        Ok(c) => c,
        Err(_) => return DecodeOutcome::Corrupt { bytes_to_drop: next_resync_offset(content) },
    };
    let payload_len = match parser.read_u32_be() {
        Ok(len) => len as usize,
        Err(_) => return DecodeOutcome::Pending,
    };
    if payload_len > MAX_PAYLOAD_LEN {
        return DecodeOutcome::Corrupt { bytes_to_drop: next_resync_offset(content) };
    }
    let checksum = match parser.read(4) {
        Ok(c) => c.to_vec(),
        Err(_) => return DecodeOutcome::Pending,
    };
    if parser.remaining() < payload_len {
        return DecodeOutcome::Pending;
    }
    let payload = parser.read(payload_len).expect("length checked above").to_vec();
    if verify_checksum(&payload, &checksum).is_err() {
        return DecodeOutcome::Corrupt { bytes_to_drop: next_resync_offset(content) };
    }

    DecodeOutcome::Ok {
        message: Message { command, payload },
        consumed: HEADER_LEN + payload_len,
    }
}

fn find_magic(content: &[u8]) -> Option<usize> {
    let magic_bytes = MAGIC.to_be_bytes();
    content.windows(4).position(|w| w == magic_bytes)
}

/// After rejecting the frame starting at position 0, find the next plausible magic
/// occurrence (searching from byte 1 onward) to resync to.
fn next_resync_offset(content: &[u8]) -> usize {
    let magic_bytes = MAGIC.to_be_bytes();
    content[1..]
        .windows(4)
        .position(|w| w == magic_bytes)
        .map(|pos| pos + 1)
        .unwrap_or(content.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn encode_matches_known_vector() {
        let message = Message::new("test", b"payload".to_vec()).unwrap();
        assert_eq!(
            message.to_bytes(),
            hex!("e9beb4d97465737400000000000000000000000770b33ce97061796c6f6164")
        );
    }

    #[test]
    fn decode_round_trips() {
        let message = Message::new("test", b"payload".to_vec()).unwrap();
        let bytes = message.to_bytes();
        assert_eq!(decode(&bytes).unwrap(), message);
    }

    #[test]
    fn rejects_bad_checksum() {
        let message = Message::new("test", b"payload".to_vec()).unwrap();
        let mut bytes = message.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn rejects_oversize_command() {
        assert!(Message::new("a_command_that_is_too_long", vec![]).is_err());
    }

    #[test]
    fn streaming_decoder_resyncs_past_leading_garbage() {
        let message = Message::new("test", b"payload".to_vec()).unwrap();
        let framed = message.to_bytes();

        let mut garbage = vec![0xAAu8; 10];
        garbage.extend_from_slice(&framed);
        garbage.extend_from_slice(b"trailing-rest");

        let mut buffer = IOBuffer::default();
        buffer.extend(&garbage);

        match try_decode(&buffer) {
            DecodeOutcome::Corrupt { bytes_to_drop } => {
                assert_eq!(bytes_to_drop, 10);
                buffer.shift_left(bytes_to_drop);
            }
            _ => panic!("expected a corruption report for the leading garbage"),
        }

        match try_decode(&buffer) {
            DecodeOutcome::Ok { message: decoded, consumed } => {
                assert_eq!(decoded, message);
                buffer.shift_left(consumed);
            }
            _ => panic!("expected a clean decode after resync"),
        }

        assert_eq!(buffer.content(), b"trailing-rest");
    }

    #[test]
    fn streaming_decoder_reports_pending_on_partial_frame() {
        let message = Message::new("test", b"payload".to_vec()).unwrap();
        let framed = message.to_bytes();

        let mut buffer = IOBuffer::default();
        buffer.extend(&framed[..framed.len() - 2]);
        assert!(matches!(try_decode(&buffer), DecodeOutcome::Pending));
    }
}
