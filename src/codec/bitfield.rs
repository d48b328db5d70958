//! Fixed-width big-endian bitfields. Bit positions are human-numbered from the
//! least-significant bit of the *last* byte, i.e. position 0 is the lowest bit of a
//! big-endian-encoded integer: `byte_index = len_bytes - 1 - floor(pos / 8)`,
//! `mask = 1 << (pos % 8)`.

use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::error::{BmError, BmResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitfield {
    bytes: Vec<u8>,
}

impl Bitfield {
    pub fn new(len_bytes: usize) -> Self {
        Bitfield { bytes: vec![0; len_bytes] }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Bitfield { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    fn locate(&self, pos: u32) -> BmResult<(usize, u8)> {
        let n_bits = self.bytes.len() as u32 * 8;
        if pos >= n_bits {
            return Err(BmError::argument(format!(
                "bit position {} is out of range for a {}-byte bitfield",
                pos,
                self.bytes.len()
            )));
        }
        let byte_index = self.bytes.len() - 1 - (pos / 8) as usize;
        let mask = 1u8 << (pos % 8);
        Ok((byte_index, mask))
    }

    pub fn get(&self, pos: u32) -> BmResult<bool> {
        let (byte_index, mask) = self.locate(pos)?;
        Ok(self.bytes[byte_index] & mask != 0)
    }

    pub fn set(&mut self, pos: u32, value: bool) -> BmResult<()> {
        let (byte_index, mask) = self.locate(pos)?;
        if value {
            self.bytes[byte_index] |= mask;
        } else {
            self.bytes[byte_index] &= !mask;
        }
        Ok(())
    }

    pub fn write(&self, composer: &mut ByteBufferComposer) {
        composer.append(&self.bytes);
    }

    pub fn read(parser: &mut ByteBufferParser<'_>, len_bytes: usize) -> BmResult<Self> {
        Ok(Bitfield::from_bytes(parser.read(len_bytes)?.to_vec()))
    }
}

/// 8-byte service bitfield carried in `version` messages and `pubkey`/`msg` records.
pub mod services {
    pub const NODE_NETWORK: u32 = 0;
    /// Reserved position; the source marks this as a defined-but-unused gateway bit.
    pub const NODE_GATEWAY: u32 = 1;
    /// Reserved position; the source marks this as a defined-but-unused mobile-node bit.
    pub const NODE_MOBILE: u32 = 2;
    pub const LEN_BYTES: usize = 8;
}

/// 4-byte behavior bitfield carried in `pubkey`/`msg` records.
pub mod pubkey_behavior {
    pub const INCLUDE_DESTINATION: u32 = 30;
    pub const DOES_ACK: u32 = 31;
    pub const LEN_BYTES: usize = 4;
}
