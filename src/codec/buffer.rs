use crate::error::{BmError, BmResult};

/// Cursor over a borrowed byte slice. All Bitmessage wire integers are big-endian,
/// unlike the little-endian Bitcoin wire format.
pub struct ByteBufferParser<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> ByteBufferParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        ByteBufferParser { buffer, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }

    pub fn skip_bytes(&mut self, count: usize) -> BmResult<()> {
        self.eof_check(count)?;
        self.pos += count;
        Ok(())
    }

    pub fn read(&mut self, size: usize) -> BmResult<&'a [u8]> {
        self.eof_check(size)?;
        let range = self.pos..self.pos + size;
        self.pos += size;
        Ok(&self.buffer[range])
    }

    pub fn read_u8(&mut self) -> BmResult<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> BmResult<u16> {
        Ok(u16::from_be_bytes(self.read(2)?.try_into().unwrap()))
    }

    pub fn read_u32_be(&mut self) -> BmResult<u32> {
        Ok(u32::from_be_bytes(self.read(4)?.try_into().unwrap()))
    }

    pub fn read_u64_be(&mut self) -> BmResult<u64> {
        Ok(u64::from_be_bytes(self.read(8)?.try_into().unwrap()))
    }

    fn eof_check(&self, want_bytes: usize) -> BmResult<()> {
        if self.remaining() < want_bytes {
            Err(BmError::codec(format!(
                "can not read {} bytes from buffer of size {} (pos {})",
                want_bytes,
                self.buffer.len(),
                self.pos
            )))
        } else {
            Ok(())
        }
    }
}

/// Accumulates bytes for an outbound encode; mirrors [`ByteBufferParser`] on the write side.
#[derive(Default)]
pub struct ByteBufferComposer {
    buffer: Vec<u8>,
}

impl ByteBufferComposer {
    pub fn new() -> Self {
        ByteBufferComposer { buffer: vec![] }
    }

    pub fn result(self) -> Vec<u8> {
        self.buffer
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn append_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn append_u16_be(&mut self, value: u16) {
        self.append(&value.to_be_bytes());
    }

    pub fn append_u32_be(&mut self, value: u32) {
        self.append(&value.to_be_bytes());
    }

    pub fn append_u64_be(&mut self, value: u64) {
        self.append(&value.to_be_bytes());
    }
}

/// Growable inbound byte buffer for the streaming frame decoder. Unlike the
/// teacher's fixed 1024-byte socket buffer, Bitmessage payloads range up to
/// 2^18 bytes plus the frame header, so this buffer grows with `extend`.
pub struct IOBuffer {
    buffer: Vec<u8>,
}

impl IOBuffer {
    pub fn content(&self) -> &[u8] {
        &self.buffer
    }

    /// Appends freshly received bytes (e.g. from a transport's `on_bytes` callback).
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Removes `size` bytes from the front of the buffer, as done once a message has
    /// been fully consumed (or skipped as corrupt) by the decoder.
    pub fn shift_left(&mut self, size: usize) {
        assert!(size <= self.buffer.len());
        self.buffer.drain(..size);
    }
}

impl Default for IOBuffer {
    fn default() -> Self {
        IOBuffer { buffer: Vec::new() }
    }
}
