//! `var_str` = `var_int(len)` ‖ UTF-8 bytes.

use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::var_int::{read_var_int_safe, write_var_int};
use crate::error::{BmError, BmResult};

pub fn write_var_str(composer: &mut ByteBufferComposer, value: &str) {
    let bytes = value.as_bytes();
    write_var_int(composer, bytes.len() as u64);
    composer.append(bytes);
}

pub fn read_var_str(parser: &mut ByteBufferParser<'_>) -> BmResult<String> {
    let len = read_var_int_safe(parser)? as usize;
    if len > parser.remaining() {
        return Err(BmError::codec(format!(
            "var_str declares {} bytes but only {} remain",
            len,
            parser.remaining()
        )));
    }
    let bytes = parser.read(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| BmError::codec(format!("var_str is not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips() {
        for s in ["", "hello", "Сообщение", "a".repeat(300).as_str()] {
            let mut composer = ByteBufferComposer::new();
            write_var_str(&mut composer, s);
            let bytes = composer.result();
            let mut parser = ByteBufferParser::new(&bytes);
            assert_eq!(read_var_str(&mut parser).unwrap(), s);
        }
    }

    #[test]
    fn rejects_declared_length_beyond_buffer() {
        let bytes = [0xFD, 0x00, 0xFF]; // declares 255 bytes, none follow
        let mut parser = ByteBufferParser::new(&bytes);
        assert!(read_var_str(&mut parser).is_err());
    }
}
