//! `var_int`: shortest-form variable length integer encoding.
//!
//! size | first byte | value range
//! ---  | ---------- | -----------
//! 1    | < 0xFD     | 0 .. 252
//! 3    | 0xFD       | 253 .. 65535
//! 5    | 0xFE       | 65536 .. 2^32-1
//! 9    | 0xFF       | 2^32 .. 2^64-1
//!
//! Decoding rejects any encoding that isn't the shortest possible form for its value.

use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::error::{BmError, BmResult};

/// Largest integer value that can be represented exactly as an `f64`/JS safe-integer;
/// callers asking for a native integer (list counts, stream numbers, …) must stay under it.
pub const MAX_SAFE_INTEGER: u64 = (1u64 << 53) - 1;

pub fn write_var_int(composer: &mut ByteBufferComposer, value: u64) {
    if value < 0xFD {
        composer.append_u8(value as u8);
    } else if value < 0x1_0000 {
        composer.append_u8(0xFD);
        composer.append_u16_be(value as u16);
    } else if value < 0x1_0000_0000 {
        composer.append_u8(0xFE);
        composer.append_u32_be(value as u32);
    } else {
        composer.append_u8(0xFF);
        composer.append_u64_be(value);
    }
}

/// Encodes a raw big-endian byte buffer (up to 8 bytes) using the 9-byte `0xFF` form,
/// zero-left-padded to 8 bytes. Used when the caller holds a 64-bit value (e.g. a time
/// field) as raw bytes rather than as a native integer.
pub fn write_var_int_from_bytes(composer: &mut ByteBufferComposer, raw: &[u8]) -> BmResult<()> {
    if raw.len() > 8 {
        return Err(BmError::argument(format!(
            "var_int raw buffer must be at most 8 bytes, got {}",
            raw.len()
        )));
    }
    let mut padded = [0u8; 8];
    padded[8 - raw.len()..].copy_from_slice(raw);
    composer.append_u8(0xFF);
    composer.append(&padded);
    Ok(())
}

/// Decodes a `var_int` to a full-width `u64`, accepting any wire-representable value.
pub fn read_var_int(parser: &mut ByteBufferParser<'_>) -> BmResult<u64> {
    let first = parser.read_u8()?;
    match first {
        0xFF => {
            let value = parser.read_u64_be()?;
            if value < 0x1_0000_0000 {
                Err(BmError::codec("non-minimal var_int: 9-byte form used for a value that fits in 5 bytes"))
            } else {
                Ok(value)
            }
        }
        0xFE => {
            let value = parser.read_u32_be()? as u64;
            if value < 0x1_0000 {
                Err(BmError::codec("non-minimal var_int: 5-byte form used for a value that fits in 3 bytes"))
            } else {
                Ok(value)
            }
        }
        0xFD => {
            let value = parser.read_u16_be()? as u64;
            if value < 0xFD {
                Err(BmError::codec("non-minimal var_int: 3-byte form used for a value that fits in 1 byte"))
            } else {
                Ok(value)
            }
        }
        b => Ok(b as u64),
    }
}

/// Decodes a `var_int` and rejects values that don't fit in the 53-bit "safe integer"
/// range a caller wants to treat as a native `usize`/`u32`-ish count.
pub fn read_var_int_safe(parser: &mut ByteBufferParser<'_>) -> BmResult<u64> {
    let value = read_var_int(parser)?;
    if value > MAX_SAFE_INTEGER {
        Err(BmError::argument(format!(
            "var_int value {} exceeds the maximum safe integer {}",
            value, MAX_SAFE_INTEGER
        )))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    fn roundtrip(value: u64) -> u64 {
        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, value);
        let bytes = composer.result();
        let mut parser = ByteBufferParser::new(&bytes);
        read_var_int(&mut parser).unwrap()
    }

    #[rstest]
    #[case(0)]
    #[case(252)]
    #[case(253)]
    #[case(65535)]
    #[case(65536)]
    #[case(0xFFFF_FFFF)]
    #[case(0x1_0000_0000)]
    #[case(MAX_SAFE_INTEGER)]
    fn round_trips_boundary_values(#[case] value: u64) {
        assert_eq!(roundtrip(value), value);
    }

    #[test]
    fn rejects_non_minimal_encodings() {
        let cases: &[&[u8]] = &[
            &[0xFD, 0x00, 0xFC],
            &[0xFE, 0x00, 0x00, 0xFF, 0xFF],
            &[0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF],
        ];
        for bytes in cases {
            let mut parser = ByteBufferParser::new(bytes);
            assert!(read_var_int(&mut parser).is_err(), "expected rejection of {:?}", bytes);
        }
    }

    #[test]
    fn rejects_unsafe_integers() {
        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, 1u64 << 53);
        let bytes = composer.result();
        let mut parser = ByteBufferParser::new(&bytes);
        assert!(read_var_int_safe(&mut parser).is_err());
    }

    #[test]
    fn encodes_shortest_form() {
        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, 252);
        assert_eq!(composer.result(), vec![252]);

        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, 253);
        assert_eq!(composer.result(), vec![0xFD, 0x00, 0xFD]);
    }

    #[test]
    fn raw_byte_form_zero_pads() {
        let mut composer = ByteBufferComposer::new();
        write_var_int_from_bytes(&mut composer, &[0x01, 0x02]).unwrap();
        let bytes = composer.result();
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(&bytes[1..], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
    }
}
