//! `var_int_list` = `var_int(n)` ‖ n `var_int`s.

use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::var_int::{read_var_int, read_var_int_safe, write_var_int};
use crate::error::{BmError, BmResult};

/// TODO in the reference client mentions ~160,000 as the practical ceiling for stream
/// number lists; accept up to that and no higher so a hostile peer can't force an
/// unbounded allocation via a single var_int count.
pub const MAX_LIST_LEN: u64 = 160_000;

pub fn write_var_int_list(composer: &mut ByteBufferComposer, values: &[u64]) {
    write_var_int(composer, values.len() as u64);
    for &v in values {
        write_var_int(composer, v);
    }
}

pub fn read_var_int_list(parser: &mut ByteBufferParser<'_>) -> BmResult<Vec<u64>> {
    let count = read_var_int_safe(parser)?;
    if count > MAX_LIST_LEN {
        return Err(BmError::argument(format!(
            "var_int_list count {} exceeds the maximum of {}",
            count, MAX_LIST_LEN
        )));
    }
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        values.push(read_var_int(parser)?);
    }
    Ok(values)
}
