use memchr::memchr;

use super::record::StationMap;
use crate::decimal::parse_tenths;
use crate::error::BrcError;

/// Line terminator.
pub const TERMINATOR: u8 = b'\n';

/// Separator between key and value.
pub const DELIMITER: u8 = b';';

/// Aggregate every `key;value` line in `data` into a fresh map.
///
/// `data` must start at a line boundary. A missing terminator on the last
/// line is accepted. `base_offset` is the file position of `data[0]` and
/// is only used to locate failures: the first malformed line aborts the
/// chunk with a `Format` or `Parse` error.
pub fn aggregate_chunk(data: &[u8], base_offset: u64) -> Result<StationMap, BrcError> {
    let mut map = StationMap::new();
    aggregate_into(&mut map, data, base_offset)?;
    Ok(map)
}

/// Same as [`aggregate_chunk`], accumulating into an existing map.
pub fn aggregate_into(map: &mut StationMap, data: &[u8], base_offset: u64) -> Result<(), BrcError> {
    let mut pos = 0usize;
    while pos < data.len() {
        let rest = &data[pos..];
        let line_len = memchr(TERMINATOR, rest).unwrap_or(rest.len());
        let line = &rest[..line_len];

        let Some(sep) = memchr(DELIMITER, line) else {
            return Err(BrcError::Format {
                offset: base_offset + pos as u64,
                line: String::from_utf8_lossy(line).into_owned(),
            });
        };
        let value_bytes = &line[sep + 1..];
        let value = match parse_tenths(value_bytes) {
            Ok(v) => v,
            Err(_) => return Err(value_error(line, value_bytes, base_offset + pos as u64)),
        };
        map.observe(&line[..sep], value);

        pos += line_len + 1;
    }
    Ok(())
}

/// A second delimiter means the line has the wrong number of fields;
/// anything else is a bad number.
#[cold]
fn value_error(line: &[u8], value: &[u8], offset: u64) -> BrcError {
    if memchr(DELIMITER, value).is_some() {
        BrcError::Format {
            offset,
            line: String::from_utf8_lossy(line).into_owned(),
        }
    } else {
        BrcError::Parse {
            offset,
            value: String::from_utf8_lossy(value).into_owned(),
        }
    }
}
