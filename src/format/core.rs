use std::io::{self, Write};

use crate::aggregate::{Record, StationMap};

/// Mean of `count` observations summing to `sum` tenths, as tenths.
///
/// Rounds to nearest with ties to even, computed exactly in integers.
/// `count` must be non-zero.
pub fn mean_tenths(sum: i64, count: u64) -> i64 {
    let sum = sum as i128;
    let count = count as i128;
    let q = sum.div_euclid(count);
    let r = sum.rem_euclid(count);
    let twice = 2 * r;
    let rounded = if twice > count || (twice == count && q % 2 != 0) {
        q + 1
    } else {
        q
    };
    rounded as i64
}

/// Append `tenths` rendered with exactly one fractional digit.
/// Zero is always `0.0`, never `-0.0`.
pub fn push_tenths(out: &mut String, tenths: i64) {
    if tenths < 0 {
        out.push('-');
    }
    let abs = tenths.unsigned_abs();
    let mut buf = itoa::Buffer::new();
    out.push_str(buf.format(abs / 10));
    out.push('.');
    out.push((b'0' + (abs % 10) as u8) as char);
}

/// Append `key=min/mean/max`. Keys that are not UTF-8 are rendered lossily.
pub fn push_entry(out: &mut String, key: &[u8], record: &Record) {
    out.push_str(&String::from_utf8_lossy(key));
    out.push('=');
    push_tenths(out, record.min as i64);
    out.push('/');
    push_tenths(out, mean_tenths(record.sum, record.count));
    out.push('/');
    push_tenths(out, record.max as i64);
}

/// Render `{k1=min/mean/max, k2=...}` with keys in ascending byte order.
pub fn format_results(map: &StationMap) -> String {
    let entries = map.sorted();
    // ~24 bytes per entry covers a typical key plus three figures.
    let mut out = String::with_capacity(2 + entries.len() * 24);
    out.push('{');
    for (i, (key, record)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_entry(&mut out, key, record);
    }
    out.push('}');
    out
}

/// Write the formatted result followed by a newline.
pub fn write_results(out: &mut impl Write, map: &StationMap) -> io::Result<()> {
    let text = format_results(map);
    out.write_all(text.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}
