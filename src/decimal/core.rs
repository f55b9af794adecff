use thiserror::Error;

/// The value bytes are not `-?D.D` or `-?DD.D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected a number of the form -?D.D or -?DD.D")]
pub struct InvalidDecimal;

/// Convert one ASCII digit. `wrapping_sub` folds every byte below b'0'
/// into the > 9 range, so one compare rejects all non-digits.
#[inline(always)]
fn digit(b: u8) -> Result<i32, InvalidDecimal> {
    let d = b.wrapping_sub(b'0');
    if d > 9 {
        return Err(InvalidDecimal);
    }
    Ok(d as i32)
}

/// Parse a fixed-point value with exactly one fractional digit into tenths.
///
/// `b"23.4"` → `234`, `b"-5.5"` → `-55`. The byte after the first digit
/// decides between the one- and two-digit integer forms; no scan for the
/// decimal point, no float and no generic numeric parsing.
#[inline]
pub fn parse_tenths(bytes: &[u8]) -> Result<i32, InvalidDecimal> {
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some(_) => (false, bytes),
        None => return Err(InvalidDecimal),
    };
    let value = match *digits {
        [a, b'.', c] => digit(a)? * 10 + digit(c)?,
        [a, b, b'.', c] => digit(a)? * 100 + digit(b)? * 10 + digit(c)?,
        _ => return Err(InvalidDecimal),
    };
    Ok(if negative { -value } else { value })
}
