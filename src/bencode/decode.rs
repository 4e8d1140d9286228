use std::ops::Range;
use std::path::Path;

use bytes::Bytes;
use log::{debug, trace};

use super::error::BencodeError;
use crate::bencode::bvalue::{BDict, BKind, BValue};

// Deeper nesting is rejected instead of risking the stack.
const MAX_DEPTH: usize = 128;

/// Decodes the first value in `input`. Anything after it is ignored.
pub fn decode(input: &[u8]) -> Result<BValue, BencodeError> {
    decode_buf(Bytes::copy_from_slice(input))
}

/// Same as [`decode`] but takes ownership of the buffer, so spans share it
/// without copying.
pub fn decode_buf(buf: Bytes) -> Result<BValue, BencodeError> {
    let (value, next) = decode_range(&buf, 0..buf.len())?;
    if next < buf.len() {
        debug!("Ignoring {} trailing bytes after bencoded value", buf.len() - next);
    }
    Ok(value)
}

/// Decodes one value and reports how many bytes it took, so callers can
/// chain decodes over a buffer.
pub fn decode_bencode(input: &[u8]) -> Result<(usize, BValue), BencodeError> {
    let buf = Bytes::copy_from_slice(input);
    let (value, next) = decode_range(&buf, 0..buf.len())?;
    Ok((next, value))
}

/// Decodes one value inside the window `range` of `buf` and returns it with
/// the offset of the first byte after it.
pub fn decode_range(buf: &Bytes, range: Range<usize>) -> Result<(BValue, usize), BencodeError> {
    let upper = range.end.min(buf.len());
    let lower = range.start;

    match parse_value(buf, lower, upper, 0)? {
        Some(parsed) => Ok(parsed),
        None => Err(BencodeError::UnexpectedTerminator { offset: lower }),
    }
}

/// Reads the whole file and decodes it.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<BValue, BencodeError> {
    let data = std::fs::read(path.as_ref())?;
    trace!("Read {} bytes from {}", data.len(), path.as_ref().display());
    decode_buf(Bytes::from(data))
}

/// Dispatches on the byte at `lower`. `Ok(None)` means a terminator sits
/// where a value was expected, which ends the enclosing list or dictionary.
fn parse_value(
    buf: &Bytes,
    lower: usize,
    upper: usize,
    depth: usize,
) -> Result<Option<(BValue, usize)>, BencodeError> {
    if lower >= upper {
        return Err(BencodeError::TruncatedInput { offset: lower });
    }

    match buf[lower] {
        b'e' => Ok(None),
        b'i' => parse_integer(buf, lower, upper).map(Some),
        b'l' => parse_list(buf, lower, upper, depth).map(Some),
        b'd' => parse_dict(buf, lower, upper, depth).map(Some),
        c if c.is_ascii_digit() => parse_string(buf, lower, upper).map(Some),
        byte => Err(BencodeError::UnexpectedByte { byte, offset: lower }),
    }
}

/// `i<digits>e`, with an optional leading minus sign.
fn parse_integer(buf: &Bytes, lower: usize, upper: usize) -> Result<(BValue, usize), BencodeError> {
    let body_start = lower + 1;
    let end = buf[body_start..upper]
        .iter()
        .position(|&b| b == b'e')
        .map(|p| body_start + p)
        .ok_or(BencodeError::TruncatedInput { offset: upper })?;

    let body = &buf[body_start..end];
    let digits = body.strip_prefix(b"-").unwrap_or(body);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(BencodeError::InvalidIntegerLiteral { offset: lower });
    }

    // only ASCII gets here, so the UTF-8 check cannot fail; overflow can
    let parsed = std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(BencodeError::InvalidIntegerLiteral { offset: lower })?;

    let next = end + 1;
    Ok((BValue::new(BKind::Integer(parsed), buf.slice(lower..next)), next))
}

/// `<length>:<bytes>`
fn parse_string(buf: &Bytes, lower: usize, upper: usize) -> Result<(BValue, usize), BencodeError> {
    let colon = buf[lower..upper]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map(|p| lower + p)
        .ok_or(BencodeError::TruncatedInput { offset: upper })?;

    if buf[colon] != b':' {
        return Err(BencodeError::InvalidLengthPrefix { offset: lower });
    }

    let length = std::str::from_utf8(&buf[lower..colon])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or(BencodeError::InvalidLengthPrefix { offset: lower })?;

    let start = colon + 1;
    let end = start
        .checked_add(length)
        .filter(|&end| end <= upper)
        .ok_or(BencodeError::TruncatedInput { offset: upper })?;

    let value = BValue::new(BKind::ByteString(buf.slice(start..end)), buf.slice(lower..end));
    Ok((value, end))
}

/// `l<values>e`
fn parse_list(buf: &Bytes, lower: usize, upper: usize, depth: usize) -> Result<(BValue, usize), BencodeError> {
    let (items, next) = parse_elements(buf, lower, upper, depth)?;
    Ok((BValue::new(BKind::List(items), buf.slice(lower..next)), next))
}

/// `d<key><value>...e`, read as a flat element sequence and paired up
/// afterwards. Keys that are not text are dropped along with their value,
/// as is a final element without a partner. A repeated key keeps its first
/// position and its last value.
fn parse_dict(buf: &Bytes, lower: usize, upper: usize, depth: usize) -> Result<(BValue, usize), BencodeError> {
    let (items, next) = parse_elements(buf, lower, upper, depth)?;

    if items.len() % 2 != 0 {
        debug!("Dropping unpaired trailing element in dictionary at byte {}", lower);
    }

    let mut map = BDict::with_capacity(items.len() / 2);
    let mut elements = items.into_iter();
    while let (Some(key), Some(value)) = (elements.next(), elements.next()) {
        match key.as_str() {
            Some(text) => {
                map.insert(text.to_string(), value);
            }
            None => debug!("Dropping dictionary entry with non-text key at byte {}", lower),
        }
    }

    Ok((BValue::new(BKind::Dict(map), buf.slice(lower..next)), next))
}

/// Parses the values of a list or dictionary whose opening byte is at
/// `lower`, returning them with the offset just past the terminator.
fn parse_elements(
    buf: &Bytes,
    lower: usize,
    upper: usize,
    depth: usize,
) -> Result<(Vec<BValue>, usize), BencodeError> {
    if depth >= MAX_DEPTH {
        return Err(BencodeError::NestingTooDeep { offset: lower });
    }

    let mut idx = lower + 1; // skip 'l' or 'd'
    let mut items = Vec::new();

    loop {
        if idx >= upper {
            return Err(BencodeError::UnterminatedContainer { offset: lower });
        }
        match parse_value(buf, idx, upper, depth + 1)? {
            Some((value, next)) => {
                items.push(value);
                idx = next;
            }
            // add 1 to account for 'e'
            None => return Ok((items, idx + 1)),
        }
    }
}
