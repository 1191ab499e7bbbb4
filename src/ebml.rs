//! Just enough EBML (RFC 8794) to find one element in a file.

use std::{fmt::Debug, ops::Range};

use log::debug;
use nom::{
    IResult,
    Parser,
    bytes::complete::take,
    combinator::peek,
    error::{Error, ErrorKind},
    number::complete::be_u8,
};

use crate::error::FormatError;

/// Max amount of bytes a VINT can span.
pub const VINT_MAX_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult<T>
where
    T: Copy + Debug,
{
    pub value: T,
    pub bytes_read: usize,
}

impl ReadResult<u64> {
    /// A size with all value bits set means "unknown size".
    #[must_use]
    pub const fn is_unknown_size(&self) -> bool {
        self.value == (1 << (7 * self.bytes_read)) - 1
    }
}

/// Variable-size integer: the count of leading zero bits in the first byte is
/// the width minus one, the bits after the marker bit are the value.
pub fn vint(input: &[u8]) -> IResult<&[u8], ReadResult<u64>> {
    let (_, first) = peek(be_u8).parse(input)?;
    let width = first.leading_zeros() as usize + 1;
    if width > VINT_MAX_WIDTH {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }

    let (input, bytes) = take(width).parse(input)?;
    let marker_mask = (1u64 << (8 - width)) - 1;
    let value = bytes[1..]
        .iter()
        .fold(u64::from(first) & marker_mask, |acc, &byte| {
            (acc << 8) | u64::from(byte)
        });

    Ok((input, ReadResult {
        value,
        bytes_read: width,
    }))
}

/// Reads a VINT at `start`, not looking past `end`.
pub fn read_vint(data: &[u8], start: usize, end: usize) -> Result<ReadResult<u64>, FormatError> {
    match vint(&data[start..end]) {
        Ok((_, result)) => Ok(result),
        Err(nom::Err::Failure(_)) => Err(FormatError::MalformedVint(start)),
        Err(_) => Err(FormatError::Truncated(start)),
    }
}

/// Encodes `value` as a VINT of exactly `width` bytes.
///
/// Returns `None` if the value does not fit.
#[must_use]
pub fn write_vint(value: u64, width: usize) -> Option<Vec<u8>> {
    if width == 0 || width > VINT_MAX_WIDTH || value >= (1 << (7 * width)) {
        return None;
    }
    let marked = value | (1 << (7 * width));
    Some(marked.to_be_bytes()[8 - width..].to_vec())
}

/// The currently open scope of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementCursor {
    pub start: usize,
    pub end: usize,
}

impl ElementCursor {
    #[must_use]
    pub const fn new(data: &[u8]) -> Self {
        Self {
            start: 0,
            end: data.len(),
        }
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.start >= self.end
    }

    /// Reads the element ID at the cursor and moves past it.
    pub fn read_id(&mut self, data: &[u8]) -> Result<u64, FormatError> {
        let id = read_vint(data, self.start, self.end)?;
        self.start += id.bytes_read;
        Ok(id.value)
    }

    /// Returns the byte span of the element payload starting after its size.
    fn payload(&self, data: &[u8]) -> Result<Range<usize>, FormatError> {
        let size = read_vint(data, self.start, self.end)?;
        let payload_start = self.start + size.bytes_read;
        if size.is_unknown_size() {
            return Ok(payload_start..self.end);
        }

        usize::try_from(size.value)
            .ok()
            .and_then(|len| payload_start.checked_add(len))
            .filter(|&payload_end| payload_end <= self.end)
            .map(|payload_end| payload_start..payload_end)
            .ok_or(FormatError::Truncated(self.start))
    }

    /// Narrows the scope to the payload of the element whose size is at the
    /// cursor.
    pub fn enter_element(&mut self, data: &[u8]) -> Result<(), FormatError> {
        let payload = self.payload(data)?;
        self.start = payload.start;
        self.end = payload.end;
        Ok(())
    }

    /// Moves past the element whose size is at the cursor.
    pub fn skip_element(&mut self, data: &[u8]) -> Result<(), FormatError> {
        self.start = self.payload(data)?.end;
        Ok(())
    }
}

/// Walks `data` for the element at `id_path` and returns the span of its
/// payload.
///
/// IDs are compared with their marker bit stripped, as read by [`read_vint`].
pub fn find_element_by_path(data: &[u8], id_path: &[u64]) -> Result<Range<usize>, FormatError> {
    let mut cursor = ElementCursor::new(data);
    let mut matched = 0;

    while matched < id_path.len() && !cursor.is_exhausted() {
        let id = cursor.read_id(data)?;
        if id == id_path[matched] {
            debug!("Entering element {id:#x} at byte {}", cursor.start);
            cursor.enter_element(data)?;
            matched += 1;
        } else {
            cursor.skip_element(data)?;
        }
    }

    if matched == id_path.len() {
        Ok(cursor.start..cursor.end)
    } else {
        Err(FormatError::ElementNotFound)
    }
}
