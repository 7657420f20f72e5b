use std::fmt::Display;

use thiserror::Error;

/// The reason a parse failed.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// A read would cross the end of the input buffer.
    #[error("read of {wanted} bytes crosses the end of the buffer (length {len})")]
    Truncated { wanted: usize, len: usize },

    /// A chunk declares a size that is inconsistent with its frame: smaller
    /// than its own header, or extending past the enclosing chunk or buffer.
    #[error("chunk size {chunk_size} is inconsistent with its frame (header size {header_size})")]
    BadChunkSize { chunk_size: u32, header_size: u16 },

    /// A chunk declares a header too small for the fields its type requires.
    #[error("header size {header_size} is smaller than the required {expected} bytes")]
    BadHeaderSize { header_size: u16, expected: u16 },

    /// A top-level chunk has a type code outside the enumerated set. Nested
    /// chunks with unrecognised codes are absorbed as unknown chunks instead.
    #[error("unknown top-level chunk type {0:#06x}")]
    UnknownTypeCode(u16),

    /// A typed value declares a size other than 8.
    #[error("typed value declares size {0}, expected 8")]
    BadValueSize(u16),

    /// A typed value carries an unrecognised type code.
    #[error("unknown value type code {0:#04x}")]
    UnknownValueType(u8),
}

#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: u64,
    pub context: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, pos: u64) -> Self {
        Self {
            kind,
            pos,
            context: Vec::new(),
        }
    }

    pub fn add_context<C: ToString>(mut self, new_context: C) -> Self {
        self.context.push(new_context.to_string());
        self
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {} at {} with context:", self.kind, self.pos)?;

        for ctx in &self.context {
            write!(f, "\n{ctx}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

pub trait ResultCtx {
    fn add_context<C: ToString, F: FnOnce() -> C>(self, context: F) -> Self;
}

impl<T> ResultCtx for ParseResult<T> {
    fn add_context<C: ToString, F: FnOnce() -> C>(self, context: F) -> Self {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.add_context(context())),
        }
    }
}

/// A positioned little-endian view over an input buffer.
///
/// All accessors are bounds checked and fail with
/// [`ParseErrorKind::Truncated`] when a read crosses the buffer end. Seeking
/// past the end is allowed; the next read reports the failure.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    pub fn seek(&mut self, pos: u64) {
        self.pos = pos as usize;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, wanted: usize) -> ParseResult<&'a [u8]> {
        if self.remaining() < wanted {
            return Err(ParseError::new(
                ParseErrorKind::Truncated {
                    wanted,
                    len: self.data.len(),
                },
                self.position(),
            ));
        }
        let slice = &self.data[self.pos..self.pos + wanted];
        self.pos += wanted;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> ParseResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> ParseResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> ParseResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> ParseResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> ParseResult<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bytes(&mut self, count: usize) -> ParseResult<&'a [u8]> {
        self.take(count)
    }

    /// Read a u16 at an absolute position without moving the cursor.
    pub fn u16_at(&self, pos: u64) -> ParseResult<u16> {
        let b = self.slice(pos, pos + 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a u32 at an absolute position without moving the cursor.
    pub fn u32_at(&self, pos: u64) -> ParseResult<u32> {
        let b = self.slice(pos, pos + 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Borrow an absolute range of the input.
    pub fn slice(&self, start: u64, end: u64) -> ParseResult<&'a [u8]> {
        let (start, end) = (start as usize, end as usize);
        if start > end || end > self.data.len() {
            return Err(ParseError::new(
                ParseErrorKind::Truncated {
                    wanted: end.saturating_sub(start),
                    len: self.data.len(),
                },
                start as u64,
            ));
        }
        Ok(&self.data[start..end])
    }
}

/// A growable little-endian output buffer with an append position and
/// absolute back-patching of u32 slots.
///
/// Chunk sizes and table offsets are not known until their payloads have
/// been written, so writers emit placeholders and patch them afterwards.
/// Writing never fails.
#[derive(Debug, Default)]
pub struct ByteWriter {
    data: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn position(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn put_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Overwrite a previously written u32 at an absolute position.
    ///
    /// The position must have been written already; patching ahead of the
    /// append position is a programmer error.
    pub fn patch_u32(&mut self, pos: u64, value: u32) {
        let pos = pos as usize;
        self.data[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Write zero bytes until the append position is 4-byte aligned.
    pub fn pad_to_4(&mut self) {
        let target = crate::align(self.position(), 4);
        while self.position() < target {
            self.data.push(0);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
