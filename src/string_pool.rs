use std::collections::HashMap;
use std::iter::zip;

use crate::codec::{self, Encoding};
use crate::defs::ChunkFrame;
use crate::stream::{ByteReader, ByteWriter, ParseError, ParseErrorKind, ParseResult, ResultCtx};

/// Styles and span lists are terminated with this sentinel value.
pub const SPAN_END: u32 = 0xFFFFFFFF;

/// The offset, from the start of the chunk, of the stylesStart header field.
const STYLES_START_OFFSET: u64 = 24;

/// A reference to a string in a string pool.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
pub struct ResStringPoolRef {
    pub index: u32,
}

impl ResStringPoolRef {
    pub fn null() -> ResStringPoolRef {
        ResStringPoolRef { index: 0xffffffff }
    }

    pub fn is_null(self) -> bool {
        self.index == 0xffffffff
    }

    pub fn resolve(self, strings: &StringPoolChunk) -> Option<String> {
        if self.is_null() {
            return None;
        }
        strings.get(self.index)
    }
}

#[derive(Debug, PartialEq, Default, Copy, Clone)]
pub struct StringPoolFlags {
    pub flags: u32,
}

impl StringPoolFlags {
    /// If set, the string index is sorted by the string values (based on strcmp16()).
    pub fn sorted(&self) -> bool {
        self.flags & (1 << 0) != 0
    }

    /// String pool is encoded in UTF-8.
    pub fn utf8(&self) -> bool {
        self.flags & (1 << 8) != 0
    }

    /// Create new StringPoolFlags from separate utf8 and sorted boolean flags.
    pub fn new(sorted: bool, utf8: bool) -> Self {
        Self {
            flags: (sorted as u32) | ((utf8 as u32) << 8),
        }
    }
}

/// A set of strings that can be referenced by others through a ResStringPool_ref.
///
/// The data of this chunk is an array of u32 indices into the pool, relative
/// to stringsStart. At stringsStart are all of the UTF-8 or UTF-16 strings
/// concatenated together. If styleCount is not zero, an array of indices into
/// a style table starting at stylesStart follows the string indices.
///
/// Strings are not decoded when the chunk is parsed. Only the offsets are
/// read; [`StringPoolChunk::get`] decodes on demand and unreferenced strings
/// are copied back byte for byte when the chunk is written, preserving any
/// offset sharing present in the input.
#[derive(Debug, PartialEq, Clone)]
pub struct StringPoolChunk {
    frame: ChunkFrame,
    string_count: u32,
    style_count: u32,
    flags: StringPoolFlags,
    strings_start: u32,
    styles_start: u32,
    /// Original string offsets, relative to stringsStart, as stored on disk.
    string_offsets: Vec<u32>,
    /// Full encoded byte length of each original string, headers and
    /// terminator included.
    string_sizes: Vec<u32>,
    /// Copy of the original string data region backing lazy decode.
    src: Vec<u8>,
    /// Strings appended after parse, in order. These are encoded fresh on
    /// write and are not deduplicated against each other.
    new_strings: Vec<String>,
    styles: Vec<StringPoolStyle>,
}

impl StringPoolChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        if frame.header_size < 28 {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size: frame.header_size,
                    expected: 28,
                },
                frame.offset,
            ));
        }

        let string_count = reader
            .read_u32()
            .add_context(|| "read string_count for StringPoolChunk")?;
        let style_count = reader
            .read_u32()
            .add_context(|| "read style_count for StringPoolChunk")?;
        let flags = StringPoolFlags {
            flags: reader
                .read_u32()
                .add_context(|| "read flags for StringPoolChunk")?,
        };
        let strings_start = reader
            .read_u32()
            .add_context(|| "read strings_start for StringPoolChunk")?;
        let styles_start = reader
            .read_u32()
            .add_context(|| "read styles_start for StringPoolChunk")?;

        Ok(Self {
            frame,
            string_count,
            style_count,
            flags,
            strings_start,
            styles_start,
            string_offsets: Vec::new(),
            string_sizes: Vec::new(),
            src: Vec::new(),
            new_strings: Vec::new(),
            styles: Vec::new(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.string_offsets = Vec::with_capacity(self.string_count as usize);
        for i in 0..self.string_count {
            self.string_offsets.push(
                reader
                    .read_u32()
                    .add_context(|| format!("read string offset {i} for StringPoolChunk"))?,
            );
        }

        let mut style_offsets = Vec::with_capacity(self.style_count as usize);
        for i in 0..self.style_count {
            style_offsets.push(
                reader
                    .read_u32()
                    .add_context(|| format!("read style offset {i} for StringPoolChunk"))?,
            );
        }

        if self.string_count > 0 {
            let data_start = self.frame.offset + self.strings_start as u64;
            let data_end = if self.style_count > 0 {
                self.frame.offset + self.styles_start as u64
            } else {
                self.frame.end()
            };
            self.src = reader
                .slice(data_start, data_end)
                .add_context(|| "read string data region for StringPoolChunk")?
                .to_vec();
        }

        self.string_sizes = Vec::with_capacity(self.string_offsets.len());
        for (i, &offset) in self.string_offsets.iter().enumerate() {
            let size = codec::full_byte_length(&self.src, offset as usize, self.encoding())
                .add_context(|| format!("measure string {i} for StringPoolChunk"))?;
            if offset as usize + size > self.src.len() {
                return Err(ParseError::new(
                    ParseErrorKind::Truncated {
                        wanted: size,
                        len: self.src.len(),
                    },
                    self.frame.offset + self.strings_start as u64 + offset as u64,
                )
                .add_context(format!("string {i} extends past the string data region")));
            }
            self.string_sizes.push(size as u32);
        }

        let styles_base = self.frame.offset + self.styles_start as u64;
        self.styles = Vec::with_capacity(style_offsets.len());
        for (i, &style_offset) in style_offsets.iter().enumerate() {
            let mut spans = Vec::new();
            let mut pos = styles_base + style_offset as u64;
            loop {
                let name = reader
                    .u32_at(pos)
                    .add_context(|| format!("read span name for style {i}"))?;
                if name == SPAN_END {
                    break;
                }
                reader.seek(pos + 4);
                let first_char = reader
                    .read_u32()
                    .add_context(|| format!("read span first_char for style {i}"))?;
                let last_char = reader
                    .read_u32()
                    .add_context(|| format!("read span last_char for style {i}"))?;
                spans.push(StringPoolSpan {
                    name: ResStringPoolRef { index: name },
                    first_char,
                    last_char,
                });
                pos = reader.position();
            }
            self.styles.push(StringPoolStyle { spans });
        }

        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub fn flags(&self) -> StringPoolFlags {
        self.flags
    }

    pub fn is_utf8(&self) -> bool {
        self.flags.utf8()
    }

    pub fn is_sorted(&self) -> bool {
        self.flags.sorted()
    }

    pub fn encoding(&self) -> Encoding {
        if self.flags.utf8() {
            Encoding::Utf8
        } else {
            Encoding::Utf16
        }
    }

    /// The number of strings in this pool, appended strings included.
    pub fn count(&self) -> u32 {
        (self.string_offsets.len() + self.new_strings.len()) as u32
    }

    /// The 0-based index of the first occurrence of the given string, or
    /// None if the string is not in the pool. This runs in O(n) time, byte
    /// comparing the encoded form against every recorded offset.
    pub fn index_of(&self, string: &str) -> Option<u32> {
        let encoded = codec::encode(string, self.encoding());

        for (i, &offset) in self.string_offsets.iter().enumerate() {
            let offset = offset as usize;
            if self.src.len() < offset + encoded.len() {
                continue;
            }
            if self.src[offset..offset + encoded.len()] == encoded[..] {
                return Some(i as u32);
            }
        }

        self.new_strings
            .iter()
            .position(|s| s == string)
            .map(|i| (self.string_offsets.len() + i) as u32)
    }

    /// The string at the given (0-based) index, decoded from the original
    /// buffer on demand, or None if the index is out of range.
    pub fn get(&self, index: u32) -> Option<String> {
        let index = index as usize;
        if index < self.string_offsets.len() {
            codec::decode(
                &self.src,
                self.string_offsets[index] as usize,
                self.encoding(),
            )
            .ok()
        } else {
            self.new_strings
                .get(index - self.string_offsets.len())
                .cloned()
        }
    }

    /// Add a string to the pool, returning its index.
    ///
    /// With `deduplicate`, an equal string already in the pool is reused and
    /// its index returned. Appended strings are never deduplicated against
    /// each other; equal appended strings are written out twice.
    pub fn add(&mut self, string: &str, deduplicate: bool) -> u32 {
        if deduplicate {
            if let Some(existing) = self.index_of(string) {
                return existing;
            }
        }
        self.new_strings.push(string.to_owned());
        self.count() - 1
    }

    pub fn style_count(&self) -> u32 {
        self.styles.len() as u32
    }

    pub fn style(&self, index: u32) -> Option<&StringPoolStyle> {
        self.styles.get(index as usize)
    }

    pub fn styles(&self) -> &[StringPoolStyle] {
        &self.styles
    }

    /// Append a style, returning its index. Styles have a 1:1 relationship
    /// with strings by index; there are never more styles than strings.
    pub fn add_style(&mut self, style: StringPoolStyle) -> u32 {
        self.styles.push(style);
        self.styles.len() as u32 - 1
    }

    /// The size in bytes of the string and style offset tables.
    fn offset_size(&self) -> u32 {
        (self.count() + self.styles.len() as u32) * 4
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        out.put_u32(self.count());
        out.put_u32(self.styles.len() as u32);
        out.put_u32(self.flags.flags);
        out.put_u32(if self.count() == 0 {
            0
        } else {
            self.frame.header_size as u32 + self.offset_size()
        });
        out.put_u32(0); // stylesStart cannot be computed yet; patched later
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter, chunk_start: u64) {
        let string_offsets_start = out.position();
        for _ in 0..self.count() {
            out.put_u32(0); // patched as the data is written
        }
        let style_offsets_start = out.position();
        for _ in 0..self.styles.len() {
            out.put_u32(0);
        }

        let data_start = out.position();
        let mut current: u32 = 0;

        // existing source offset -> offset in the written data, so that
        // offset sharing in the input survives the round-trip
        let mut used: HashMap<u32, u32> = HashMap::with_capacity(self.string_offsets.len());

        for (idx, (&offset, &size)) in
            zip(&self.string_offsets, &self.string_sizes).enumerate()
        {
            let slot = string_offsets_start + idx as u64 * 4;
            if let Some(&existing) = used.get(&offset) {
                out.patch_u32(slot, existing);
            } else {
                used.insert(offset, current);
                out.patch_u32(slot, current);
                out.put_bytes(&self.src[offset as usize..(offset + size) as usize]);
                current += size;
            }
        }

        for (i, string) in self.new_strings.iter().enumerate() {
            let encoded = codec::encode(string, self.encoding());
            let slot = string_offsets_start + (self.string_offsets.len() + i) as u64 * 4;
            out.patch_u32(slot, current);
            out.put_bytes(&encoded);
            current += encoded.len() as u32;
        }

        // the string data is padded to a 4-byte boundary
        while current % 4 != 0 {
            out.put_u8(0);
            current += 1;
        }
        let strings_size = (out.position() - data_start) as u32;

        if self.styles.is_empty() {
            return;
        }

        let mut style_offset: u32 = 0;
        let mut used: HashMap<&StringPoolStyle, u32> = HashMap::new();

        for (idx, style) in self.styles.iter().enumerate() {
            let slot = style_offsets_start + idx as u64 * 4;
            if let Some(&existing) = used.get(style) {
                out.patch_u32(slot, existing);
            } else {
                used.insert(style, style_offset);
                out.patch_u32(slot, style_offset);
                let start = out.position();
                style.write(out);
                style_offset += (out.position() - start) as u32;
            }
        }

        // the whole style table ends with two more sentinel values
        for _ in 0..2 {
            out.put_u32(SPAN_END);
            style_offset += 4;
        }
        while style_offset % 4 != 0 {
            out.put_u8(0);
            style_offset += 1;
        }

        out.patch_u32(
            chunk_start + STYLES_START_OFFSET,
            self.frame.header_size as u32 + self.offset_size() + strings_size,
        );
    }
}

/// All of the styles for a particular string, determined by sharing its
/// index in the pool.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct StringPoolStyle {
    pub spans: Vec<StringPoolSpan>,
}

impl StringPoolStyle {
    pub fn new(spans: Vec<StringPoolSpan>) -> Self {
        Self { spans }
    }

    fn write(&self, out: &mut ByteWriter) {
        for span in &self.spans {
            span.write(out);
        }
        out.put_u32(SPAN_END);
    }
}

/// A span of style information associated with a string in the pool.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct StringPoolSpan {
    /// The name of the span -- that is, the name of the XML tag that defined
    /// it, as an index into the same pool.
    pub name: ResStringPoolRef,
    /// The first character in the string that this span applies to.
    pub first_char: u32,
    /// The last character in the string that this span applies to.
    pub last_char: u32,
}

impl StringPoolSpan {
    fn write(&self, out: &mut ByteWriter) {
        out.put_u32(self.name.index);
        out.put_u32(self.first_char);
        out.put_u32(self.last_char);
    }
}
