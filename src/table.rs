// Everything here is based off of https://android.googlesource.com/platform/frameworks/base/+/master/libs/androidfw/include/androidfw/ResourceTypes.h

use std::collections::BTreeMap;

use crate::defs::{
    parse_children, write_children, Chunk, ChunkFrame, ResTableRef, StructuralError,
};
use crate::res_value::ResValue;
use crate::stream::{ByteReader, ByteWriter, ParseError, ParseErrorKind, ParseResult, ResultCtx};
use crate::string_pool::StringPoolChunk;

/// Number of UTF-16 units in the fixed name field of packages and library
/// entries.
const NAME_LENGTH: usize = 128;

/// Configuration this collection of entries is designed for.
///
/// The configuration is treated as an opaque blob: its leading size field and
/// contents are preserved byte for byte, and the same bytes are written back
/// out. Interpreting the dimensions inside is not this crate's business.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ResTableConfig {
    data: Vec<u8>,
}

impl ResTableConfig {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn write(&self, out: &mut ByteWriter) {
        out.put_bytes(&self.data);
    }
}

/// A single resource value (simple) or a set of keyed values (complex)
/// inside a [`TypeChunk`].
#[derive(Debug, PartialEq, Clone)]
pub struct Entry {
    /// Number of bytes in the entry header.
    pub header_size: u16,
    pub flags: u16,
    /// Reference into the package's key string pool identifying this entry.
    pub key_index: u32,
    pub value: EntryValue,
}

#[derive(Debug, PartialEq, Clone)]
pub enum EntryValue {
    Simple(ResValue),
    Complex {
        /// Resource identifier of the parent mapping, or 0 if there is none.
        parent: ResTableRef,
        values: Vec<(ResTableRef, ResValue)>,
    },
}

impl Entry {
    /// An entry offset that indicates that a given resource is not present.
    pub const NO_ENTRY: u32 = 0xFFFFFFFF;

    /// If set, this is a complex entry holding a set of name/value mappings.
    pub const FLAG_COMPLEX: u16 = 0x0001;

    /// Size of a single resource id + value mapping inside a complex entry.
    const MAPPING_SIZE: usize = 4 + ResValue::SIZE as usize;

    pub fn simple(key_index: u32, value: ResValue) -> Self {
        Self {
            header_size: 8,
            flags: 0,
            key_index,
            value: EntryValue::Simple(value),
        }
    }

    pub fn complex(
        key_index: u32,
        parent: ResTableRef,
        values: Vec<(ResTableRef, ResValue)>,
    ) -> Self {
        Self {
            header_size: 16,
            flags: Self::FLAG_COMPLEX,
            key_index,
            value: EntryValue::Complex { parent, values },
        }
    }

    pub fn is_complex(&self) -> bool {
        self.flags & Self::FLAG_COMPLEX != 0
    }

    fn parse(buf: &[u8], offset: usize) -> ParseResult<Entry> {
        let mut reader = ByteReader::new(buf);
        reader.seek(offset as u64);

        let header_size = reader
            .read_u16()
            .add_context(|| "read header_size for Entry")?;
        let flags = reader.read_u16().add_context(|| "read flags for Entry")?;
        let key_index = reader
            .read_u32()
            .add_context(|| "read key_index for Entry")?;

        let value = if flags & Self::FLAG_COMPLEX != 0 {
            let parent = reader
                .read_u32()
                .add_context(|| "read parent for Entry")?
                .into();
            let count = reader.read_u32().add_context(|| "read count for Entry")?;
            reader.seek(offset as u64 + header_size as u64);
            let mut values = Vec::new();
            for i in 0..count {
                let key = reader
                    .read_u32()
                    .add_context(|| format!("read mapping key {i} for Entry"))?
                    .into();
                let value = ResValue::parse(&mut reader)
                    .add_context(|| format!("read mapping value {i} for Entry"))?;
                values.push((key, value));
            }
            EntryValue::Complex { parent, values }
        } else {
            reader.seek(offset as u64 + header_size as u64);
            EntryValue::Simple(
                ResValue::parse(&mut reader).add_context(|| "read value for Entry")?,
            )
        };

        Ok(Entry {
            header_size,
            flags,
            key_index,
            value,
        })
    }

    /// The total size of the entry at `offset`, derived from its own header
    /// without decoding the contents.
    fn read_size(buf: &[u8], offset: usize) -> ParseResult<usize> {
        let reader = ByteReader::new(buf);
        let header_size = reader.u16_at(offset as u64)? as usize;
        let flags = reader.u16_at(offset as u64 + 2)?;
        if flags & Self::FLAG_COMPLEX != 0 {
            let count = reader.u32_at(offset as u64 + 12)? as usize;
            Ok(header_size + count * Self::MAPPING_SIZE)
        } else {
            Ok(header_size + ResValue::SIZE as usize)
        }
    }

    fn write(&self, out: &mut ByteWriter) {
        out.put_u16(self.header_size);
        out.put_u16(self.flags);
        out.put_u32(self.key_index);
        match &self.value {
            EntryValue::Simple(value) => value.write(out),
            EntryValue::Complex { parent, values } => {
                out.put_u32((*parent).into());
                out.put_u32(values.len() as u32);
                for (key, value) in values {
                    out.put_u32((*key).into());
                    value.write(out);
                }
            }
        }
    }
}

/// A collection of resource entries for a particular resource type and
/// configuration within a package. There may be multiple of these chunks for
/// one type, supplying different configuration variations.
///
/// Entries are not decoded at parse time. The offset table is read, and the
/// original entry bytes are copied back verbatim when the chunk is written,
/// unless the entry has been overridden through [`TypeChunk::override_entry`]
/// or appended with [`TypeChunk::add_entry`].
#[derive(Debug, PartialEq, Clone)]
pub struct TypeChunk {
    frame: ChunkFrame,
    id: u8,
    reserved: [u8; 3],
    entry_count: u32,
    entries_start: u32,
    config: ResTableConfig,
    /// Original entry offsets, relative to entriesStart, NO_ENTRY included.
    entry_offsets: Vec<u32>,
    /// Byte size of each original entry; 0 where the offset is NO_ENTRY.
    entry_sizes: Vec<u32>,
    /// Copy of the original entries region backing lazy decode.
    src: Vec<u8>,
    /// Overrides and additions keyed by entry index. None removes the entry.
    overrides: BTreeMap<u32, Option<Entry>>,
    new_entry_count: u32,
}

impl TypeChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        if frame.header_size < 20 {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size: frame.header_size,
                    expected: 20,
                },
                frame.offset,
            ));
        }

        let id = reader.read_u8().add_context(|| "read id for TypeChunk")?;
        let reserved = reader
            .read_bytes(3)
            .add_context(|| "read packing bytes for TypeChunk")?;
        let reserved = [reserved[0], reserved[1], reserved[2]];
        let entry_count = reader
            .read_u32()
            .add_context(|| "read entry_count for TypeChunk")?;
        let entries_start = reader
            .read_u32()
            .add_context(|| "read entries_start for TypeChunk")?;
        let config = ResTableConfig::new(
            reader
                .read_bytes(frame.header_size as usize - 20)
                .add_context(|| "read config for TypeChunk")?
                .to_vec(),
        );

        Ok(Self {
            frame,
            id,
            reserved,
            entry_count,
            entries_start,
            config,
            entry_offsets: Vec::new(),
            entry_sizes: Vec::new(),
            src: Vec::new(),
            overrides: BTreeMap::new(),
            new_entry_count: 0,
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.entry_offsets = Vec::with_capacity(self.entry_count as usize);
        for i in 0..self.entry_count {
            self.entry_offsets.push(
                reader
                    .read_u32()
                    .add_context(|| format!("read entry offset {i} for TypeChunk"))?,
            );
        }

        self.src = reader
            .slice(self.frame.offset + self.entries_start as u64, self.frame.end())
            .add_context(|| "read entries region for TypeChunk")?
            .to_vec();

        self.entry_sizes = Vec::with_capacity(self.entry_offsets.len());
        for (i, &offset) in self.entry_offsets.iter().enumerate() {
            if offset == Entry::NO_ENTRY {
                self.entry_sizes.push(0);
                continue;
            }
            let size = Entry::read_size(&self.src, offset as usize)
                .add_context(|| format!("measure entry {i} for TypeChunk"))?;
            if offset as usize + size > self.src.len() {
                return Err(ParseError::new(
                    ParseErrorKind::Truncated {
                        wanted: size,
                        len: self.src.len(),
                    },
                    self.frame.offset + self.entries_start as u64 + offset as u64,
                )
                .add_context(format!("entry {i} extends past the entries region")));
            }
            self.entry_sizes.push(size as u32);
        }

        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    /// The (1-based) id of the resource type this chunk is holding.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// The name of the type this chunk represents (e.g. string, attr, id),
    /// resolved against the enclosing package's type string pool.
    pub fn type_name(&self, package: &PackageChunk) -> Result<String, StructuralError> {
        type_name_for_id(self.id, package)
    }

    pub fn config(&self) -> &ResTableConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ResTableConfig) {
        self.config = config;
    }

    /// The total number of entries for this type + configuration, removed
    /// and appended entries included.
    pub fn total_entry_count(&self) -> u32 {
        self.entry_count + self.new_entry_count
    }

    /// The entry at a specific index. An override wins over the original
    /// entry; an index recorded as NO_ENTRY, removed by an override, or out
    /// of range is None.
    pub fn get(&self, index: u32) -> Option<Entry> {
        if index >= self.total_entry_count() {
            return None;
        }
        if let Some(overridden) = self.overrides.get(&index) {
            return overridden.clone();
        }
        let i = index as usize;
        if i >= self.entry_offsets.len() || self.entry_offsets[i] == Entry::NO_ENTRY {
            return None;
        }
        Entry::parse(&self.src, self.entry_offsets[i] as usize).ok()
    }

    /// Whether this chunk holds an entry for `resource_id`, given the
    /// enclosing package.
    pub fn contains_resource(&self, package: &PackageChunk, resource_id: ResTableRef) -> bool {
        if package.id() != resource_id.package_index as u32 || self.id != resource_id.type_index {
            return false;
        }
        let index = resource_id.entry_index as u32;
        if index >= self.total_entry_count() {
            return false;
        }
        match self.overrides.get(&index) {
            Some(entry) => entry.is_some(),
            None => self
                .entry_offsets
                .get(index as usize)
                .is_some_and(|&offset| offset != Entry::NO_ENTRY),
        }
    }

    /// Override the entry at `index`. None removes the entry at that
    /// location; it is written out as NO_ENTRY. An index at or past
    /// [`TypeChunk::total_entry_count`] is a no-op.
    pub fn override_entry(&mut self, index: u32, entry: Option<Entry>) {
        if index < self.total_entry_count() {
            self.overrides.insert(index, entry);
        }
    }

    /// Append a new entry (or an explicit hole) to the end of the entry
    /// list, returning its index.
    pub fn add_entry(&mut self, entry: Option<Entry>) -> u32 {
        let index = self.total_entry_count();
        self.overrides.insert(index, entry);
        self.new_entry_count += 1;
        index
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        out.put_u8(self.id);
        out.put_bytes(&self.reserved);
        out.put_u32(self.total_entry_count());
        out.put_u32(self.frame.header_size as u32 + self.total_entry_count() * 4);
        self.config.write(out);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        let offsets_start = out.position();
        for _ in 0..self.total_entry_count() {
            out.put_u32(0); // patched as the entries are written
        }

        let mut offset: u32 = 0;
        for i in 0..self.entry_offsets.len() {
            let slot = offsets_start + i as u64 * 4;
            match self.overrides.get(&(i as u32)) {
                Some(None) => out.patch_u32(slot, Entry::NO_ENTRY),
                Some(Some(entry)) => {
                    let start = out.position();
                    entry.write(out);
                    out.patch_u32(slot, offset);
                    offset += (out.position() - start) as u32;
                }
                None => {
                    if self.entry_offsets[i] == Entry::NO_ENTRY {
                        out.patch_u32(slot, Entry::NO_ENTRY);
                    } else {
                        let src_offset = self.entry_offsets[i] as usize;
                        let size = self.entry_sizes[i] as usize;
                        out.put_bytes(&self.src[src_offset..src_offset + size]);
                        out.patch_u32(slot, offset);
                        offset += size as u32;
                    }
                }
            }
        }

        // appended entries follow in ascending index order
        for (index, entry) in self.overrides.range(self.entry_count..) {
            let slot = offsets_start + *index as u64 * 4;
            match entry {
                None => out.patch_u32(slot, Entry::NO_ENTRY),
                Some(entry) => {
                    let start = out.position();
                    entry.write(out);
                    out.patch_u32(slot, offset);
                    offset += (out.position() - start) as u32;
                }
            }
        }

        while offset % 4 != 0 {
            out.put_u8(0);
            offset += 1;
        }
    }
}

/// A specification of the resources defined by a particular type: one
/// configuration-change mask per entry of that type.
#[derive(Debug, PartialEq, Clone)]
pub struct TypeSpecChunk {
    frame: ChunkFrame,
    id: u8,
    reserved: [u8; 3],
    resource_count: u32,
    resource_flags: Vec<u32>,
}

impl TypeSpecChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        if frame.header_size < 16 {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size: frame.header_size,
                    expected: 16,
                },
                frame.offset,
            ));
        }

        let id = reader
            .read_u8()
            .add_context(|| "read id for TypeSpecChunk")?;
        let reserved = reader
            .read_bytes(3)
            .add_context(|| "read packing bytes for TypeSpecChunk")?;
        let reserved = [reserved[0], reserved[1], reserved[2]];
        let resource_count = reader
            .read_u32()
            .add_context(|| "read resource count for TypeSpecChunk")?;

        Ok(Self {
            frame,
            id,
            reserved,
            resource_count,
            resource_flags: Vec::new(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.resource_flags = Vec::with_capacity(self.resource_count as usize);
        for i in 0..self.resource_count {
            self.resource_flags.push(
                reader
                    .read_u32()
                    .add_context(|| format!("read config mask {i} for TypeSpecChunk"))?,
            );
        }
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    /// The (1-based) id of the resource type this spec has masks for.
    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn type_name(&self, package: &PackageChunk) -> Result<String, StructuralError> {
        type_name_for_id(self.id, package)
    }

    pub fn resource_count(&self) -> u32 {
        self.resource_flags.len() as u32
    }

    pub fn resource_flags(&self, index: u32) -> Option<u32> {
        self.resource_flags.get(index as usize).copied()
    }

    /// Add a resource to this spec, returning the index of the new mask.
    pub fn add_resource(&mut self, flags: u32) -> u32 {
        self.resource_flags.push(flags);
        self.resource_flags.len() as u32 - 1
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        out.put_u8(self.id);
        out.put_bytes(&self.reserved);
        out.put_u32(self.resource_flags.len() as u32);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        for &flags in &self.resource_flags {
            out.put_u32(flags);
        }
    }
}

fn type_name_for_id(id: u8, package: &PackageChunk) -> Result<String, StructuralError> {
    let pool = package.type_string_pool()?;
    (id as u32)
        .checked_sub(1) // type ids are 1-based
        .and_then(|index| pool.get(index))
        .ok_or(StructuralError::MissingTypeName { id })
}

/// The offset, from the start of a package chunk, of the typeStrings and
/// keyStrings header fields.
const TYPE_STRINGS_FIELD: u64 = 268;
const KEY_STRINGS_FIELD: u64 = 276;

/// A collection of resource data types within a package. The payload is a
/// sequence of chunks: the type and key string pools first, then
/// ResTable_typeSpec and ResTable_type structures for each resource type.
#[derive(Debug, PartialEq, Clone)]
pub struct PackageChunk {
    frame: ChunkFrame,
    /// If this is a base package, its ID. Package IDs start at 1. 0 means
    /// this is not a base package.
    id: u32,
    name: String,
    /// Last index into the type strings that is for public use by others.
    last_public_type: u32,
    /// Last index into the key strings that is for public use by others.
    last_public_key: u32,
    type_id_offset: Option<u32>,
    /// Header bytes past the known field set, carried through verbatim.
    header_tail: Vec<u8>,
    children: Vec<Chunk>,
}

impl PackageChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        if frame.header_size < 284 {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size: frame.header_size,
                    expected: 284,
                },
                frame.offset,
            ));
        }

        let id = reader
            .read_u32()
            .add_context(|| "read id for PackageChunk")?;
        let name = read_utf16_fixed_string(reader, NAME_LENGTH)
            .add_context(|| "read name for PackageChunk")?;
        // the pool offsets are recomputed on write from where the pool
        // children actually land, so only the public counts are kept
        let _type_strings = reader
            .read_u32()
            .add_context(|| "read type_strings for PackageChunk")?;
        let last_public_type = reader
            .read_u32()
            .add_context(|| "read last_public_type for PackageChunk")?;
        let _key_strings = reader
            .read_u32()
            .add_context(|| "read key_strings for PackageChunk")?;
        let last_public_key = reader
            .read_u32()
            .add_context(|| "read last_public_key for PackageChunk")?;

        let type_id_offset = if frame.header_size >= 288 {
            Some(
                reader
                    .read_u32()
                    .add_context(|| "read type_id_offset for PackageChunk")?,
            )
        } else {
            None
        };

        let tail_len = frame.payload_start() - reader.position();
        let header_tail = reader
            .read_bytes(tail_len as usize)
            .add_context(|| "read header tail for PackageChunk")?
            .to_vec();

        Ok(Self {
            frame,
            id,
            name,
            last_public_type,
            last_public_key,
            type_id_offset,
            header_tail,
            children: Vec::new(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.children = parse_children(&self.frame, reader)
            .add_context(|| "read child chunks for PackageChunk")?;
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Chunk] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Chunk> {
        &mut self.children
    }

    /// Insert a new child chunk at `index`.
    pub fn insert(&mut self, index: usize, chunk: Chunk) {
        self.children.insert(index, chunk);
    }

    fn string_pool_child(&self, ordinal: usize) -> Option<&StringPoolChunk> {
        self.children
            .iter()
            .filter_map(|c| c.as_string_pool())
            .nth(ordinal)
    }

    fn string_pool_child_mut(&mut self, ordinal: usize) -> Option<&mut StringPoolChunk> {
        self.children
            .iter_mut()
            .filter_map(|c| c.as_string_pool_mut())
            .nth(ordinal)
    }

    /// The pool naming the resource types of this package, by convention the
    /// first string pool child.
    pub fn type_string_pool(&self) -> Result<&StringPoolChunk, StructuralError> {
        self.string_pool_child(0)
            .ok_or(StructuralError::MissingTypeStringPool)
    }

    pub fn type_string_pool_mut(&mut self) -> Result<&mut StringPoolChunk, StructuralError> {
        self.string_pool_child_mut(0)
            .ok_or(StructuralError::MissingTypeStringPool)
    }

    /// The pool naming the entry keys of this package, by convention the
    /// second string pool child.
    pub fn key_string_pool(&self) -> Result<&StringPoolChunk, StructuralError> {
        self.string_pool_child(1)
            .ok_or(StructuralError::MissingKeyStringPool)
    }

    pub fn key_string_pool_mut(&mut self) -> Result<&mut StringPoolChunk, StructuralError> {
        self.string_pool_child_mut(1)
            .ok_or(StructuralError::MissingKeyStringPool)
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        out.put_u32(self.id);
        write_utf16_fixed_string(out, &self.name, NAME_LENGTH);
        out.put_u32(0); // typeStrings, patched when the pool is written
        out.put_u32(self.last_public_type);
        out.put_u32(0); // keyStrings, patched when the pool is written
        out.put_u32(self.last_public_key);
        if let Some(type_id_offset) = self.type_id_offset {
            out.put_u32(type_id_offset);
        }
        out.put_bytes(&self.header_tail);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter, chunk_start: u64) {
        let mut pools_seen = 0;
        for child in &self.children {
            if child.as_string_pool().is_some() {
                let relative = (out.position() - chunk_start) as u32;
                match pools_seen {
                    0 => out.patch_u32(chunk_start + TYPE_STRINGS_FIELD, relative),
                    1 => out.patch_u32(chunk_start + KEY_STRINGS_FIELD, relative),
                    _ => {}
                }
                pools_seen += 1;
            }
            child.write(out);
            out.pad_to_4();
        }
    }
}

/// Header for a resource table; the root chunk of an arsc file. Its payload
/// is a string pool containing all value strings in the table, followed by
/// one or more package chunks.
#[derive(Debug, PartialEq, Clone)]
pub struct TableChunk {
    frame: ChunkFrame,
    children: Vec<Chunk>,
}

impl TableChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        if frame.header_size < 12 {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size: frame.header_size,
                    expected: 12,
                },
                frame.offset,
            ));
        }

        // recomputed on write by counting the package children
        let _package_count = reader
            .read_u32()
            .add_context(|| "read package_count for TableChunk")?;

        Ok(Self {
            frame,
            children: Vec::new(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.children = parse_children(&self.frame, reader)
            .add_context(|| "read child chunks for TableChunk")?;
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub fn children(&self) -> &[Chunk] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Chunk> {
        &mut self.children
    }

    pub fn insert(&mut self, index: usize, chunk: Chunk) {
        self.children.insert(index, chunk);
    }

    /// The global value string pool of this table.
    pub fn string_pool(&self) -> Result<&StringPoolChunk, StructuralError> {
        self.children
            .iter()
            .find_map(|c| c.as_string_pool())
            .ok_or(StructuralError::MissingStringPool)
    }

    pub fn string_pool_mut(&mut self) -> Result<&mut StringPoolChunk, StructuralError> {
        self.children
            .iter_mut()
            .find_map(|c| c.as_string_pool_mut())
            .ok_or(StructuralError::MissingStringPool)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageChunk> {
        self.children.iter().filter_map(|c| c.as_package())
    }

    pub fn packages_mut(&mut self) -> impl Iterator<Item = &mut PackageChunk> {
        self.children.iter_mut().filter_map(|c| c.as_package_mut())
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        out.put_u32(self.packages().count() as u32);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        write_children(&self.children, out);
    }
}

/// A package-id to package name mapping for any shared libraries used in
/// this resource table. The package ids encoded here may differ from the ids
/// assigned at runtime; consumers translate by name.
#[derive(Debug, PartialEq, Clone)]
pub struct LibraryChunk {
    frame: ChunkFrame,
    entry_count: u32,
    entries: Vec<LibraryEntry>,
}

/// A shared library package-id to package name entry.
#[derive(Debug, PartialEq, Clone)]
pub struct LibraryEntry {
    /// The package id of this shared library, assigned at build time.
    pub package_id: u32,
    pub package_name: String,
}

impl LibraryChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        if frame.header_size < 12 {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size: frame.header_size,
                    expected: 12,
                },
                frame.offset,
            ));
        }

        let entry_count = reader
            .read_u32()
            .add_context(|| "read entry count for LibraryChunk")?;

        Ok(Self {
            frame,
            entry_count,
            entries: Vec::new(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.entries = Vec::with_capacity(self.entry_count as usize);
        for i in 0..self.entry_count {
            let package_id = reader
                .read_u32()
                .add_context(|| format!("read package_id for library entry {i}"))?;
            let package_name = read_utf16_fixed_string(reader, NAME_LENGTH)
                .add_context(|| format!("read package_name for library entry {i}"))?;
            self.entries.push(LibraryEntry {
                package_id,
                package_name,
            });
        }
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<LibraryEntry> {
        &mut self.entries
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        out.put_u32(self.entries.len() as u32);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        for entry in &self.entries {
            out.put_u32(entry.package_id);
            write_utf16_fixed_string(out, &entry.package_name, NAME_LENGTH);
        }
    }
}

/// Read a NUL-terminated UTF-16 string from a fixed-length field, leaving the
/// cursor positioned after the whole field.
fn read_utf16_fixed_string(reader: &mut ByteReader, length: usize) -> ParseResult<String> {
    let end = reader.position() + (length as u64) * 2;
    let mut units = Vec::new();
    for _ in 0..length {
        let unit = reader.read_u16()?;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    reader.seek(end);
    Ok(String::from_utf16_lossy(&units))
}

fn write_utf16_fixed_string(out: &mut ByteWriter, string: &str, length: usize) {
    let mut units: Vec<u16> = string.encode_utf16().collect();
    assert!(
        units.len() < length,
        "name does not fit its {length} unit field"
    );
    units.resize(length, 0);
    for unit in units {
        out.put_u16(unit);
    }
}
