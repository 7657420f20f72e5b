// Everything here is based off of https://android.googlesource.com/platform/frameworks/base/+/master/libs/androidfw/include/androidfw/ResourceTypes.h

use std::fmt::Display;

use thiserror::Error;

use crate::stream::{ByteReader, ByteWriter, ParseError, ParseErrorKind, ParseResult, ResultCtx};
use crate::string_pool::StringPoolChunk;
use crate::table::{LibraryChunk, PackageChunk, TableChunk, TypeChunk, TypeSpecChunk};
use crate::xmltree::{
    ResourceMapChunk, XmlCDataChunk, XmlChunk, XmlEndElementChunk, XmlNamespaceChunk,
    XmlStartElementChunk,
};

/// The number of bytes at the front of every chunk describing its type,
/// header size and total size.
pub const FRAME_SIZE: u16 = 8;

/// The offset, from the start of a chunk, of the chunk size field.
const CHUNK_SIZE_OFFSET: u64 = 4;

/// Type identifier for a chunk. The meaning of a chunk's contents depends on
/// this code and, for some codes, on the containing chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResType {
    Null,
    StringPool,
    Table,
    Xml,
    XmlStartNamespace,
    XmlEndNamespace,
    XmlStartElement,
    XmlEndElement,
    XmlCData,
    XmlResourceMap,
    TablePackage,
    TableType,
    TableTypeSpec,
    TableLibrary,
    TableOverlayable,
    TableOverlayablePolicy,
    TableStagedAlias,
}

impl ResType {
    pub fn from_code(code: u16) -> Option<ResType> {
        Some(match code {
            0x0000 => ResType::Null,
            0x0001 => ResType::StringPool,
            0x0002 => ResType::Table,
            0x0003 => ResType::Xml,
            0x0100 => ResType::XmlStartNamespace,
            0x0101 => ResType::XmlEndNamespace,
            0x0102 => ResType::XmlStartElement,
            0x0103 => ResType::XmlEndElement,
            0x0104 => ResType::XmlCData,
            0x0180 => ResType::XmlResourceMap,
            0x0200 => ResType::TablePackage,
            0x0201 => ResType::TableType,
            0x0202 => ResType::TableTypeSpec,
            0x0203 => ResType::TableLibrary,
            0x0204 => ResType::TableOverlayable,
            0x0205 => ResType::TableOverlayablePolicy,
            0x0206 => ResType::TableStagedAlias,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        match self {
            ResType::Null => 0x0000,
            ResType::StringPool => 0x0001,
            ResType::Table => 0x0002,
            ResType::Xml => 0x0003,
            ResType::XmlStartNamespace => 0x0100,
            ResType::XmlEndNamespace => 0x0101,
            ResType::XmlStartElement => 0x0102,
            ResType::XmlEndElement => 0x0103,
            ResType::XmlCData => 0x0104,
            ResType::XmlResourceMap => 0x0180,
            ResType::TablePackage => 0x0200,
            ResType::TableType => 0x0201,
            ResType::TableTypeSpec => 0x0202,
            ResType::TableLibrary => 0x0203,
            ResType::TableOverlayable => 0x0204,
            ResType::TableOverlayablePolicy => 0x0205,
            ResType::TableStagedAlias => 0x0206,
        }
    }
}

/// The framing record kept by every chunk from parse time.
///
/// `header_size` is re-emitted unchanged when the chunk is written (enforced
/// with an assertion); `chunk_size` is the size seen at parse time and is
/// recomputed on write once the payload is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkFrame {
    /// Offset of the chunk from the start of the source buffer.
    pub offset: u64,
    /// Size of the chunk header in bytes, including the 8 framing bytes.
    pub header_size: u16,
    /// Total size of the chunk in bytes, including header and payload.
    pub chunk_size: u32,
}

impl ChunkFrame {
    /// Frame for a chunk constructed in memory rather than parsed.
    pub fn new(header_size: u16) -> Self {
        Self {
            offset: 0,
            header_size,
            chunk_size: 0,
        }
    }

    pub fn payload_start(&self) -> u64 {
        self.offset + self.header_size as u64
    }

    pub fn end(&self) -> u64 {
        self.offset + self.chunk_size as u64
    }
}

/// Any chunk the engine understands, plus [`UnknownChunk`] for everything it
/// merely carries through.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    StringPool(StringPoolChunk),
    Table(TableChunk),
    Xml(XmlChunk),
    XmlStartNamespace(XmlNamespaceChunk),
    XmlEndNamespace(XmlNamespaceChunk),
    XmlStartElement(XmlStartElementChunk),
    XmlEndElement(XmlEndElementChunk),
    XmlCData(XmlCDataChunk),
    XmlResourceMap(ResourceMapChunk),
    TablePackage(PackageChunk),
    TableType(TypeChunk),
    TableTypeSpec(TypeSpecChunk),
    TableLibrary(LibraryChunk),
    Unknown(UnknownChunk),
}

impl Chunk {
    /// Parse one chunk with the cursor positioned at its first byte.
    ///
    /// The header is parsed first so that its values are available while the
    /// payload is initialized, and the cursor is finally repositioned to the
    /// declared end of the chunk, making the caller robust against payload
    /// code over- or under-reading.
    pub(crate) fn parse(reader: &mut ByteReader, top_level: bool) -> ParseResult<Chunk> {
        let type_code = reader.read_u16().add_context(|| "read chunk type code")?;
        let offset = reader.position() - 2;
        let header_size = reader
            .read_u16()
            .add_context(|| "read chunk header size")?;
        let chunk_size = reader.read_u32().add_context(|| "read chunk size")?;

        if header_size < FRAME_SIZE {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size,
                    expected: FRAME_SIZE,
                },
                offset,
            ));
        }
        if (chunk_size as u64) < header_size as u64
            || offset + chunk_size as u64 > reader.len() as u64
        {
            return Err(ParseError::new(
                ParseErrorKind::BadChunkSize {
                    chunk_size,
                    header_size,
                },
                offset,
            ));
        }

        let frame = ChunkFrame {
            offset,
            header_size,
            chunk_size,
        };

        let res_type = ResType::from_code(type_code);
        if res_type.is_none() && top_level {
            return Err(ParseError::new(
                ParseErrorKind::UnknownTypeCode(type_code),
                offset,
            ));
        }

        let mut chunk = match res_type {
            Some(ResType::StringPool) => {
                Chunk::StringPool(StringPoolChunk::parse_header(reader, frame)?)
            }
            Some(ResType::Table) => Chunk::Table(TableChunk::parse_header(reader, frame)?),
            Some(ResType::Xml) => Chunk::Xml(XmlChunk::parse_header(frame)),
            Some(ResType::XmlStartNamespace) => {
                Chunk::XmlStartNamespace(XmlNamespaceChunk::parse_header(reader, frame)?)
            }
            Some(ResType::XmlEndNamespace) => {
                Chunk::XmlEndNamespace(XmlNamespaceChunk::parse_header(reader, frame)?)
            }
            Some(ResType::XmlStartElement) => {
                Chunk::XmlStartElement(XmlStartElementChunk::parse_header(reader, frame)?)
            }
            Some(ResType::XmlEndElement) => {
                Chunk::XmlEndElement(XmlEndElementChunk::parse_header(reader, frame)?)
            }
            Some(ResType::XmlCData) => {
                Chunk::XmlCData(XmlCDataChunk::parse_header(reader, frame)?)
            }
            Some(ResType::XmlResourceMap) => {
                Chunk::XmlResourceMap(ResourceMapChunk::parse_header(frame))
            }
            Some(ResType::TablePackage) => {
                Chunk::TablePackage(PackageChunk::parse_header(reader, frame)?)
            }
            Some(ResType::TableType) => {
                Chunk::TableType(TypeChunk::parse_header(reader, frame)?)
            }
            Some(ResType::TableTypeSpec) => {
                Chunk::TableTypeSpec(TypeSpecChunk::parse_header(reader, frame)?)
            }
            Some(ResType::TableLibrary) => {
                Chunk::TableLibrary(LibraryChunk::parse_header(reader, frame)?)
            }
            // NULL, the overlayable family and staged aliases are carried
            // through without interpretation.
            Some(_) | None => {
                Chunk::Unknown(UnknownChunk::parse_header(type_code, reader, frame)?)
            }
        };

        reader.seek(frame.payload_start());
        chunk.init_payload(reader)?;
        reader.seek(frame.end());

        Ok(chunk)
    }

    fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        match self {
            Chunk::StringPool(c) => c.init_payload(reader),
            Chunk::Table(c) => c.init_payload(reader),
            Chunk::Xml(c) => c.init_payload(reader),
            Chunk::XmlStartNamespace(c) | Chunk::XmlEndNamespace(c) => c.init_payload(reader),
            Chunk::XmlStartElement(c) => c.init_payload(reader),
            Chunk::XmlEndElement(c) => c.init_payload(reader),
            Chunk::XmlCData(c) => c.init_payload(reader),
            Chunk::XmlResourceMap(c) => c.init_payload(reader),
            Chunk::TablePackage(c) => c.init_payload(reader),
            Chunk::TableType(c) => c.init_payload(reader),
            Chunk::TableTypeSpec(c) => c.init_payload(reader),
            Chunk::TableLibrary(c) => c.init_payload(reader),
            Chunk::Unknown(c) => c.init_payload(reader),
        }
    }

    pub fn frame(&self) -> &ChunkFrame {
        match self {
            Chunk::StringPool(c) => c.frame(),
            Chunk::Table(c) => c.frame(),
            Chunk::Xml(c) => c.frame(),
            Chunk::XmlStartNamespace(c) | Chunk::XmlEndNamespace(c) => c.frame(),
            Chunk::XmlStartElement(c) => c.frame(),
            Chunk::XmlEndElement(c) => c.frame(),
            Chunk::XmlCData(c) => c.frame(),
            Chunk::XmlResourceMap(c) => c.frame(),
            Chunk::TablePackage(c) => c.frame(),
            Chunk::TableType(c) => c.frame(),
            Chunk::TableTypeSpec(c) => c.frame(),
            Chunk::TableLibrary(c) => c.frame(),
            Chunk::Unknown(c) => c.frame(),
        }
    }

    pub fn type_code(&self) -> u16 {
        match self {
            Chunk::StringPool(_) => ResType::StringPool.code(),
            Chunk::Table(_) => ResType::Table.code(),
            Chunk::Xml(_) => ResType::Xml.code(),
            Chunk::XmlStartNamespace(_) => ResType::XmlStartNamespace.code(),
            Chunk::XmlEndNamespace(_) => ResType::XmlEndNamespace.code(),
            Chunk::XmlStartElement(_) => ResType::XmlStartElement.code(),
            Chunk::XmlEndElement(_) => ResType::XmlEndElement.code(),
            Chunk::XmlCData(_) => ResType::XmlCData.code(),
            Chunk::XmlResourceMap(_) => ResType::XmlResourceMap.code(),
            Chunk::TablePackage(_) => ResType::TablePackage.code(),
            Chunk::TableType(_) => ResType::TableType.code(),
            Chunk::TableTypeSpec(_) => ResType::TableTypeSpec.code(),
            Chunk::TableLibrary(_) => ResType::TableLibrary.code(),
            Chunk::Unknown(c) => c.type_code(),
        }
    }

    /// Serialize this chunk at the writer's current position.
    ///
    /// The header is written with the original header size and a placeholder
    /// chunk size; the size is back-patched once the payload is written.
    pub fn write(&self, out: &mut ByteWriter) {
        let start = out.position();
        out.put_u16(self.type_code());
        out.put_u16(self.frame().header_size);
        out.put_u32(0); // patched once the payload has been written

        self.write_header_fields(out);

        let written = out.position() - start;
        assert_eq!(
            written,
            self.frame().header_size as u64,
            "written header is the wrong size: got {}, want {}",
            written,
            self.frame().header_size
        );

        self.write_payload(out, start);

        out.patch_u32(start + CHUNK_SIZE_OFFSET, (out.position() - start) as u32);
    }

    fn write_header_fields(&self, out: &mut ByteWriter) {
        match self {
            Chunk::StringPool(c) => c.write_header(out),
            Chunk::Table(c) => c.write_header(out),
            Chunk::Xml(_) => {}
            Chunk::XmlStartNamespace(c) | Chunk::XmlEndNamespace(c) => c.write_header(out),
            Chunk::XmlStartElement(c) => c.write_header(out),
            Chunk::XmlEndElement(c) => c.write_header(out),
            Chunk::XmlCData(c) => c.write_header(out),
            Chunk::XmlResourceMap(_) => {}
            Chunk::TablePackage(c) => c.write_header(out),
            Chunk::TableType(c) => c.write_header(out),
            Chunk::TableTypeSpec(c) => c.write_header(out),
            Chunk::TableLibrary(c) => c.write_header(out),
            Chunk::Unknown(c) => c.write_header(out),
        }
    }

    fn write_payload(&self, out: &mut ByteWriter, chunk_start: u64) {
        match self {
            Chunk::StringPool(c) => c.write_payload(out, chunk_start),
            Chunk::Table(c) => c.write_payload(out),
            Chunk::Xml(c) => c.write_payload(out),
            Chunk::XmlStartNamespace(c) | Chunk::XmlEndNamespace(c) => c.write_payload(out),
            Chunk::XmlStartElement(c) => c.write_payload(out),
            Chunk::XmlEndElement(c) => c.write_payload(out),
            Chunk::XmlCData(c) => c.write_payload(out),
            Chunk::XmlResourceMap(c) => c.write_payload(out),
            Chunk::TablePackage(c) => c.write_payload(out, chunk_start),
            Chunk::TableType(c) => c.write_payload(out),
            Chunk::TableTypeSpec(c) => c.write_payload(out),
            Chunk::TableLibrary(c) => c.write_payload(out),
            Chunk::Unknown(c) => c.write_payload(out),
        }
    }

    pub fn as_string_pool(&self) -> Option<&StringPoolChunk> {
        match self {
            Chunk::StringPool(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_string_pool_mut(&mut self) -> Option<&mut StringPoolChunk> {
        match self {
            Chunk::StringPool(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_package(&self) -> Option<&PackageChunk> {
        match self {
            Chunk::TablePackage(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_package_mut(&mut self) -> Option<&mut PackageChunk> {
        match self {
            Chunk::TablePackage(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeChunk> {
        match self {
            Chunk::TableType(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_type_mut(&mut self) -> Option<&mut TypeChunk> {
        match self {
            Chunk::TableType(c) => Some(c),
            _ => None,
        }
    }
}

/// Walk the payload of a container chunk, building each child in turn.
///
/// The children of a well formed container tile its payload exactly; a child
/// claiming bytes past the container end fails the parse.
pub(crate) fn parse_children(
    frame: &ChunkFrame,
    reader: &mut ByteReader,
) -> ParseResult<Vec<Chunk>> {
    let mut children = Vec::new();
    let mut pos = frame.payload_start();
    let end = frame.end();

    while pos < end {
        reader.seek(pos);
        let child = Chunk::parse(reader, false)?;
        if child.frame().end() > end {
            return Err(ParseError::new(
                ParseErrorKind::BadChunkSize {
                    chunk_size: child.frame().chunk_size,
                    header_size: child.frame().header_size,
                },
                child.frame().offset,
            )
            .add_context("child chunk extends past its parent"));
        }
        pos = child.frame().end();
        children.push(child);
    }

    Ok(children)
}

/// Serialize the children of a container, padding each to a 4-byte boundary.
pub(crate) fn write_children(children: &[Chunk], out: &mut ByteWriter) {
    for child in children {
        child.write(out);
        out.pad_to_4();
    }
}

/// A chunk whose contents are unknown (or currently unhandled). The original
/// bytes are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChunk {
    frame: ChunkFrame,
    type_code: u16,
    header: Vec<u8>,
    payload: Vec<u8>,
}

impl UnknownChunk {
    pub fn new(type_code: u16, header: Vec<u8>, payload: Vec<u8>) -> Self {
        Self {
            frame: ChunkFrame::new(FRAME_SIZE + header.len() as u16),
            type_code,
            header,
            payload,
        }
    }

    pub(crate) fn parse_header(
        type_code: u16,
        reader: &mut ByteReader,
        frame: ChunkFrame,
    ) -> ParseResult<Self> {
        let header = reader
            .read_bytes(frame.header_size as usize - FRAME_SIZE as usize)
            .add_context(|| "read header bytes for UnknownChunk")?
            .to_vec();
        Ok(Self {
            frame,
            type_code,
            header,
            payload: Vec::new(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.payload = reader
            .read_bytes(self.frame.chunk_size as usize - self.frame.header_size as usize)
            .add_context(|| "read payload bytes for UnknownChunk")?
            .to_vec();
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub fn type_code(&self) -> u16 {
        self.type_code
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        out.put_bytes(&self.header);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_bytes(&self.payload);
    }
}

/// This is a reference to a unique entry in a resource table. The value is
/// structured as 0xpptteeee, where pp is the package index, tt is the type
/// index in that package, and eeee is the entry index in that type. The
/// package and type values start at 1 for the first item.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct ResTableRef {
    pub package_index: u8,
    pub type_index: u8,
    pub entry_index: u16,
}

impl ResTableRef {
    pub fn new(package_index: u8, type_index: u8, entry_index: u16) -> Self {
        Self {
            package_index,
            type_index,
            entry_index,
        }
    }
}

impl Display for ResTableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{:08x}", <ResTableRef as Into<u32>>::into(*self))
    }
}

impl From<ResTableRef> for u32 {
    fn from(value: ResTableRef) -> Self {
        (value.entry_index as u32)
            | ((value.type_index as u32) << 16)
            | ((value.package_index as u32) << 24)
    }
}

impl From<u32> for ResTableRef {
    fn from(value: u32) -> Self {
        Self {
            package_index: (value >> 24) as u8, // as u8 does & 0xff
            type_index: (value >> 16) as u8,    // as u8 does & 0xff
            entry_index: value as u16,          // as u16 does & 0xffff
        }
    }
}

/// A query against an already parsed tree that the tree cannot satisfy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("resource table has no string pool")]
    MissingStringPool,
    #[error("package has no type string pool")]
    MissingTypeStringPool,
    #[error("package has no key string pool")]
    MissingKeyStringPool,
    #[error("type id {id} has no name in the type string pool")]
    MissingTypeName { id: u8 },
}
