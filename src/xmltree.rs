use crate::defs::{parse_children, write_children, Chunk, ChunkFrame, StructuralError};
use crate::res_value::{ResValue, ResValueType};
use crate::stream::{ByteReader, ByteWriter, ParseError, ParseErrorKind, ParseResult, ResultCtx};
use crate::string_pool::{ResStringPoolRef, StringPoolChunk};

/// Basic XML tree node data shared by every XML node chunk, stored in the
/// chunk header right after the framing bytes.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct XmlNode {
    /// Line number in the original source file at which this element appeared.
    pub line_number: u32,
    /// Optional XML comment that was associated with the element; null if none.
    pub comment: ResStringPoolRef,
}

impl XmlNode {
    fn parse(reader: &mut ByteReader, frame: &ChunkFrame) -> ParseResult<Self> {
        if frame.header_size < 16 {
            return Err(ParseError::new(
                ParseErrorKind::BadHeaderSize {
                    header_size: frame.header_size,
                    expected: 16,
                },
                frame.offset,
            ));
        }
        let line_number = reader
            .read_u32()
            .add_context(|| "read line_number for XmlNode")?;
        let comment = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read comment for XmlNode")?,
        };
        Ok(Self {
            line_number,
            comment,
        })
    }

    fn write(&self, out: &mut ByteWriter) {
        out.put_u32(self.line_number);
        out.put_u32(self.comment.index);
    }
}

/// An XML chunk: many node chunks plus a string pool holding all of the
/// strings the nodes reference, and usually a resource map tying attribute
/// names to resource identifiers.
#[derive(Debug, PartialEq, Clone)]
pub struct XmlChunk {
    frame: ChunkFrame,
    children: Vec<Chunk>,
}

impl XmlChunk {
    pub(crate) fn parse_header(frame: ChunkFrame) -> Self {
        Self {
            frame,
            children: Vec::new(),
        }
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.children = parse_children(&self.frame, reader)
            .add_context(|| "read child chunks for XmlChunk")?;
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

    /// The string pool all node string references resolve against.
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

    pub fn resource_map(&self) -> Option<&ResourceMapChunk> {
        self.children.iter().find_map(|c| match c {
            Chunk::XmlResourceMap(map) => Some(map),
            _ => None,
        })
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        write_children(&self.children, out);
    }
}

/// Namespace start and end nodes; both carry the same payload.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct XmlNamespaceChunk {
    frame: ChunkFrame,
    pub node: XmlNode,
    /// The prefix of the namespace.
    pub prefix: ResStringPoolRef,
    /// The URI of the namespace.
    pub uri: ResStringPoolRef,
}

impl XmlNamespaceChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        let node = XmlNode::parse(reader, &frame)?;
        Ok(Self {
            frame,
            node,
            prefix: ResStringPoolRef::null(),
            uri: ResStringPoolRef::null(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.prefix = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read prefix for XmlNamespaceChunk")?,
        };
        self.uri = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read uri for XmlNamespaceChunk")?,
        };
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        self.node.write(out);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_u32(self.prefix.index);
        out.put_u32(self.uri.index);
    }
}

/// An attribute on a start element.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct XmlAttribute {
    /// Namespace of this attribute.
    pub ns: ResStringPoolRef,
    /// Name of this attribute.
    pub name: ResStringPoolRef,
    /// The original raw string value of this attribute.
    pub raw_value: ResStringPoolRef,
    /// Processed typed value of this attribute.
    pub typed_value: ResValue,
}

impl XmlAttribute {
    /// Replace the typed value, keeping the raw string reference in sync.
    pub fn set_value(&mut self, value: ResValue) {
        self.typed_value = value;
        match value.data {
            ResValueType::String(string_ref) => self.raw_value = string_ref,
            _ => self.raw_value = ResStringPoolRef::null(),
        };
    }
}

/// An element start node, including its attributes.
#[derive(Debug, PartialEq, Clone)]
pub struct XmlStartElementChunk {
    frame: ChunkFrame,
    pub node: XmlNode,
    /// String of the full namespace of this element.
    pub ns: ResStringPoolRef,
    /// String name of this element.
    pub name: ResStringPoolRef,
    attribute_start: u16,
    attribute_size: u16,
    /// Index (1-based) of the "id" attribute. 0 if none.
    pub id_index: u16,
    /// Index (1-based) of the "class" attribute. 0 if none.
    pub class_index: u16,
    /// Index (1-based) of the "style" attribute. 0 if none.
    pub style_index: u16,
    attributes: Vec<XmlAttribute>,
}

impl XmlStartElementChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        let node = XmlNode::parse(reader, &frame)?;
        Ok(Self {
            frame,
            node,
            ns: ResStringPoolRef::null(),
            name: ResStringPoolRef::null(),
            attribute_start: 0,
            attribute_size: 0,
            id_index: 0,
            class_index: 0,
            style_index: 0,
            attributes: Vec::new(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        let ext_start = reader.position();

        self.ns = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read ns for XmlStartElementChunk")?,
        };
        self.name = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read name for XmlStartElementChunk")?,
        };
        self.attribute_start = reader
            .read_u16()
            .add_context(|| "read attribute_start for XmlStartElementChunk")?;
        self.attribute_size = reader
            .read_u16()
            .add_context(|| "read attribute_size for XmlStartElementChunk")?;
        let attribute_count = reader
            .read_u16()
            .add_context(|| "read attribute_count for XmlStartElementChunk")?;
        self.id_index = reader
            .read_u16()
            .add_context(|| "read id_index for XmlStartElementChunk")?;
        self.class_index = reader
            .read_u16()
            .add_context(|| "read class_index for XmlStartElementChunk")?;
        self.style_index = reader
            .read_u16()
            .add_context(|| "read style_index for XmlStartElementChunk")?;

        self.attributes = Vec::with_capacity(attribute_count as usize);
        for i in 0..attribute_count {
            reader.seek(
                ext_start
                    + self.attribute_start as u64
                    + i as u64 * self.attribute_size as u64,
            );
            let ns = ResStringPoolRef {
                index: reader
                    .read_u32()
                    .add_context(|| format!("read ns for attribute {i}"))?,
            };
            let name = ResStringPoolRef {
                index: reader
                    .read_u32()
                    .add_context(|| format!("read name for attribute {i}"))?,
            };
            let raw_value = ResStringPoolRef {
                index: reader
                    .read_u32()
                    .add_context(|| format!("read raw_value for attribute {i}"))?,
            };
            let typed_value = ResValue::parse(reader)
                .add_context(|| format!("read typed_value for attribute {i}"))?;
            self.attributes.push(XmlAttribute {
                ns,
                name,
                raw_value,
                typed_value,
            });
        }

        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Vec<XmlAttribute> {
        &mut self.attributes
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        self.node.write(out);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_u32(self.ns.index);
        out.put_u32(self.name.index);
        out.put_u16(self.attribute_start);
        out.put_u16(self.attribute_size);
        out.put_u16(self.attributes.len() as u16);
        out.put_u16(self.id_index);
        out.put_u16(self.class_index);
        out.put_u16(self.style_index);
        for attribute in &self.attributes {
            out.put_u32(attribute.ns.index);
            out.put_u32(attribute.name.index);
            out.put_u32(attribute.raw_value.index);
            attribute.typed_value.write(out);
        }
    }
}

/// An element end node.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct XmlEndElementChunk {
    frame: ChunkFrame,
    pub node: XmlNode,
    pub ns: ResStringPoolRef,
    pub name: ResStringPoolRef,
}

impl XmlEndElementChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        let node = XmlNode::parse(reader, &frame)?;
        Ok(Self {
            frame,
            node,
            ns: ResStringPoolRef::null(),
            name: ResStringPoolRef::null(),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.ns = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read ns for XmlEndElementChunk")?,
        };
        self.name = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read name for XmlEndElementChunk")?,
        };
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        self.node.write(out);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_u32(self.ns.index);
        out.put_u32(self.name.index);
    }
}

/// A CDATA node: the raw character data plus its typed interpretation.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct XmlCDataChunk {
    frame: ChunkFrame,
    pub node: XmlNode,
    /// The raw CDATA character data.
    pub data: ResStringPoolRef,
    /// The typed value of the character data.
    pub typed_data: ResValue,
}

impl XmlCDataChunk {
    pub(crate) fn parse_header(reader: &mut ByteReader, frame: ChunkFrame) -> ParseResult<Self> {
        let node = XmlNode::parse(reader, &frame)?;
        Ok(Self {
            frame,
            node,
            data: ResStringPoolRef::null(),
            typed_data: ResValue::new(ResValueType::Null(0)),
        })
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        self.data = ResStringPoolRef {
            index: reader
                .read_u32()
                .add_context(|| "read data for XmlCDataChunk")?,
        };
        self.typed_data =
            ResValue::parse(reader).add_context(|| "read typed_data for XmlCDataChunk")?;
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub(crate) fn write_header(&self, out: &mut ByteWriter) {
        self.node.write(out);
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_u32(self.data.index);
        self.typed_data.write(out);
    }
}

/// A u32 array mapping strings in the enclosing XML's string pool back to
/// resource identifiers: index i corresponds to string index i.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResourceMapChunk {
    frame: ChunkFrame,
    resources: Vec<u32>,
}

impl ResourceMapChunk {
    pub(crate) fn parse_header(frame: ChunkFrame) -> Self {
        Self {
            frame,
            resources: Vec::new(),
        }
    }

    pub(crate) fn init_payload(&mut self, reader: &mut ByteReader) -> ParseResult<()> {
        let count = (self.frame.chunk_size as u64 - self.frame.header_size as u64) / 4;
        self.resources = Vec::with_capacity(count as usize);
        for i in 0..count {
            self.resources.push(
                reader
                    .read_u32()
                    .add_context(|| format!("read resource id {i} for ResourceMapChunk"))?,
            );
        }
        Ok(())
    }

    pub fn frame(&self) -> &ChunkFrame {
        &self.frame
    }

    pub fn resources(&self) -> &[u32] {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Vec<u32> {
        &mut self.resources
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        for &id in &self.resources {
            out.put_u32(id);
        }
    }
}
