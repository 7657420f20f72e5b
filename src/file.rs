use crate::defs::Chunk;
use crate::stream::{ByteReader, ByteWriter, ParseError, ParseResult};

/// A binary resource file: the sequence of top-level chunks of an arsc file
/// (one resource table) or a compiled XML file (one XML chunk).
///
/// Unknown top-level structure is preserved; re-serializing an unmodified
/// file reproduces its bytes exactly.
#[derive(Debug, PartialEq, Clone)]
pub struct ResourceFile {
    chunks: Vec<Chunk>,
    original_len: usize,
}

impl ResourceFile {
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let mut reader = ByteReader::new(data);
        let mut chunks = Vec::new();
        while reader.remaining() > 0 {
            chunks.push(Chunk::parse(&mut reader, true)?);
        }
        Ok(Self {
            chunks,
            original_len: data.len(),
        })
    }

    /// Serialize every top-level chunk in order. Mutated chunks are
    /// re-encoded; everything else is reproduced byte for byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        // modest headroom over the original size covers appended strings and
        // entries without a reallocation in the common case
        let mut out = ByteWriter::with_capacity(self.original_len + self.original_len / 8);
        for chunk in &self.chunks {
            chunk.write(&mut out);
        }
        out.into_bytes()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut Vec<Chunk> {
        &mut self.chunks
    }
}

impl TryFrom<&[u8]> for ResourceFile {
    type Error = ParseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        ResourceFile::parse(value)
    }
}

impl From<&ResourceFile> for Vec<u8> {
    fn from(value: &ResourceFile) -> Self {
        value.to_bytes()
    }
}
