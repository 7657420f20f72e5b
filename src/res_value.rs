use crate::defs::ResTableRef;
use crate::stream::{ByteReader, ByteWriter, ParseError, ParseErrorKind, ParseResult, ResultCtx};
use crate::string_pool::ResStringPoolRef;

/// A single typed resource value: a fixed 8-byte record of a type code and
/// four bytes of data interpreted according to that code.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ResValue {
    pub data: ResValueType,
}

impl ResValue {
    /// The serialized size of a value in bytes.
    pub const SIZE: u16 = 8;

    pub fn new(data: ResValueType) -> Self {
        Self { data }
    }

    /// Parse one value at the reader's current position.
    pub fn parse(reader: &mut ByteReader) -> ParseResult<Self> {
        let start = reader.position();
        let size = reader
            .read_u16()
            .add_context(|| "read size for ResValue")?;
        if size != Self::SIZE {
            return Err(ParseError::new(ParseErrorKind::BadValueSize(size), start));
        }

        let _res0 = reader.read_u8().add_context(|| "read res0 for ResValue")?;
        let code = reader
            .read_u8()
            .add_context(|| "read type code for ResValue")?;
        let data = reader
            .read_u32()
            .add_context(|| "read data for ResValue")?;

        let data = ResValueType::from_raw(code, data)
            .ok_or_else(|| ParseError::new(ParseErrorKind::UnknownValueType(code), start))?;

        Ok(Self { data })
    }

    /// Serialize this value; always emits size 8 and a zero res0 byte.
    pub fn write(&self, out: &mut ByteWriter) {
        out.put_u16(Self::SIZE);
        out.put_u8(0); // res0, always 0
        out.put_u8(self.data.code());
        out.put_u32(self.data.raw_data());
    }
}

/// The value variants a [`ResValue`] can carry. The wire representation is a
/// one byte type code plus a four byte payload.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ResValueType {
    /// The data is either 0 (undefined) or 1 (empty).
    Null(u32),
    /// The data holds a reference to another resource table entry.
    Reference(ResTableRef),
    /// The data holds an attribute resource identifier.
    Attribute(u32),
    /// The data holds an index into the containing resource table's global
    /// value string pool.
    String(ResStringPoolRef),
    /// The data holds a single-precision floating point number.
    Float(f32),
    /// The data holds a complex number encoding a dimension value, such as
    /// "100in".
    Dimension(u32),
    /// The data holds a complex number encoding a fraction of a container.
    Fraction(u32),
    /// The data holds a reference that needs to be resolved before it can be
    /// used like a plain reference.
    DynamicReference(ResTableRef),
    /// The data holds an attribute resource identifier that needs to be
    /// resolved before use.
    DynamicAttribute(u32),
    /// The data is a raw integer value of the form n..n.
    IntDec(u32),
    /// The data is a raw integer value of the form 0xn..n.
    IntHex(u32),
    /// The data is either 0 or 1, for input "false" or "true" respectively.
    IntBoolean(u32),
    /// The data is a raw integer value of the form #aarrggbb.
    IntColorArgb8(u32),
    /// The data is a raw integer value of the form #rrggbb.
    IntColorRgb8(u32),
    /// The data is a raw integer value of the form #argb.
    IntColorArgb4(u32),
    /// The data is a raw integer value of the form #rgb.
    IntColorRgb4(u32),
}

impl ResValueType {
    pub fn code(&self) -> u8 {
        match self {
            ResValueType::Null(_) => 0x00,
            ResValueType::Reference(_) => 0x01,
            ResValueType::Attribute(_) => 0x02,
            ResValueType::String(_) => 0x03,
            ResValueType::Float(_) => 0x04,
            ResValueType::Dimension(_) => 0x05,
            ResValueType::Fraction(_) => 0x06,
            ResValueType::DynamicReference(_) => 0x07,
            ResValueType::DynamicAttribute(_) => 0x08,
            ResValueType::IntDec(_) => 0x10,
            ResValueType::IntHex(_) => 0x11,
            ResValueType::IntBoolean(_) => 0x12,
            ResValueType::IntColorArgb8(_) => 0x1c,
            ResValueType::IntColorRgb8(_) => 0x1d,
            ResValueType::IntColorArgb4(_) => 0x1e,
            ResValueType::IntColorRgb4(_) => 0x1f,
        }
    }

    /// The four data bytes as they appear on the wire.
    pub fn raw_data(&self) -> u32 {
        match *self {
            ResValueType::Null(v)
            | ResValueType::Attribute(v)
            | ResValueType::Dimension(v)
            | ResValueType::Fraction(v)
            | ResValueType::DynamicAttribute(v)
            | ResValueType::IntDec(v)
            | ResValueType::IntHex(v)
            | ResValueType::IntBoolean(v)
            | ResValueType::IntColorArgb8(v)
            | ResValueType::IntColorRgb8(v)
            | ResValueType::IntColorArgb4(v)
            | ResValueType::IntColorRgb4(v) => v,
            ResValueType::Reference(r) | ResValueType::DynamicReference(r) => r.into(),
            ResValueType::String(s) => s.index,
            ResValueType::Float(f) => f.to_bits(),
        }
    }

    pub fn from_raw(code: u8, data: u32) -> Option<Self> {
        Some(match code {
            0x00 => ResValueType::Null(data),
            0x01 => ResValueType::Reference(data.into()),
            0x02 => ResValueType::Attribute(data),
            0x03 => ResValueType::String(ResStringPoolRef { index: data }),
            0x04 => ResValueType::Float(f32::from_bits(data)),
            0x05 => ResValueType::Dimension(data),
            0x06 => ResValueType::Fraction(data),
            0x07 => ResValueType::DynamicReference(data.into()),
            0x08 => ResValueType::DynamicAttribute(data),
            0x10 => ResValueType::IntDec(data),
            0x11 => ResValueType::IntHex(data),
            0x12 => ResValueType::IntBoolean(data),
            0x1c => ResValueType::IntColorArgb8(data),
            0x1d => ResValueType::IntColorRgb8(data),
            0x1e => ResValueType::IntColorArgb4(data),
            0x1f => ResValueType::IntColorRgb4(data),
            _ => return None,
        })
    }
}
