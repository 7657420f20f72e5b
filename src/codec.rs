//! The length-prefixed string encoding used inside string pool chunks.
//!
//! Strings are stored with one or two length headers followed by the encoded
//! data and a NUL terminator. UTF-16 strings carry a single character-count
//! header; UTF-8 strings carry a UTF-16 character count followed by a byte
//! count. Each header uses the high bit of its first unit to signal a second
//! unit carrying the low bits of a larger length.

use crate::stream::{ByteReader, ParseResult, ResultCtx};

/// How the strings of a pool are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16,
}

pub fn calc_length8(length: usize) -> (u8, Option<u8>) {
    match length >= 0x80 {
        true => (
            ((length >> 8) | (1 << 7)) as u8,
            Some((length & 0xff) as u8),
        ),
        false => (length as u8, None),
    }
}

pub fn new_length8(l1: u8, l2: Option<u8>) -> u32 {
    match l2 {
        None => l1 as u32,
        Some(l2) => (((l1 as u32) & 0x7f) << 8) | (l2 as u32),
    }
}

pub fn calc_length16(length: usize) -> (u16, Option<u16>) {
    match length >= 0x8000 {
        true => (
            ((length >> 16) | (1 << 15)) as u16,
            Some((length & 0xffff) as u16),
        ),
        false => (length as u16, None),
    }
}

pub fn new_length16(l1: u16, l2: Option<u16>) -> u32 {
    match l2 {
        None => l1 as u32,
        Some(l2) => (((l1 as u32) & 0x7fff) << 16) | (l2 as u32),
    }
}

fn read_length8(reader: &mut ByteReader) -> ParseResult<u32> {
    let l1 = reader.read_u8()?;
    let l2 = if l1 & 0x80 != 0 {
        Some(reader.read_u8()?)
    } else {
        None
    };
    Ok(new_length8(l1, l2))
}

fn read_length16(reader: &mut ByteReader) -> ParseResult<u32> {
    let l1 = reader.read_u16()?;
    let l2 = if l1 & 0x8000 != 0 {
        Some(reader.read_u16()?)
    } else {
        None
    };
    Ok(new_length16(l1, l2))
}

/// Encode a string the way it is stored in a pool, including length headers
/// and the NUL terminator.
pub fn encode(string: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 => {
            let char_count = string.encode_utf16().count();
            let bytes = string.as_bytes();

            let mut out = Vec::with_capacity(bytes.len() + 5);
            let (l1, l2) = calc_length8(char_count);
            out.push(l1);
            if let Some(l2) = l2 {
                out.push(l2);
            }
            let (l1, l2) = calc_length8(bytes.len());
            out.push(l1);
            if let Some(l2) = l2 {
                out.push(l2);
            }
            out.extend_from_slice(bytes);
            out.push(0);
            out
        }
        Encoding::Utf16 => {
            let units: Vec<u16> = string.encode_utf16().collect();

            let mut out = Vec::with_capacity(units.len() * 2 + 6);
            let (l1, l2) = calc_length16(units.len());
            out.extend_from_slice(&l1.to_le_bytes());
            if let Some(l2) = l2 {
                out.extend_from_slice(&l2.to_le_bytes());
            }
            for unit in units {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out.extend_from_slice(&0u16.to_le_bytes());
            out
        }
    }
}

/// Decode one string at an offset into `buf`. Malformed sequences are
/// replaced rather than rejected, matching how the platform reads pools.
pub fn decode(buf: &[u8], offset: usize, encoding: Encoding) -> ParseResult<String> {
    let mut reader = ByteReader::new(buf);
    reader.seek(offset as u64);

    match encoding {
        Encoding::Utf8 => {
            let _char_count = read_length8(&mut reader)
                .add_context(|| "read character count for utf8 string")?;
            let byte_count =
                read_length8(&mut reader).add_context(|| "read byte count for utf8 string")?;
            let data = reader
                .read_bytes(byte_count as usize)
                .add_context(|| "read encoded data for utf8 string")?;
            Ok(String::from_utf8_lossy(data).into_owned())
        }
        Encoding::Utf16 => {
            let char_count = read_length16(&mut reader)
                .add_context(|| "read character count for utf16 string")?;
            let data = reader
                .read_bytes(char_count as usize * 2)
                .add_context(|| "read encoded data for utf16 string")?;
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect();
            Ok(String::from_utf16_lossy(&units))
        }
    }
}

/// The total encoded size of the string at an offset, including length
/// headers and the NUL terminator, computed without decoding the data.
pub fn full_byte_length(buf: &[u8], offset: usize, encoding: Encoding) -> ParseResult<usize> {
    let mut reader = ByteReader::new(buf);
    reader.seek(offset as u64);

    match encoding {
        Encoding::Utf8 => {
            let _char_count = read_length8(&mut reader)?;
            let byte_count = read_length8(&mut reader)?;
            let headers = reader.position() as usize - offset;
            Ok(headers + byte_count as usize + 1)
        }
        Encoding::Utf16 => {
            let char_count = read_length16(&mut reader)?;
            let headers = reader.position() as usize - offset;
            Ok(headers + char_count as usize * 2 + 2)
        }
    }
}
