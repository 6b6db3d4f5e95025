//! Chunk framing shared by the binary XML and resource table formats.
//!
//! Every structure in both files starts with the same little-endian header:
//! `type: u16, header_size: u16, size: u32`. Chunks nest, and a parent's
//! children follow its header back to back until the parent's `size` ends.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::DecodeError;

pub const RES_STRING_POOL_TYPE: u16 = 0x0001;
pub const RES_TABLE_TYPE: u16 = 0x0002;
pub const RES_XML_TYPE: u16 = 0x0003;
pub const RES_XML_START_NAMESPACE_TYPE: u16 = 0x0100;
pub const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
pub const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;
pub const RES_TABLE_PACKAGE_TYPE: u16 = 0x0200;
pub const RES_TABLE_TYPE_TYPE: u16 = 0x0201;

/// Marker for "no string" in string pool references.
pub const NO_INDEX: u32 = 0xFFFF_FFFF;

const UTF8_FLAG: u32 = 1 << 8;

type DecodeResult<T> = std::result::Result<T, DecodeError>;

pub fn slice(data: &[u8], offset: usize, len: usize) -> DecodeResult<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(DecodeError::Truncated { offset })
}

pub fn read_u8_at(data: &[u8], offset: usize) -> DecodeResult<u8> {
    Ok(slice(data, offset, 1)?[0])
}

pub fn read_u16_at(data: &[u8], offset: usize) -> DecodeResult<u16> {
    let mut cursor = Cursor::new(slice(data, offset, 2)?);
    Ok(cursor.read_u16::<LittleEndian>()?)
}

pub fn read_u32_at(data: &[u8], offset: usize) -> DecodeResult<u32> {
    let mut cursor = Cursor::new(slice(data, offset, 4)?);
    Ok(cursor.read_u32::<LittleEndian>()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub offset: usize,
    pub chunk_type: u16,
    pub header_size: u16,
    pub size: u32,
}

impl ChunkHeader {
    pub fn parse(data: &[u8], offset: usize) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(slice(data, offset, 8)?);
        let chunk_type = cursor.read_u16::<LittleEndian>()?;
        let header_size = cursor.read_u16::<LittleEndian>()?;
        let size = cursor.read_u32::<LittleEndian>()?;

        let fits = (size as usize)
            .checked_add(offset)
            .is_some_and(|end| end <= data.len());
        if size < 8 || u32::from(header_size) > size || header_size < 8 || !fits {
            return Err(DecodeError::InvalidChunkSize { offset, size });
        }

        Ok(Self {
            offset,
            chunk_type,
            header_size,
            size,
        })
    }

    pub fn ensure_type(self, chunk_type: u16) -> DecodeResult<Self> {
        if self.chunk_type != chunk_type {
            return Err(DecodeError::UnexpectedChunk {
                expected: chunk_type,
                found: self.chunk_type,
            });
        }
        Ok(self)
    }

    /// First byte after this chunk's header.
    pub fn body_start(&self) -> usize {
        self.offset + self.header_size as usize
    }

    pub fn end(&self) -> usize {
        self.offset + self.size as usize
    }

    pub fn children<'a>(&self, data: &'a [u8]) -> ChunkIter<'a> {
        ChunkIter::new(data, self.body_start(), self.end())
    }
}

/// Walks sibling chunks in `data[start..end]`. Stops after the first error.
pub struct ChunkIter<'a> {
    data: &'a [u8],
    position: usize,
    end: usize,
}

impl<'a> ChunkIter<'a> {
    pub fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            data,
            position: start,
            end: end.min(data.len()),
        }
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = DecodeResult<ChunkHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position + 8 > self.end {
            return None;
        }

        match ChunkHeader::parse(&self.data[..self.end], self.position) {
            Ok(header) => {
                self.position = header.end();
                Some(Ok(header))
            }
            Err(err) => {
                self.position = self.end;
                Some(Err(err))
            }
        }
    }
}

/// Decoded `ResStringPool` chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    pub fn parse(data: &[u8], header: &ChunkHeader) -> DecodeResult<Self> {
        header.ensure_type(RES_STRING_POOL_TYPE)?;
        let chunk = slice(data, header.offset, header.size as usize)?;

        let string_count = read_u32_at(chunk, 8)? as usize;
        let flags = read_u32_at(chunk, 16)?;
        let strings_start = read_u32_at(chunk, 20)? as usize;
        let utf8 = flags & UTF8_FLAG != 0;

        let offsets_start = header.header_size as usize;
        if string_count > chunk.len() / 4 {
            return Err(DecodeError::InvalidString(format!(
                "pool declares {} strings in {} bytes",
                string_count,
                chunk.len()
            )));
        }

        let mut strings = Vec::with_capacity(string_count);
        for index in 0..string_count {
            let relative = read_u32_at(chunk, offsets_start + index * 4)? as usize;
            let position = strings_start
                .checked_add(relative)
                .ok_or(DecodeError::Truncated { offset: strings_start })?;
            let value = if utf8 {
                decode_utf8(chunk, position)?
            } else {
                decode_utf16(chunk, position)?
            };
            strings.push(value);
        }

        Ok(Self { strings })
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        if index == NO_INDEX {
            return None;
        }
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

fn decode_utf8(chunk: &[u8], position: usize) -> DecodeResult<String> {
    // Character count first, then byte count; only the latter matters here.
    let (_, position) = utf8_length(chunk, position)?;
    let (byte_len, position) = utf8_length(chunk, position)?;
    let bytes = slice(chunk, position, byte_len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn utf8_length(chunk: &[u8], position: usize) -> DecodeResult<(usize, usize)> {
    let first = read_u8_at(chunk, position)? as usize;
    if first & 0x80 != 0 {
        let second = read_u8_at(chunk, position + 1)? as usize;
        Ok((((first & 0x7F) << 8) | second, position + 2))
    } else {
        Ok((first, position + 1))
    }
}

fn decode_utf16(chunk: &[u8], position: usize) -> DecodeResult<String> {
    let first = read_u16_at(chunk, position)? as usize;
    let (units, position) = if first & 0x8000 != 0 {
        let second = read_u16_at(chunk, position + 2)? as usize;
        (((first & 0x7FFF) << 16) | second, position + 4)
    } else {
        (first, position + 2)
    };

    let raw = slice(chunk, position, units * 2)?;
    let mut buffer = Vec::with_capacity(units);
    let mut cursor = Cursor::new(raw);
    for _ in 0..units {
        buffer.push(cursor.read_u16::<LittleEndian>()?);
    }

    Ok(String::from_utf16_lossy(&buffer))
}

/// Resource value data types (`Res_value::dataType`).
pub mod value_type {
    pub const NULL: u8 = 0x00;
    pub const REFERENCE: u8 = 0x01;
    pub const STRING: u8 = 0x03;
    pub const INT_DEC: u8 = 0x10;
    pub const INT_HEX: u8 = 0x11;
    pub const INT_BOOLEAN: u8 = 0x12;
}

/// Raw `Res_value`: 8 bytes of `size: u16, res0: u8, data_type: u8, data: u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResValue {
    pub data_type: u8,
    pub data: u32,
}

impl ResValue {
    pub fn parse(data: &[u8], offset: usize) -> DecodeResult<Self> {
        let data_type = read_u8_at(data, offset + 3)?;
        let value = read_u32_at(data, offset + 4)?;
        Ok(Self {
            data_type,
            data: value,
        })
    }
}
