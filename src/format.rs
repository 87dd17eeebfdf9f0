//! Binary encoding of a temp data mapping.
//!
//! Layout: one version byte, then entries until the end of the buffer. Each entry is a
//! varint-prefixed UTF-8 key, a one-byte type tag and a tag-specific payload. Integers are
//! little-endian; lengths and counts are unsigned LEB128.
//!
//! An empty string map is never written, so it reads back as an absent key.

use bytes::{Buf, BufMut, BytesMut};

use crate::{
    error::{Error, Result},
    value::{DateTimeKind, EnumValue, TempMap, TempValue, Timestamp},
};

pub const VERSION: u8 = 0x01;

const TAG_STRING: u8 = 1;
const TAG_INT32: u8 = 2;
const TAG_INT64: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_DATETIME: u8 = 5;
const TAG_GUID: u8 = 6;
const TAG_ENUM: u8 = 7;
const TAG_STRING_LIST: u8 = 8;
const TAG_STRING_MAP: u8 = 9;

/// Encode a mapping into the versioned binary payload.
pub fn encode(values: &TempMap) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(VERSION);

    for (key, value) in values {
        if let TempValue::StringMap(map) = value
            && map.is_empty()
        {
            continue;
        }
        put_str(&mut buf, key)?;
        put_value(&mut buf, value)?;
    }

    Ok(buf.to_vec())
}

/// Decode a payload produced by [`encode`]. Empty input decodes to an empty mapping.
pub fn decode(bytes: &[u8]) -> Result<TempMap> {
    let mut values = TempMap::new();
    let Some((&version, rest)) = bytes.split_first() else {
        return Ok(values);
    };
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let mut reader = Reader { buf: rest };
    while reader.has_remaining() {
        let key = reader.string()?;
        let tag = reader.u8()?;
        let value = reader.value(tag)?;
        if let TempValue::StringMap(map) = &value
            && map.is_empty()
        {
            continue;
        }
        values.insert(key, value);
    }

    Ok(values)
}

fn put_value(buf: &mut BytesMut, value: &TempValue) -> Result<()> {
    match value {
        TempValue::String(value) => {
            buf.put_u8(TAG_STRING);
            put_str(buf, value)?;
        }
        TempValue::Int32(value) => {
            buf.put_u8(TAG_INT32);
            buf.put_i32_le(*value);
        }
        TempValue::Int64(value) => {
            buf.put_u8(TAG_INT64);
            buf.put_i64_le(*value);
        }
        TempValue::Bool(value) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(u8::from(*value));
        }
        TempValue::DateTime(value) => {
            buf.put_u8(TAG_DATETIME);
            buf.put_i64_le(value.ticks());
            buf.put_u8(value.kind() as u8);
        }
        TempValue::Guid(value) => {
            buf.put_u8(TAG_GUID);
            buf.put_slice(value.as_bytes());
        }
        TempValue::Enum(value) => {
            if value.type_name().is_empty() {
                return Err(Error::UnsupportedType("enum without a type name".into()));
            }
            buf.put_u8(TAG_ENUM);
            put_str(buf, value.type_name())?;
            buf.put_i32_le(value.discriminant());
        }
        TempValue::StringList(items) => {
            buf.put_u8(TAG_STRING_LIST);
            put_len(buf, items.len())?;
            for item in items {
                put_str(buf, item)?;
            }
        }
        TempValue::StringMap(map) => {
            buf.put_u8(TAG_STRING_MAP);
            put_len(buf, map.len())?;
            for (key, item) in map {
                put_str(buf, key)?;
                put_str(buf, item)?;
            }
        }
    }
    Ok(())
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| Error::Encode(format!("length {len} does not fit the payload format")))?;
    let mut scratch = unsigned_varint::encode::u32_buffer();
    buf.put_slice(unsigned_varint::encode::u32(len, &mut scratch));
    Ok(())
}

fn put_str(buf: &mut BytesMut, value: &str) -> Result<()> {
    put_len(buf, value.len())?;
    buf.put_slice(value.as_bytes());
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    fn ensure(&self, len: usize) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(Error::CorruptData);
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    fn i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_le())
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn len(&mut self) -> Result<usize> {
        let (len, rest) =
            unsigned_varint::decode::u32(self.buf).map_err(|_| Error::CorruptData)?;
        self.buf = rest;
        usize::try_from(len).map_err(|_| Error::CorruptData)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.len()?;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::CorruptData)
    }

    fn value(&mut self, tag: u8) -> Result<TempValue> {
        let value = match tag {
            TAG_STRING => TempValue::String(self.string()?),
            TAG_INT32 => TempValue::Int32(self.i32()?),
            TAG_INT64 => TempValue::Int64(self.i64()?),
            TAG_BOOL => match self.u8()? {
                0 => TempValue::Bool(false),
                1 => TempValue::Bool(true),
                _ => return Err(Error::CorruptData),
            },
            TAG_DATETIME => {
                let ticks = self.i64()?;
                let kind = DateTimeKind::from_u8(self.u8()?).ok_or(Error::CorruptData)?;
                TempValue::DateTime(Timestamp::new(ticks, kind).ok_or(Error::CorruptData)?)
            }
            TAG_GUID => {
                let bytes = self.bytes(16)?;
                let guid = uuid::Uuid::from_slice(bytes).map_err(|_| Error::CorruptData)?;
                TempValue::Guid(guid)
            }
            TAG_ENUM => {
                let type_name = self.string()?;
                let discriminant = self.i32()?;
                TempValue::Enum(EnumValue::new(type_name, discriminant))
            }
            TAG_STRING_LIST => {
                let count = self.len()?;
                // Every item takes at least one byte, which caps allocations from hostile counts.
                let mut items = Vec::with_capacity(count.min(self.buf.len()));
                for _ in 0..count {
                    items.push(self.string()?);
                }
                TempValue::StringList(items)
            }
            TAG_STRING_MAP => {
                let count = self.len()?;
                let mut map = std::collections::BTreeMap::new();
                for _ in 0..count {
                    let key = self.string()?;
                    let item = self.string()?;
                    map.insert(key, item);
                }
                TempValue::StringMap(map)
            }
            other => return Err(Error::UnsupportedType(format!("tag {other:#04x}"))),
        };
        Ok(value)
    }
}
