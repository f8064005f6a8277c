//! Tagged `Property` values.
//!
//! Grounded on `sfbxProperty.cpp`/`.h` for the tag set and the read/write
//! algorithm; reimplemented as a Rust enum per tag rather than a single
//! struct carrying a runtime tag byte plus a raw buffer, favoring a typed
//! enum (cf. `MorphKinds`, `ToonMode`) over a C-style tagged union.

use crate::error::{FbxError, Result};
use crate::primitive::{deflate, inflate, ByteReader, ByteWriter};

/// Element encoding of an array property on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayEncoding {
    Raw,
    Deflate,
}

/// A single tagged FBX property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(Vec<u8>),
    Blob(Vec<u8>),
    BoolArray(Vec<bool>),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Float32Array(Vec<f32>),
    Float64Array(Vec<f64>),
}

impl Property {
    /// The single-ASCII-character tag this value is written under.
    pub fn tag(&self) -> u8 {
        match self {
            Property::Bool(_) => b'C',
            Property::Int8(_) => b'B',
            Property::Int16(_) => b'Y',
            Property::Int32(_) => b'I',
            Property::Int64(_) => b'L',
            Property::Float32(_) => b'F',
            Property::Float64(_) => b'D',
            Property::String(_) => b'S',
            Property::Blob(_) => b'R',
            Property::BoolArray(_) => b'b',
            Property::Int8Array(_) => b'c',
            Property::Int16Array(_) => b'y',
            Property::Int32Array(_) => b'i',
            Property::Int64Array(_) => b'l',
            Property::Float32Array(_) => b'f',
            Property::Float64Array(_) => b'd',
        }
    }

    pub fn is_array(&self) -> bool {
        self.tag() > b'Z'
    }

    /// Exact on-disk byte size of this property, tag included. This
    /// corrects the original C++ source's `getSizeInBytes` off-by-half
    /// bug for Int64/Float64.
    pub fn serialized_size(&self) -> u64 {
        let payload: u64 = match self {
            Property::Bool(_) | Property::Int8(_) => 1,
            Property::Int16(_) => 2,
            Property::Int32(_) | Property::Float32(_) => 4,
            Property::Int64(_) | Property::Float64(_) => 8,
            Property::String(d) | Property::Blob(d) => 4 + d.len() as u64,
            Property::BoolArray(v) => 12 + v.len() as u64,
            Property::Int8Array(v) => 12 + v.len() as u64,
            Property::Int16Array(v) => 12 + v.len() as u64 * 2,
            Property::Int32Array(v) => 12 + v.len() as u64 * 4,
            Property::Int64Array(v) => 12 + v.len() as u64 * 8,
            Property::Float32Array(v) => 12 + v.len() as u64 * 4,
            Property::Float64Array(v) => 12 + v.len() as u64 * 8,
        };
        1 + payload
    }

    /// Exact on-disk size if this property were written via
    /// [`Property::write_compressed`] instead of [`Property::write`].
    /// Non-array properties compress to the same size as
    /// `serialized_size`, since `write_compressed` passes them through
    /// unchanged.
    pub fn serialized_size_compressed(&self) -> u64 {
        if !self.is_array() {
            return self.serialized_size();
        }
        let compressed_len = deflate(&self.array_raw_bytes()).len() as u64;
        1 + 12 + compressed_len
    }

    fn element_size(tag: u8) -> usize {
        match tag {
            b'b' | b'c' => 1,
            b'y' => 2,
            b'i' | b'f' => 4,
            b'l' | b'd' => 8,
            _ => 1,
        }
    }

    pub fn read(r: &mut ByteReader) -> Result<Self> {
        let tag = r.read_u8()?;
        Ok(match tag {
            b'C' => Property::Bool(r.read_bool()?),
            b'B' => Property::Int8(r.read_i8()?),
            b'Y' => Property::Int16(r.read_i16()?),
            b'I' => Property::Int32(r.read_i32()?),
            b'L' => Property::Int64(r.read_i64()?),
            b'F' => Property::Float32(r.read_f32()?),
            b'D' => Property::Float64(r.read_f64()?),
            b'S' => {
                let len = r.read_u32()? as usize;
                Property::String(r.read_bytes(len)?.to_vec())
            }
            b'R' => {
                let len = r.read_u32()? as usize;
                Property::Blob(r.read_bytes(len)?.to_vec())
            }
            b'b' | b'c' | b'y' | b'i' | b'l' | b'f' | b'd' => {
                let count = r.read_u32()? as usize;
                let encoding = r.read_u32()?;
                let compressed_len = r.read_u32()? as usize;
                let elem_size = Self::element_size(tag);
                let raw_len = count * elem_size;
                let raw = if encoding == 0 {
                    r.read_bytes(compressed_len)?.to_vec()
                } else {
                    let compressed = r.read_bytes(compressed_len)?;
                    inflate(compressed, raw_len)?
                };
                Self::array_from_raw(tag, &raw)
            }
            other => return Err(FbxError::BadPropertyTag(other)),
        })
    }

    fn array_from_raw(tag: u8, raw: &[u8]) -> Property {
        match tag {
            b'b' => Property::BoolArray(raw.iter().map(|b| *b & 1 != 0).collect()),
            b'c' => Property::Int8Array(raw.iter().map(|b| *b as i8).collect()),
            b'y' => Property::Int16Array(
                raw.chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            b'i' => Property::Int32Array(
                raw.chunks_exact(4)
                    .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            b'l' => Property::Int64Array(
                raw.chunks_exact(8)
                    .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            b'f' => Property::Float32Array(
                raw.chunks_exact(4)
                    .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            b'd' => Property::Float64Array(
                raw.chunks_exact(8)
                    .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            _ => unreachable!("array_from_raw called with non-array tag"),
        }
    }

    fn array_raw_bytes(&self) -> Vec<u8> {
        match self {
            Property::BoolArray(v) => v.iter().map(|b| *b as u8).collect(),
            Property::Int8Array(v) => v.iter().map(|b| *b as u8).collect(),
            Property::Int16Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Property::Int32Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Property::Int64Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Property::Float32Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Property::Float64Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn array_len(&self) -> usize {
        match self {
            Property::BoolArray(v) => v.len(),
            Property::Int8Array(v) => v.len(),
            Property::Int16Array(v) => v.len(),
            Property::Int32Array(v) => v.len(),
            Property::Int64Array(v) => v.len(),
            Property::Float32Array(v) => v.len(),
            Property::Float64Array(v) => v.len(),
            _ => 0,
        }
    }

    /// Always writes `encoding = 0` (raw). Callers that want DEFLATE
    /// encoding instead use [`Property::write_compressed`];
    /// `Document::write` picks between the two per `WriteOptions::compress_arrays`.
    pub fn write(&self, w: &mut ByteWriter) {
        w.write_u8(self.tag());
        match self {
            Property::Bool(v) => w.write_bool(*v),
            Property::Int8(v) => w.write_i8(*v),
            Property::Int16(v) => w.write_i16(*v),
            Property::Int32(v) => w.write_i32(*v),
            Property::Int64(v) => w.write_i64(*v),
            Property::Float32(v) => w.write_f32(*v),
            Property::Float64(v) => w.write_f64(*v),
            Property::String(d) | Property::Blob(d) => {
                w.write_u32(d.len() as u32);
                w.write_bytes(d);
            }
            _ => {
                let raw = self.array_raw_bytes();
                w.write_u32(self.array_len() as u32);
                w.write_u32(0); // encoding: raw
                w.write_u32(raw.len() as u32);
                w.write_bytes(&raw);
            }
        }
    }

    /// Write this array property with DEFLATE encoding instead of raw.
    /// Non-array properties fall back to [`Property::write`] unchanged.
    pub fn write_compressed(&self, w: &mut ByteWriter) {
        if !self.is_array() {
            self.write(w);
            return;
        }
        w.write_u8(self.tag());
        let raw = self.array_raw_bytes();
        let compressed = deflate(&raw);
        w.write_u32(self.array_len() as u32);
        w.write_u32(1); // encoding: deflate
        w.write_u32(compressed.len() as u32);
        w.write_bytes(&compressed);
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Property::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Property::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Property::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Property::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Property::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(d) => std::str::from_utf8(d).ok(),
            _ => None,
        }
    }

    pub fn as_f64_array(&self) -> Option<&[f64]> {
        match self {
            Property::Float64Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32_array(&self) -> Option<&[f32]> {
        match self {
            Property::Float32Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32_array(&self) -> Option<&[i32]> {
        match self {
            Property::Int32Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64_array(&self) -> Option<&[i64]> {
        match self {
            Property::Int64Array(v) => Some(v),
            _ => None,
        }
    }

    /// Textual rendering for the ASCII dump.
    pub fn to_dump_string(&self) -> String {
        match self {
            Property::Bool(v) => if *v { "true".into() } else { "false".into() },
            Property::Int8(v) => v.to_string(),
            Property::Int16(v) => v.to_string(),
            Property::Int32(v) => v.to_string(),
            Property::Int64(v) => v.to_string(),
            Property::Float32(v) => v.to_string(),
            Property::Float64(v) => v.to_string(),
            Property::Blob(d) => {
                let body: Vec<String> = d.iter().map(|b| b.to_string()).collect();
                format!("\"{}\"", body.join(" "))
            }
            Property::String(d) => {
                let mut s = String::from("\"");
                for &b in d {
                    if b == b'\\' {
                        s.push_str("\\\\");
                    } else if (32..=126).contains(&b) {
                        s.push(b as char);
                    } else {
                        s.push_str(&format!("\\u00{:02x}", b));
                    }
                }
                s.push('"');
                s
            }
            Property::BoolArray(v) => dump_array(v.iter().map(|b| if *b { "true" } else { "false" }.to_string())),
            Property::Int8Array(v) => dump_array(v.iter().map(|x| (*x as u8).to_string())),
            Property::Int16Array(v) => dump_array(v.iter().map(|x| x.to_string())),
            Property::Int32Array(v) => dump_array(v.iter().map(|x| x.to_string())),
            Property::Int64Array(v) => dump_array(v.iter().map(|x| x.to_string())),
            Property::Float32Array(v) => dump_array(v.iter().map(|x| x.to_string())),
            Property::Float64Array(v) => dump_array(v.iter().map(|x| x.to_string())),
        }
    }
}

fn dump_array(items: impl Iterator<Item = String>) -> String {
    let body: Vec<String> = items.collect();
    format!("[{}]", body.join(", "))
}

impl From<bool> for Property {
    fn from(v: bool) -> Self {
        Property::Bool(v)
    }
}
impl From<i32> for Property {
    fn from(v: i32) -> Self {
        Property::Int32(v)
    }
}
impl From<i64> for Property {
    fn from(v: i64) -> Self {
        Property::Int64(v)
    }
}
impl From<f32> for Property {
    fn from(v: f32) -> Self {
        Property::Float32(v)
    }
}
impl From<f64> for Property {
    fn from(v: f64) -> Self {
        Property::Float64(v)
    }
}
impl From<&str> for Property {
    fn from(v: &str) -> Self {
        Property::String(v.as_bytes().to_vec())
    }
}
impl From<String> for Property {
    fn from(v: String) -> Self {
        Property::String(v.into_bytes())
    }
}
impl From<Vec<i32>> for Property {
    fn from(v: Vec<i32>) -> Self {
        Property::Int32Array(v)
    }
}
impl From<Vec<f64>> for Property {
    fn from(v: Vec<f64>) -> Self {
        Property::Float64Array(v)
    }
}
impl From<Vec<f32>> for Property {
    fn from(v: Vec<f32>) -> Self {
        Property::Float32Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_renders_unsigned_decimal() {
        // byte 200 must render as "200", not "-56".
        let p = Property::Blob(vec![200, 0, 255]);
        assert_eq!(p.to_dump_string(), "\"200 0 255\"");
    }

    #[test]
    fn string_escapes_backslash_and_control_bytes() {
        let p = Property::String(b"a\\b\x01".to_vec());
        assert_eq!(p.to_dump_string(), "\"a\\\\b\\u0001\"");
    }

    #[test]
    fn scalar_round_trips_through_bytes() {
        let p = Property::Float64(3.5);
        let mut w = ByteWriter::new();
        p.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), p.serialized_size() as usize);
        let mut r = ByteReader::new(&bytes);
        let p2 = Property::read(&mut r).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn array_round_trips_raw() {
        let p = Property::Int32Array(vec![1, -2, 3, i32::MIN]);
        let mut w = ByteWriter::new();
        p.write(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), p.serialized_size() as usize);
        let mut r = ByteReader::new(&bytes);
        let p2 = Property::read(&mut r).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn array_round_trips_compressed() {
        let p = Property::Float64Array(vec![1.0, 2.5, -3.25, 0.0]);
        let mut w = ByteWriter::new();
        p.write_compressed(&mut w);
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        let p2 = Property::read(&mut r).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn int64_serialized_size_is_nine_not_five() {
        // corrects the original getSizeInBytes() off-by-half bug.
        let p = Property::Int64(1);
        assert_eq!(p.serialized_size(), 9);
        let p = Property::Float64(1.0);
        assert_eq!(p.serialized_size(), 9);
    }
}
