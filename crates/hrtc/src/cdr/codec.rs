// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-order aware CDR writer and reader.

use super::{ByteData, CdrData, CdrError, Endian};

/// Appends CDR-encoded primitives to a growable buffer.
pub struct CdrWriter {
    buf: Vec<u8>,
    endian: Endian,
}

macro_rules! write_num {
    ($($fn:ident: $ty:ty;)*) => {
        $(
            /// Append one aligned primitive.
            pub fn $fn(&mut self, v: $ty) {
                self.align(std::mem::size_of::<$ty>());
                match self.endian {
                    Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
                    Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
                }
            }
        )*
    };
}

impl CdrWriter {
    /// New writer with the given byte order.
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::with_capacity(64),
            endian,
        }
    }

    /// Byte order in use.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    fn align(&mut self, n: usize) {
        let pad = (n - self.buf.len() % n) % n;
        self.buf.resize(self.buf.len() + pad, 0);
    }

    /// Append one octet.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Append a boolean as one octet.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    write_num! {
        write_i16: i16;
        write_u16: u16;
        write_i32: i32;
        write_u32: u32;
        write_i64: i64;
        write_u64: u64;
        write_f32: f32;
        write_f64: f64;
    }

    /// Append a string: length (including NUL), bytes, NUL.
    pub fn write_string(&mut self, s: &str) {
        let len = u32::try_from(s.len() + 1).unwrap_or(u32::MAX);
        self.write_u32(len);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Append a sequence: element count then elements.
    pub fn write_seq<T: CdrData>(&mut self, items: &[T]) {
        self.write_u32(u32::try_from(items.len()).unwrap_or(u32::MAX));
        for item in items {
            item.encode(self);
        }
    }

    /// Finish encoding.
    pub fn finish(self) -> ByteData {
        ByteData::new(self.buf, self.endian)
    }
}

/// Reads CDR-encoded primitives from a byte slice.
pub struct CdrReader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

macro_rules! read_num {
    ($($fn:ident: $ty:ty;)*) => {
        $(
            /// Read one aligned primitive.
            pub fn $fn(&mut self) -> Result<$ty, CdrError> {
                const N: usize = std::mem::size_of::<$ty>();
                self.align(N);
                let bytes = self.take(N)?;
                let mut raw = [0u8; N];
                raw.copy_from_slice(bytes);
                Ok(match self.endian {
                    Endian::Little => <$ty>::from_le_bytes(raw),
                    Endian::Big => <$ty>::from_be_bytes(raw),
                })
            }
        )*
    };
}

impl<'a> CdrReader<'a> {
    /// New reader over `data` encoded with `endian`.
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CdrError> {
        if self.remaining() < n {
            return Err(CdrError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn align(&mut self, n: usize) {
        let pad = (n - self.pos % n) % n;
        if self.remaining() >= pad {
            self.pos += pad;
        }
    }

    /// Read one octet.
    pub fn read_u8(&mut self) -> Result<u8, CdrError> {
        Ok(self.take(1)?[0])
    }

    /// Read a boolean octet.
    pub fn read_bool(&mut self) -> Result<bool, CdrError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CdrError::InvalidBool(other)),
        }
    }

    read_num! {
        read_i16: i16;
        read_u16: u16;
        read_i32: i32;
        read_u32: u32;
        read_i64: i64;
        read_u64: u64;
        read_f32: f32;
        read_f64: f64;
    }

    /// Read a NUL-terminated string.
    pub fn read_string(&mut self) -> Result<String, CdrError> {
        let len = self.read_u32()? as usize;
        if len == 0 {
            return Err(CdrError::InvalidString);
        }
        let bytes = self.take(len)?;
        let (body, nul) = bytes.split_at(len - 1);
        if nul != [0] {
            return Err(CdrError::InvalidString);
        }
        String::from_utf8(body.to_vec()).map_err(|_| CdrError::InvalidString)
    }

    /// Read a sequence of `T`.
    pub fn read_seq<T: CdrData>(&mut self) -> Result<Vec<T>, CdrError> {
        let count = self.read_u32()? as usize;
        // Cap the pre-allocation: a corrupt length must not reserve gigabytes.
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_padding() {
        let mut w = CdrWriter::new(Endian::Little);
        w.write_u8(7);
        w.write_f64(1.0);
        let data = w.finish();
        assert_eq!(data.len(), 16);
        let mut r = CdrReader::new(data.as_bytes(), data.endian());
        assert_eq!(r.read_u8(), Ok(7));
        assert_eq!(r.read_f64(), Ok(1.0));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_string_layout() {
        let mut w = CdrWriter::new(Endian::Big);
        w.write_string("ab");
        let data = w.finish();
        assert_eq!(data.as_bytes(), &[0, 0, 0, 3, b'a', b'b', 0]);
    }

    #[test]
    fn test_invalid_bool() {
        let mut r = CdrReader::new(&[2], Endian::Little);
        assert_eq!(r.read_bool(), Err(CdrError::InvalidBool(2)));
    }
}
