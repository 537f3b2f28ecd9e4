// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR encoding of port payloads.
//!
//! Payloads cross connectors as opaque [`ByteData`]: the encoded bytes plus the
//! byte order they were encoded with. Writers pick the byte order per connection
//! (`serializer.cdr.endian`, little-endian by default); readers decode with the
//! order carried by the payload, so mixed-endian connections need no
//! negotiation beyond the writer's choice.
//!
//! Primitive alignment follows CDR: every primitive is aligned to its own size
//! relative to the start of the payload.

mod codec;
pub mod types;

pub use codec::{CdrReader, CdrWriter};
pub use types::{
    Time, TimedBoolean, TimedDouble, TimedDoubleSeq, TimedFloat, TimedLong, TimedLongSeq,
    TimedOctet, TimedOctetSeq, TimedShort, TimedString, TimedULong,
};

use std::sync::Arc;
use thiserror::Error;

/// Byte order of an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// Little-endian (default on the wire).
    #[default]
    Little,
    /// Big-endian.
    Big,
}

impl Endian {
    /// Byte order of the running host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    /// Parse one name (`little`/`big`, case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "little" | "le" => Some(Endian::Little),
            "big" | "be" => Some(Endian::Big),
            _ => None,
        }
    }

    /// Pick the first recognised entry of a comma list; little-endian if none.
    pub fn from_list(list: &str) -> Self {
        list.split(',').find_map(Endian::parse).unwrap_or_default()
    }

    /// Lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
        }
    }
}

/// Serialized payload plus its byte-order marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteData {
    data: Arc<[u8]>,
    endian: Endian,
}

impl ByteData {
    /// Wrap encoded bytes.
    pub fn new(data: impl Into<Arc<[u8]>>, endian: Endian) -> Self {
        Self {
            data: data.into(),
            endian,
        }
    }

    /// Encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte order the bytes were encoded with.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for an empty payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for ByteData {
    fn default() -> Self {
        Self::new(Vec::new(), Endian::Little)
    }
}

/// Decoding failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CdrError {
    /// Payload ended before the value was complete.
    #[error("unexpected end of payload: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the next read.
        needed: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },
    /// String was not NUL terminated or not valid UTF-8.
    #[error("invalid string encoding")]
    InvalidString,
    /// Boolean octet other than 0 or 1.
    #[error("invalid boolean value {0}")]
    InvalidBool(u8),
}

/// A value that can travel through a data port.
pub trait CdrData: Clone + Default + Send + Sync + 'static {
    /// Type name advertised in port profiles and checked at connect time.
    const TYPE_NAME: &'static str;

    /// Append the encoded value.
    fn encode(&self, w: &mut CdrWriter);

    /// Decode one value.
    fn decode(r: &mut CdrReader<'_>) -> Result<Self, CdrError>;
}

/// Encode `value` with the requested byte order.
pub fn serialize<T: CdrData>(value: &T, endian: Endian) -> ByteData {
    let mut w = CdrWriter::new(endian);
    value.encode(&mut w);
    w.finish()
}

/// Decode a payload with the byte order it carries.
pub fn deserialize<T: CdrData>(data: &ByteData) -> Result<T, CdrError> {
    let mut r = CdrReader::new(data.as_bytes(), data.endian());
    T::decode(&mut r)
}

macro_rules! primitive_cdr {
    ($($ty:ty => $name:expr, $write:ident, $read:ident;)*) => {
        $(
            impl CdrData for $ty {
                const TYPE_NAME: &'static str = $name;

                fn encode(&self, w: &mut CdrWriter) {
                    w.$write(*self);
                }

                fn decode(r: &mut CdrReader<'_>) -> Result<Self, CdrError> {
                    r.$read()
                }
            }
        )*
    };
}

primitive_cdr! {
    bool => "boolean", write_bool, read_bool;
    u8 => "octet", write_u8, read_u8;
    i16 => "short", write_i16, read_i16;
    u16 => "unsigned short", write_u16, read_u16;
    i32 => "long", write_i32, read_i32;
    u32 => "unsigned long", write_u32, read_u32;
    i64 => "long long", write_i64, read_i64;
    u64 => "unsigned long long", write_u64, read_u64;
    f32 => "float", write_f32, read_f32;
    f64 => "double", write_f64, read_f64;
}

impl CdrData for String {
    const TYPE_NAME: &'static str = "string";

    fn encode(&self, w: &mut CdrWriter) {
        w.write_string(self);
    }

    fn decode(r: &mut CdrReader<'_>) -> Result<Self, CdrError> {
        r.read_string()
    }
}

macro_rules! sequence_cdr {
    ($($elem:ty => $name:expr;)*) => {
        $(
            impl CdrData for Vec<$elem> {
                const TYPE_NAME: &'static str = $name;

                fn encode(&self, w: &mut CdrWriter) {
                    w.write_seq(self);
                }

                fn decode(r: &mut CdrReader<'_>) -> Result<Self, CdrError> {
                    r.read_seq()
                }
            }
        )*
    };
}

sequence_cdr! {
    u8 => "OctetSeq";
    i16 => "ShortSeq";
    i32 => "LongSeq";
    u32 => "ULongSeq";
    f32 => "FloatSeq";
    f64 => "DoubleSeq";
    String => "StringSeq";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endian_list_first_match() {
        assert_eq!(Endian::from_list("big,little"), Endian::Big);
        assert_eq!(Endian::from_list("middle, little"), Endian::Little);
        assert_eq!(Endian::from_list(""), Endian::Little);
    }

    #[test]
    fn test_big_endian_layout() {
        let data = serialize(&0x0102_0304_i32, Endian::Big);
        assert_eq!(data.as_bytes(), &[1, 2, 3, 4]);
        let data = serialize(&0x0102_0304_i32, Endian::Little);
        assert_eq!(data.as_bytes(), &[4, 3, 2, 1]);
    }

    #[test]
    fn test_decode_uses_carried_endian() {
        let value = vec![1.5_f64, -2.25, 1e9];
        for endian in [Endian::Little, Endian::Big] {
            let data = serialize(&value, endian);
            let back: Vec<f64> = deserialize(&data).expect("decode");
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let data = ByteData::new(vec![1_u8, 2], Endian::Little);
        let err = deserialize::<f64>(&data).expect_err("too short");
        assert_eq!(
            err,
            CdrError::UnexpectedEof {
                needed: 8,
                remaining: 2
            }
        );
    }
}
