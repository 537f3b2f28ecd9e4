// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timestamped basic data types exchanged by data ports.

use super::{CdrData, CdrError, CdrReader, CdrWriter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock timestamp carried by every timed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    /// Seconds since the Unix epoch.
    pub sec: u32,
    /// Nanoseconds within the second.
    pub nsec: u32,
}

impl Time {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            sec: u32::try_from(d.as_secs()).unwrap_or(u32::MAX),
            nsec: d.subsec_nanos(),
        }
    }
}

impl CdrData for Time {
    const TYPE_NAME: &'static str = "RTC::Time";

    fn encode(&self, w: &mut CdrWriter) {
        w.write_u32(self.sec);
        w.write_u32(self.nsec);
    }

    fn decode(r: &mut CdrReader<'_>) -> Result<Self, CdrError> {
        Ok(Self {
            sec: r.read_u32()?,
            nsec: r.read_u32()?,
        })
    }
}

macro_rules! timed_types {
    ($($(#[$doc:meta])* $name:ident($ty:ty) => $type_name:expr;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, PartialEq, Default)]
            pub struct $name {
                /// Sample timestamp.
                pub tm: Time,
                /// Sample value.
                pub data: $ty,
            }

            impl $name {
                /// Sample stamped with the current time.
                pub fn now(data: $ty) -> Self {
                    Self { tm: Time::now(), data }
                }
            }

            impl CdrData for $name {
                const TYPE_NAME: &'static str = $type_name;

                fn encode(&self, w: &mut CdrWriter) {
                    self.tm.encode(w);
                    self.data.encode(w);
                }

                fn decode(r: &mut CdrReader<'_>) -> Result<Self, CdrError> {
                    let tm = Time::decode(r)?;
                    let data = <$ty>::decode(r)?;
                    Ok(Self { tm, data })
                }
            }
        )*
    };
}

timed_types! {
    /// Timestamped `double`.
    TimedDouble(f64) => "IDL:RTC/TimedDouble:1.0";
    /// Timestamped `float`.
    TimedFloat(f32) => "IDL:RTC/TimedFloat:1.0";
    /// Timestamped `long`.
    TimedLong(i32) => "IDL:RTC/TimedLong:1.0";
    /// Timestamped `unsigned long`.
    TimedULong(u32) => "IDL:RTC/TimedULong:1.0";
    /// Timestamped `short`.
    TimedShort(i16) => "IDL:RTC/TimedShort:1.0";
    /// Timestamped `boolean`.
    TimedBoolean(bool) => "IDL:RTC/TimedBoolean:1.0";
    /// Timestamped `octet`.
    TimedOctet(u8) => "IDL:RTC/TimedOctet:1.0";
    /// Timestamped `string`.
    TimedString(String) => "IDL:RTC/TimedString:1.0";
    /// Timestamped sequence of `double`.
    TimedDoubleSeq(Vec<f64>) => "IDL:RTC/TimedDoubleSeq:1.0";
    /// Timestamped sequence of `long`.
    TimedLongSeq(Vec<i32>) => "IDL:RTC/TimedLongSeq:1.0";
    /// Timestamped sequence of `octet`.
    TimedOctetSeq(Vec<u8>) => "IDL:RTC/TimedOctetSeq:1.0";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{deserialize, serialize, Endian};

    #[test]
    fn test_timed_string_big_endian() {
        let sample = TimedString {
            tm: Time { sec: 10, nsec: 20 },
            data: "hello".to_string(),
        };
        let data = serialize(&sample, Endian::Big);
        assert_eq!(&data.as_bytes()[..8], &[0, 0, 0, 10, 0, 0, 0, 20]);
        let back: TimedString = deserialize(&data).expect("decode");
        assert_eq!(back, sample);
    }

    #[test]
    fn test_timed_double_alignment() {
        let sample = TimedDouble {
            tm: Time { sec: 1, nsec: 2 },
            data: 3.5,
        };
        let data = serialize(&sample, Endian::Little);
        assert_eq!(data.len(), 16);
    }
}
