//! Timestamp encoding for the second slot of a Forward message.
//!
//! Fluentd accepts either a plain integer of seconds since the epoch or the
//! `EventTime` extension (type `0x00`, 8-byte payload) carrying nanoseconds.
//! Older collectors only understand the integer form, so the choice is a
//! deployment setting expressed as [`TimestampFormat`].

use std::{
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, TimeZone};
use rmp::encode as mp;
use serde::{Deserialize, Serialize};

use crate::encoder::EncodingError;

/// MessagePack extension type code reserved by Fluentd for `EventTime`.
pub const EVENT_TIME_EXT_TYPE: i8 = 0x00;
/// Size of the `EventTime` payload: two big-endian `u32` halves.
pub const EVENT_TIME_PAYLOAD_LEN: u32 = 8;

const MAX_NANOS: u32 = 999_999_999;

/// Second-resolution time split into seconds and nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTime {
    pub seconds: u32,
    pub nanoseconds: u32,
}

impl EventTime {
    /// Build from whole seconds since the epoch and a nanosecond remainder.
    pub fn new(seconds: u32, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Split a wall-clock time into UTC seconds and the nanosecond remainder.
    ///
    /// Times before the epoch clamp to zero and seconds past `u32::MAX`
    /// saturate, as the wire format cannot represent either.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            seconds: u32::try_from(since_epoch.as_secs()).unwrap_or(u32::MAX),
            nanoseconds: since_epoch.subsec_nanos(),
        }
    }

    /// The 8-byte extension payload.
    pub fn to_payload(self) -> [u8; 8] {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&self.seconds.to_be_bytes());
        payload[4..].copy_from_slice(&self.nanoseconds.to_be_bytes());
        payload
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for EventTime {
    fn from(time: DateTime<Tz>) -> Self {
        let seconds = time.timestamp();
        if seconds < 0 {
            return Self::default();
        }
        Self {
            seconds: u32::try_from(seconds).unwrap_or(u32::MAX),
            // chrono reports leap seconds as nanoseconds >= 1e9
            nanoseconds: time.timestamp_subsec_nanos().min(MAX_NANOS),
        }
    }
}

impl From<SystemTime> for EventTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

/// Which wire form to use for message timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Whole seconds as a MessagePack unsigned integer.
    #[default]
    Integer,
    /// The `EventTime` extension with nanosecond precision.
    EventTime,
}

/// A message timestamp in one of the two wire forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timestamp {
    Integer(u64),
    EventTime(EventTime),
}

impl Timestamp {
    /// Derive a timestamp from `time` in the requested `format`.
    pub fn from_system_time(time: SystemTime, format: TimestampFormat) -> Self {
        match format {
            TimestampFormat::Integer => Self::Integer(
                time.duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default(),
            ),
            TimestampFormat::EventTime => Self::EventTime(EventTime::from_system_time(time)),
        }
    }

    /// Timestamp for the current wall-clock time, for records that carry
    /// no time of their own.
    pub fn now(format: TimestampFormat) -> Self {
        Self::from_system_time(SystemTime::now(), format)
    }
}

impl From<EventTime> for Timestamp {
    fn from(value: EventTime) -> Self {
        Self::EventTime(value)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

/// Write `timestamp` onto `sink`.
///
/// `EventTime` values become a `fixext8` (`d7 00` followed by the payload,
/// ten bytes in total); integer timestamps are written as plain unsigned
/// integers in the narrowest format.
pub fn encode_event_time<W: Write>(timestamp: Timestamp, sink: &mut W) -> Result<(), EncodingError> {
    match timestamp {
        Timestamp::Integer(seconds) => {
            mp::write_uint(sink, seconds)?;
        }
        Timestamp::EventTime(time) => {
            mp::write_ext_meta(sink, EVENT_TIME_PAYLOAD_LEN, EVENT_TIME_EXT_TYPE)?;
            sink.write_all(&time.to_payload())?;
        }
    }
    Ok(())
}
