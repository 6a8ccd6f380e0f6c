//! MessagePack encoding of [`DynamicValue`] trees.
//!
//! The encoder is a single recursive function over the closed variant set.
//! It writes straight to any [`Write`] sink and owns no buffering or I/O
//! policy; callers that need all-or-nothing output encode into a `Vec<u8>`
//! first (see [`crate::emitter`]).

use std::io::{self, Write};

use rmp::encode::{self as mp, ValueWriteError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::DynamicValue;

/// Errors raised while encoding a value.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A string, binary, map, or array is longer than a 32-bit header allows.
    #[error("{kind} length {len} exceeds the MessagePack limit")]
    LengthOverflow { kind: &'static str, len: usize },
    /// The sink rejected the encoded bytes.
    #[error("failed to write MessagePack data: {0}")]
    Write(#[from] io::Error),
}

impl From<ValueWriteError<io::Error>> for EncodingError {
    fn from(err: ValueWriteError<io::Error>) -> Self {
        match err {
            ValueWriteError::InvalidMarkerWrite(e) | ValueWriteError::InvalidDataWrite(e) => {
                Self::Write(e)
            }
        }
    }
}

/// How [`DynamicValue::Binary`] payloads are written.
///
/// Collectors built against the pre-2013 MessagePack spec have no `bin`
/// family and only understand `raw` (today's `str`). Which one a deployment
/// needs depends on the collector version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryEncoding {
    /// Use the `str` family headers (`fixstr`, `str8`, `str16`, `str32`).
    #[default]
    Raw,
    /// Use the `bin` family headers (`bin8`, `bin16`, `bin32`).
    Bin,
}

/// Options applied for a whole encoding pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub binary: BinaryEncoding,
}

impl EncodeOptions {
    /// Override the binary payload encoding.
    pub fn with_binary(mut self, binary: BinaryEncoding) -> Self {
        self.binary = binary;
        self
    }
}

fn checked_len(kind: &'static str, len: usize) -> Result<u32, EncodingError> {
    u32::try_from(len).map_err(|_| EncodingError::LengthOverflow { kind, len })
}

/// Write a UTF-8 string using the shortest `str` header that fits.
pub fn encode_str<W: Write>(sink: &mut W, value: &str) -> Result<(), EncodingError> {
    let len = checked_len("string", value.len())?;
    mp::write_str_len(sink, len)?;
    sink.write_all(value.as_bytes())?;
    Ok(())
}

fn encode_binary<W: Write>(
    sink: &mut W,
    bytes: &[u8],
    binary: BinaryEncoding,
) -> Result<(), EncodingError> {
    let len = checked_len("binary", bytes.len())?;
    match binary {
        BinaryEncoding::Raw => mp::write_str_len(sink, len)?,
        BinaryEncoding::Bin => mp::write_bin_len(sink, len)?,
    };
    sink.write_all(bytes)?;
    Ok(())
}

/// Encode `value` as MessagePack onto `sink`.
///
/// Nested mappings and sequences are encoded recursively, so the stack depth
/// follows the depth of the input tree.
///
/// # Errors
///
/// Returns [`EncodingError::LengthOverflow`] when a length does not fit a
/// 32-bit header and [`EncodingError::Write`] when the sink fails. Bytes
/// already written before the failure stay in the sink.
pub fn encode<W: Write>(
    value: &DynamicValue,
    sink: &mut W,
    options: EncodeOptions,
) -> Result<(), EncodingError> {
    match value {
        DynamicValue::Null => mp::write_nil(sink)?,
        DynamicValue::Bool(b) => mp::write_bool(sink, *b)?,
        DynamicValue::Int(i) => {
            mp::write_sint(sink, *i)?;
        }
        DynamicValue::UInt(u) => {
            mp::write_uint(sink, *u)?;
        }
        DynamicValue::Float(f) => mp::write_f64(sink, *f)?,
        DynamicValue::String(s) => encode_str(sink, s)?,
        DynamicValue::Binary(bytes) => encode_binary(sink, bytes, options.binary)?,
        DynamicValue::Mapping(pairs) => {
            mp::write_map_len(sink, checked_len("map", pairs.len())?)?;
            for (key, item) in pairs {
                encode_str(sink, key)?;
                encode(item, sink, options)?;
            }
        }
        DynamicValue::Sequence(items) => {
            mp::write_array_len(sink, checked_len("array", items.len())?)?;
            for item in items {
                encode(item, sink, options)?;
            }
        }
    }
    Ok(())
}

/// Encode `value` into a freshly allocated buffer.
pub fn encode_to_vec(value: &DynamicValue, options: EncodeOptions) -> Result<Vec<u8>, EncodingError> {
    let mut buf = Vec::with_capacity(128);
    encode(value, &mut buf, options)?;
    Ok(buf)
}
