//! Forward protocol "Message" mode framing.
//!
//! Each event becomes the three element array `[tag, time, record]`. The
//! message is encoded into a scratch buffer first so that an encoding
//! failure leaves the sink untouched, then handed over with a single
//! `write_all` followed by `flush`.

use std::io::Write;

use crate::{
    encoder::{EncodeOptions, EncodingError, encode, encode_str},
    error::ForwardError,
    event_time::{Timestamp, encode_event_time},
    value::Mapping,
};

/// One log event addressed to a Fluentd tag.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardMessage {
    pub tag: String,
    pub timestamp: Timestamp,
    pub record: Mapping,
}

impl ForwardMessage {
    /// Address `record` to `tag` at `timestamp`.
    pub fn new(tag: impl Into<String>, timestamp: Timestamp, record: Mapping) -> Self {
        Self {
            tag: tag.into(),
            timestamp,
            record,
        }
    }
}

/// Stateless writer of Forward messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct Emitter {
    options: EncodeOptions,
}

impl Emitter {
    /// Emitter encoding binary values according to `options`.
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Encode `message` into a standalone MessagePack array.
    pub fn encode(&self, message: &ForwardMessage) -> Result<Vec<u8>, EncodingError> {
        let mut buf = Vec::with_capacity(256);
        rmp::encode::write_array_len(&mut buf, 3)?;
        encode_str(&mut buf, &message.tag)?;
        encode_event_time(message.timestamp, &mut buf)?;
        rmp::encode::write_map_len(&mut buf, map_len(&message.record)?)?;
        for (key, value) in &message.record {
            encode_str(&mut buf, key)?;
            encode(value, &mut buf, self.options)?;
        }
        Ok(buf)
    }

    /// Encode `message` and write it to `sink` as one flushed unit.
    ///
    /// # Errors
    ///
    /// [`ForwardError::Encoding`] when the message cannot be encoded (nothing
    /// is written) and [`ForwardError::Write`] when the sink fails during the
    /// write or the flush.
    pub fn emit<W: Write>(&self, sink: &mut W, message: &ForwardMessage) -> Result<(), ForwardError> {
        let frame = self.encode(message)?;
        write_frame(sink, &frame)
    }
}

fn map_len(record: &Mapping) -> Result<u32, EncodingError> {
    u32::try_from(record.len()).map_err(|_| EncodingError::LengthOverflow {
        kind: "map",
        len: record.len(),
    })
}

/// Hand an encoded message to the transport immediately.
pub(crate) fn write_frame<W: Write>(sink: &mut W, frame: &[u8]) -> Result<(), ForwardError> {
    sink.write_all(frame).map_err(ForwardError::Write)?;
    sink.flush().map_err(ForwardError::Write)
}

/// Convenience wrapper matching the `[tag, time, record]` argument order.
pub fn emit<W: Write>(
    sink: &mut W,
    timestamp: Timestamp,
    tag: &str,
    record: &Mapping,
    options: EncodeOptions,
) -> Result<(), ForwardError> {
    let message = ForwardMessage {
        tag: tag.to_owned(),
        timestamp,
        record: record.clone(),
    };
    Emitter::new(options).emit(sink, &message)
}
