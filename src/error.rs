//! Errors surfaced to callers of the forwarding pipeline.

use std::io;

use thiserror::Error;

use crate::encoder::EncodingError;

/// Failure of a single `emit` call.
///
/// Every variant is returned to the caller; nothing is retried or dropped
/// silently. Errors raised while tearing a connection down are logged and
/// counted by the connection manager instead.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The collector could not be reached, or a socket option was rejected.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    /// The message could not be encoded; nothing was written.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The transport failed while writing or flushing the message.
    #[error("failed to write message: {0}")]
    Write(#[source] io::Error),
}

impl ForwardError {
    /// Whether this failure came from the transport rather than the payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Write(_))
    }
}
