//! TCP connection lifecycle for the Fluentd collector.
//!
//! [`ConnectionManager`] owns the collector socket. Connections are opened
//! lazily on the first `emit`, probed for liveness before every write, and
//! re-established in the same call when the peer has gone away. Writes happen on the caller's thread; there is no worker,
//! queue, or retry loop.
//!
//! The manager is `Send` but takes `&mut self` for every operation. Callers
//! that share one manager between threads must serialise access themselves.

mod config;
mod manager;
mod transport;

#[cfg(test)]
mod tests;

pub use config::{
    ConnectionConfig, DEFAULT_BUFFER_SIZE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_LINGER,
    DEFAULT_PORT, DEFAULT_RECEIVE_TIMEOUT, DEFAULT_SEND_TIMEOUT, SocketOptions,
};
pub use manager::{ConnectionManager, ConnectionState, Sink};
