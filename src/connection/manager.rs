//! Two-state connection manager.

use std::{
    io,
    net::{Shutdown, TcpStream},
};

use log::{debug, warn};

use crate::{
    emitter::{Emitter, ForwardMessage, write_frame},
    error::ForwardError,
};

use super::{
    config::ConnectionConfig,
    transport::{connect, peer_connected},
};

/// Byte sink over the collector socket.
///
/// Frames are fully encoded before they reach the sink, so writes go
/// straight to the socket without a userspace buffer.
pub type Sink = TcpStream;

/// Whether the manager currently holds a socket it believes is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

struct Connection {
    sink: Sink,
}

impl Connection {
    fn is_alive(&self) -> bool {
        match peer_connected(&self.sink) {
            Ok(alive) => alive,
            Err(err) => {
                debug!("ConnectionManager liveness probe failed: {err}");
                false
            }
        }
    }
}

/// Owns the collector connection and writes Forward messages through it.
pub struct ConnectionManager {
    config: ConnectionConfig,
    emitter: Emitter,
    connection: Option<Connection>,
    cleanup_failures: u64,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state. No socket is opened
    /// until the first call that needs one.
    pub fn new(config: ConnectionConfig, emitter: Emitter) -> Self {
        Self {
            config,
            emitter,
            connection: None,
            cleanup_failures: 0,
        }
    }

    /// Configuration the manager connects with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// `Connected` while a socket is held, even if the peer has since left.
    pub fn state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Number of teardown failures swallowed so far.
    pub fn cleanup_failures(&self) -> u64 {
        self.cleanup_failures
    }

    /// Return a sink backed by a live connection, reconnecting if needed.
    ///
    /// A connection that fails the liveness probe is released before a new
    /// one is opened in the same call. The returned borrow must not outlive
    /// the call site, since the next call may replace the connection.
    ///
    /// # Errors
    ///
    /// [`ForwardError::Connect`] when resolving, configuring, or connecting
    /// the socket fails. The manager is left `Disconnected`.
    pub fn ensure_connected(&mut self) -> Result<&mut Sink, ForwardError> {
        let connection = match self.connection.take() {
            Some(conn) if conn.is_alive() => conn,
            Some(conn) => {
                debug!(
                    "ConnectionManager peer {}:{} went away; reconnecting",
                    self.config.host, self.config.port
                );
                self.release(conn);
                self.open()?
            }
            None => self.open()?,
        };
        Ok(&mut self.connection.insert(connection).sink)
    }

    /// Encode `message`, make sure a connection is live, and write it.
    ///
    /// Encoding happens first, so a payload that cannot be encoded neither
    /// opens a connection nor writes any bytes. A failed write or flush
    /// drops the connection; the next call reconnects.
    pub fn emit(&mut self, message: &ForwardMessage) -> Result<(), ForwardError> {
        let frame = self.emitter.encode(message)?;
        let sink = self.ensure_connected()?;
        if let Err(err) = write_frame(sink, &frame) {
            warn!(
                "ConnectionManager write to {}:{} failed: {err}",
                self.config.host, self.config.port
            );
            self.close();
            return Err(err);
        }
        Ok(())
    }

    /// Release the connection if one is held. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            self.release(conn);
        }
    }

    fn open(&self) -> Result<Connection, ForwardError> {
        let stream = connect(&self.config).map_err(|source| {
            warn!(
                "ConnectionManager failed to connect to {}:{}: {source}",
                self.config.host, self.config.port
            );
            ForwardError::Connect {
                host: self.config.host.clone(),
                port: self.config.port,
                source,
            }
        })?;
        debug!(
            "ConnectionManager connected to {}:{}",
            self.config.host, self.config.port
        );
        Ok(Connection { sink: stream })
    }

    fn release(&mut self, conn: Connection) {
        let result = conn.sink.shutdown(Shutdown::Both);
        self.note_cleanup(result);
    }

    /// Count and log a failed teardown. A socket the peer already
    /// disconnected is not a failure.
    pub(super) fn note_cleanup(&mut self, result: io::Result<()>) {
        if let Err(err) = result
            && err.kind() != io::ErrorKind::NotConnected
        {
            self.cleanup_failures += 1;
            warn!("ConnectionManager failed to close socket: {err}");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state())
            .finish()
    }
}
