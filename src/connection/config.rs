//! Configuration consumed by the connection manager.
//!
//! `FluentdTargetBuilder` validates these values before they reach
//! [`ConnectionManager`](super::ConnectionManager).

use std::time::Duration;

/// Collector address used when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default Fluentd forward input port.
pub const DEFAULT_PORT: u16 = 24224;
/// Default kernel send/receive buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;
/// Default timeout applied while establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default socket send timeout.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);
/// Default socket receive timeout.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default linger duration when lingering on close is enabled.
pub const DEFAULT_LINGER: Duration = Duration::from_secs(1);

/// Options applied to every freshly created socket before it connects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketOptions {
    /// Disable Nagle's algorithm.
    pub no_delay: bool,
    /// Kernel `SO_SNDBUF` size in bytes.
    pub send_buffer_size: usize,
    /// Kernel `SO_RCVBUF` size in bytes.
    pub receive_buffer_size: usize,
    /// `None` blocks indefinitely.
    pub send_timeout: Option<Duration>,
    /// `None` blocks indefinitely.
    pub receive_timeout: Option<Duration>,
    /// Linger on close for the given duration; `None` disables lingering.
    pub linger: Option<Duration>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            no_delay: false,
            send_buffer_size: DEFAULT_BUFFER_SIZE,
            receive_buffer_size: DEFAULT_BUFFER_SIZE,
            send_timeout: Some(DEFAULT_SEND_TIMEOUT),
            receive_timeout: Some(DEFAULT_RECEIVE_TIMEOUT),
            linger: Some(DEFAULT_LINGER),
        }
    }
}

/// Where and how to connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// `None` defers to the operating system's connect timeout.
    pub connect_timeout: Option<Duration>,
    pub socket: SocketOptions,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            socket: SocketOptions::default(),
        }
    }
}

impl ConnectionConfig {
    /// Target `host:port` with default socket options.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Override the socket options.
    pub fn with_socket_options(mut self, socket: SocketOptions) -> Self {
        self.socket = socket;
        self
    }
}
