//! Builder for [`FluentdTarget`](super::FluentdTarget).
//!
//! Every option is optional; unset options fall back to the defaults in
//! [`TargetConfig`] and [`ConnectionConfig`](crate::connection::ConnectionConfig).
//! The builder also deserialises from JSON so deployments can keep target
//! settings next to the rest of their configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{encoder::BinaryEncoding, event_time::TimestampFormat};

use super::{FluentdTarget, config::TargetConfig};

/// Errors that may occur while building a target.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid target configuration: {0}")]
    InvalidConfig(String),
    /// The JSON document could not be parsed into builder options.
    #[error("failed to parse target configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

/// Integer socket options are C `int`s; larger values would truncate.
macro_rules! ensure_socket_int {
    ($value:expr, $field:expr) => {{
        if i32::try_from($value).is_err() {
            Err(BuildError::InvalidConfig(format!(
                "{} must not exceed {}",
                $field,
                i32::MAX
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`FluentdTarget`] instances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FluentdTargetBuilder {
    host: Option<String>,
    port: Option<u16>,
    tag: Option<String>,
    no_delay: Option<bool>,
    send_buffer_size: Option<usize>,
    receive_buffer_size: Option<usize>,
    connect_timeout_ms: Option<u64>,
    send_timeout_ms: Option<u64>,
    receive_timeout_ms: Option<u64>,
    linger_enabled: Option<bool>,
    linger_secs: Option<u64>,
    timestamp_format: Option<TimestampFormat>,
    binary_encoding: Option<BinaryEncoding>,
    emit_stack_trace: Option<bool>,
}

impl FluentdTargetBuilder {
    /// Create a builder with every option unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse builder options from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Point the target at `host:port`.
    pub fn with_tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self
    }

    /// Tag every record is forwarded under.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Linger on close for `secs` seconds, or disable lingering. `secs` must
    /// not exceed `i32::MAX`.
    pub fn with_linger(mut self, enabled: bool, secs: u64) -> Self {
        self.linger_enabled = Some(enabled);
        self.linger_secs = Some(secs);
        self
    }

    option_setter!(
        #[doc = "Disable Nagle's algorithm on the socket."]
        with_no_delay,
        no_delay,
        bool
    );
    option_setter!(
        #[doc = "Kernel send buffer size in bytes, at most `i32::MAX`."]
        with_send_buffer_size,
        send_buffer_size,
        usize
    );
    option_setter!(
        #[doc = "Kernel receive buffer size in bytes, at most `i32::MAX`."]
        with_receive_buffer_size,
        receive_buffer_size,
        usize
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_send_timeout_ms, send_timeout_ms, u64);
    option_setter!(with_receive_timeout_ms, receive_timeout_ms, u64);
    option_setter!(
        #[doc = "Select plain-integer or `EventTime` timestamps."]
        with_timestamp_format,
        timestamp_format,
        TimestampFormat
    );
    option_setter!(with_binary_encoding, binary_encoding, BinaryEncoding);
    option_setter!(with_emit_stack_trace, emit_stack_trace, bool);

    fn validate(&self) -> Result<(), BuildError> {
        self.validate_endpoint()?;
        self.validate_buffers()?;
        self.validate_timeouts()?;
        if let Some(secs) = self.linger_secs {
            ensure_socket_int!(secs, "linger_secs")?;
        }
        Ok(())
    }

    fn validate_endpoint(&self) -> Result<(), BuildError> {
        if let Some(host) = &self.host
            && host.trim().is_empty()
        {
            return Err(BuildError::InvalidConfig("host must not be empty".into()));
        }
        if let Some(port) = self.port {
            ensure_positive!(port, "port")?;
        }
        if let Some(tag) = &self.tag
            && tag.trim().is_empty()
        {
            return Err(BuildError::InvalidConfig("tag must not be empty".into()));
        }
        Ok(())
    }

    fn validate_buffers(&self) -> Result<(), BuildError> {
        if let Some(size) = self.send_buffer_size {
            ensure_positive!(size, "send_buffer_size")?;
            ensure_socket_int!(size, "send_buffer_size")?;
        }
        if let Some(size) = self.receive_buffer_size {
            ensure_positive!(size, "receive_buffer_size")?;
            ensure_socket_int!(size, "receive_buffer_size")?;
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), BuildError> {
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.send_timeout_ms {
            ensure_positive!(timeout, "send_timeout_ms")?;
        }
        if let Some(timeout) = self.receive_timeout_ms {
            ensure_positive!(timeout, "receive_timeout_ms")?;
        }
        Ok(())
    }

    /// Validate the options and resolve them against the defaults.
    pub fn build_config(&self) -> Result<TargetConfig, BuildError> {
        self.validate()?;
        let mut config = TargetConfig::default();
        self.apply_connection_fields(&mut config);
        if let Some(tag) = &self.tag {
            config.tag = tag.clone();
        }
        if let Some(format) = self.timestamp_format {
            config.timestamp_format = format;
        }
        if let Some(binary) = self.binary_encoding {
            config.binary_encoding = binary;
        }
        if let Some(emit) = self.emit_stack_trace {
            config.emit_stack_trace = emit;
        }
        Ok(config)
    }

    fn apply_connection_fields(&self, config: &mut TargetConfig) {
        let connection = &mut config.connection;
        if let Some(host) = &self.host {
            connection.host = host.clone();
        }
        if let Some(port) = self.port {
            connection.port = port;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            connection.connect_timeout = Some(Duration::from_millis(timeout));
        }
        let socket = &mut connection.socket;
        if let Some(no_delay) = self.no_delay {
            socket.no_delay = no_delay;
        }
        if let Some(size) = self.send_buffer_size {
            socket.send_buffer_size = size;
        }
        if let Some(size) = self.receive_buffer_size {
            socket.receive_buffer_size = size;
        }
        if let Some(timeout) = self.send_timeout_ms {
            socket.send_timeout = Some(Duration::from_millis(timeout));
        }
        if let Some(timeout) = self.receive_timeout_ms {
            socket.receive_timeout = Some(Duration::from_millis(timeout));
        }
        match (self.linger_enabled, self.linger_secs) {
            (Some(false), _) => socket.linger = None,
            (_, Some(secs)) => socket.linger = Some(Duration::from_secs(secs)),
            _ => {}
        }
    }

    /// Build the target. No connection is opened until the first write.
    pub fn build(&self) -> Result<FluentdTarget, BuildError> {
        Ok(FluentdTarget::with_config(self.build_config()?))
    }
}
