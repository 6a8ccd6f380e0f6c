//! Host-facing Fluentd target.
//!
//! `FluentdTarget` is what a logging framework holds on to. Its lifecycle
//! hooks map straight onto the connection manager: `write`/`emit` call
//! `ensure_connected` and write one message, `close` (and `Drop`) release the
//! socket. Nothing is queued; a failing write is returned to the caller.

mod builder;
mod config;

use std::time::SystemTime;

use crate::{
    connection::{ConnectionManager, ConnectionState},
    emitter::{Emitter, ForwardMessage},
    encoder::EncodeOptions,
    error::ForwardError,
    event_time::Timestamp,
    log_event::LogEvent,
    value::Mapping,
};

pub use builder::{BuildError, FluentdTargetBuilder};
pub use config::{FALLBACK_TAG, TargetConfig, default_tag};

/// Forwards log events to one Fluentd collector under one tag.
#[derive(Debug)]
pub struct FluentdTarget {
    manager: ConnectionManager,
    config: TargetConfig,
}

impl FluentdTarget {
    /// Construct a target from resolved configuration.
    pub fn with_config(config: TargetConfig) -> Self {
        let emitter =
            Emitter::new(EncodeOptions::default().with_binary(config.binary_encoding));
        Self {
            manager: ConnectionManager::new(config.connection.clone(), emitter),
            config,
        }
    }

    /// Start configuring a target.
    pub fn builder() -> FluentdTargetBuilder {
        FluentdTargetBuilder::new()
    }

    /// Tag records are forwarded under.
    pub fn tag(&self) -> &str {
        &self.config.tag
    }

    /// Resolved configuration the target was built with.
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Connection state of the underlying manager.
    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Project `event` into a record and forward it.
    pub fn write(&mut self, event: &LogEvent) -> Result<(), ForwardError> {
        let record = event.to_record(self.config.emit_stack_trace);
        let timestamp = Timestamp::from_system_time(event.timestamp, self.config.timestamp_format);
        self.emit(timestamp, record)
    }

    /// Forward an already built record with an explicit timestamp.
    pub fn emit(&mut self, timestamp: Timestamp, record: Mapping) -> Result<(), ForwardError> {
        let message = ForwardMessage::new(self.config.tag.clone(), timestamp, record);
        self.manager.emit(&message)
    }

    /// Forward `record` stamped with `time` in the configured format.
    pub fn emit_at(&mut self, time: SystemTime, record: Mapping) -> Result<(), ForwardError> {
        let timestamp = Timestamp::from_system_time(time, self.config.timestamp_format);
        self.emit(timestamp, record)
    }

    /// Release the connection. The next write reconnects.
    pub fn close(&mut self) {
        self.manager.close();
    }
}
