//! Resolved configuration for [`FluentdTarget`](super::FluentdTarget).

use std::path::Path;

use crate::{
    connection::ConnectionConfig, encoder::BinaryEncoding, event_time::TimestampFormat,
};

/// Tag used when the running executable's name cannot be determined.
pub const FALLBACK_TAG: &str = "app";

/// Everything a target needs beyond the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    pub connection: ConnectionConfig,
    /// Fluentd tag attached to every message.
    pub tag: String,
    pub timestamp_format: TimestampFormat,
    pub binary_encoding: BinaryEncoding,
    /// Add a `stacktrace` field when an event carries frames.
    pub emit_stack_trace: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            tag: default_tag(),
            timestamp_format: TimestampFormat::default(),
            binary_encoding: BinaryEncoding::default(),
            emit_stack_trace: false,
        }
    }
}

/// File stem of the running executable, or [`FALLBACK_TAG`].
pub fn default_tag() -> String {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map_or_else(|| FALLBACK_TAG.to_owned(), str::to_owned)
}
