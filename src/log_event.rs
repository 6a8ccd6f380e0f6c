//! Projection of log events into Fluentd records.
//!
//! A [`LogEvent`] carries what a host logger knows about one call: level,
//! rendered message, logger name, a process-wide sequence number, optional
//! stack frames, and free-form properties. [`LogEvent::to_record`] flattens it
//! into the [`Mapping`] that travels in the third slot of a Forward message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use log::debug;

use crate::level::Level;
use crate::value::{DynamicValue, Mapping};

static NEXT_SEQUENCE_ID: AtomicU64 = AtomicU64::new(1);

/// Record keys populated from the event itself. Properties cannot override them.
pub const RESERVED_KEYS: [&str; 5] = ["level", "message", "logger_name", "sequence_id", "stacktrace"];

/// One frame of a captured call stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Source file, when known.
    pub filename: Option<String>,
    pub line: u32,
    pub column: u32,
    /// Function or method name.
    pub method: String,
}

impl StackFrame {
    pub fn new(filename: Option<&str>, line: u32, column: u32, method: &str) -> Self {
        Self {
            filename: filename.map(str::to_owned),
            line,
            column,
            method: method.to_owned(),
        }
    }

    fn to_value(&self) -> DynamicValue {
        DynamicValue::Mapping(vec![
            ("filename".into(), self.filename.clone().into()),
            ("line".into(), self.line.into()),
            ("column".into(), self.column.into()),
            ("method".into(), self.method.as_str().into()),
        ])
    }
}

/// A single log call as seen by the forwarding target.
#[derive(Clone, Debug)]
pub struct LogEvent {
    pub logger_name: String,
    pub level: Level,
    pub message: String,
    /// Time the event was created.
    pub timestamp: SystemTime,
    /// Monotonically increasing within the process.
    pub sequence_id: u64,
    pub stack_trace: Option<Vec<StackFrame>>,
    /// Extra fields appended after the reserved keys.
    pub properties: Mapping,
}

impl LogEvent {
    /// Construct an event stamped with the current time and the next
    /// sequence id.
    pub fn new(logger_name: &str, level: Level, message: &str) -> Self {
        Self {
            logger_name: logger_name.to_owned(),
            level,
            message: message.to_owned(),
            timestamp: SystemTime::now(),
            sequence_id: NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed),
            stack_trace: None,
            properties: Vec::new(),
        }
    }

    pub fn with_stack_trace(mut self, frames: Vec<StackFrame>) -> Self {
        self.stack_trace = Some(frames);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Build the record mapping.
    ///
    /// `stacktrace` is only present when `include_stack_trace` is set and the
    /// event carries frames. Properties whose key collides with a reserved
    /// key are skipped.
    pub fn to_record(&self, include_stack_trace: bool) -> Mapping {
        let mut record: Mapping = vec![
            ("level".into(), self.level.as_str().into()),
            ("message".into(), self.message.as_str().into()),
            ("logger_name".into(), self.logger_name.as_str().into()),
            ("sequence_id".into(), self.sequence_id.into()),
        ];
        if include_stack_trace && let Some(frames) = &self.stack_trace {
            record.push((
                "stacktrace".into(),
                DynamicValue::Sequence(frames.iter().map(StackFrame::to_value).collect()),
            ));
        }
        for (key, value) in &self.properties {
            if RESERVED_KEYS.contains(&key.as_str()) {
                debug!("LogEvent property {key:?} shadows a reserved key; skipped");
                continue;
            }
            record.push((key.clone(), value.clone()));
        }
        record
    }
}
