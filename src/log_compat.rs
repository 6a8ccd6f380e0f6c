//! Compatibility bridge for the Rust `log` crate.
//!
//! `FluentdLogAdapter` implements `log::Log` on top of a [`FluentdTarget`].
//! The target itself is single-threaded, so the adapter serialises calls
//! through a mutex. Records emitted by this crate's own diagnostics are
//! ignored; forwarding them would re-enter the target while it is locked.

use std::borrow::Cow;

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

use crate::{
    log_event::{LogEvent, StackFrame},
    rate_limited_warner::RateLimitedWarner,
    target::FluentdTarget,
};

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

fn is_own_diagnostic(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

/// Adapter implementing the Rust `log::Log` trait.
pub struct FluentdLogAdapter {
    target: Mutex<FluentdTarget>,
    filter: LevelFilter,
    warner: RateLimitedWarner,
}

impl FluentdLogAdapter {
    pub fn new(target: FluentdTarget, filter: LevelFilter) -> Self {
        Self {
            target: Mutex::new(target),
            filter,
            warner: RateLimitedWarner::default(),
        }
    }

    fn event_from(record: &Record<'_>) -> LogEvent {
        let event = LogEvent::new(
            &normalise_target(record.target()),
            record.level().into(),
            &record.args().to_string(),
        );
        match record.line() {
            Some(line) => event.with_stack_trace(vec![StackFrame::new(
                record.file(),
                line,
                0,
                record.module_path().unwrap_or_default(),
            )]),
            None => event,
        }
    }

    /// Close the underlying connection. Later records reconnect.
    pub fn close(&self) {
        self.target.lock().close();
    }
}

impl log::Log for FluentdLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.filter && !is_own_diagnostic(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let event = Self::event_from(record);
        let result = self.target.lock().write(&event);
        if let Err(err) = result {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                eprintln!("fluentd_forward: dropped {count} log records: {err}");
            });
        }
    }

    fn flush(&self) {
        self.warner.flush(|count| {
            eprintln!("fluentd_forward: dropped {count} log records");
        });
    }
}

/// Install `target` as the global `log` logger at `filter`.
pub fn init(target: FluentdTarget, filter: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(FluentdLogAdapter::new(target, filter)))?;
    log::set_max_level(filter);
    Ok(())
}
