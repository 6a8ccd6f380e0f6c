//! Fluentd Forward Protocol client.
//!
//! Log records are encoded as MessagePack `[tag, time, record]` arrays and
//! written to a Fluentd-compatible collector over TCP, one flushed write per
//! event. The crate is layered leaves first:
//!
//! - [`value`]: the dynamic value tree carried in records;
//! - [`encoder`] and [`event_time`]: MessagePack and `EventTime` encoding;
//! - [`emitter`]: Forward message framing;
//! - [`connection`]: the lazily (re)connecting TCP transport;
//! - [`log_event`] and [`target`]: the host-facing target;
//! - `log_compat`: a `log::Log` bridge (feature `log-compat`).
//!
//! ```no_run
//! use fluentd_forward::{FluentdTarget, Level, LogEvent, TimestampFormat};
//!
//! let mut target = FluentdTarget::builder()
//!     .with_tcp("127.0.0.1", 24224)
//!     .with_tag("demo")
//!     .with_timestamp_format(TimestampFormat::EventTime)
//!     .build()?;
//! target.write(&LogEvent::new("demo", Level::Info, "Test Message"))?;
//! target.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod connection;
pub mod emitter;
pub mod encoder;
pub mod error;
pub mod event_time;
pub mod level;
pub mod log_event;
pub mod rate_limited_warner;
pub mod target;
pub mod value;

#[cfg(feature = "log-compat")]
pub mod log_compat;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, SocketOptions};
pub use emitter::{Emitter, ForwardMessage, emit};
pub use encoder::{BinaryEncoding, EncodeOptions, EncodingError, encode, encode_to_vec};
pub use error::ForwardError;
pub use event_time::{EventTime, Timestamp, TimestampFormat, encode_event_time};
pub use level::Level;
pub use log_event::{LogEvent, StackFrame};
pub use target::{BuildError, FluentdTarget, FluentdTargetBuilder, TargetConfig};
pub use value::{DynamicValue, Mapping};

#[cfg(feature = "log-compat")]
pub use log_compat::FluentdLogAdapter;
