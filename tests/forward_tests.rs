//! End-to-end tests against an in-process collector.

use std::{
    thread,
    time::{Duration, UNIX_EPOCH},
};

use fluentd_forward::{
    ConnectionConfig, ConnectionManager, ConnectionState, DynamicValue, Emitter, EventTime,
    FluentdTarget, ForwardError, ForwardMessage, Level, LogEvent, StackFrame, Timestamp,
    TimestampFormat,
};
use rmpv::Value;
use rstest::{fixture, rstest};

mod test_utils;
use test_utils::{Collector, field, slots};

#[fixture]
fn collector() -> Collector {
    Collector::spawn(None)
}

fn target_for(collector: &Collector, format: TimestampFormat) -> FluentdTarget {
    FluentdTarget::builder()
        .with_tcp(collector.host(), collector.port())
        .with_tag("demo")
        .with_timestamp_format(format)
        .with_emit_stack_trace(true)
        .build()
        .expect("build target")
}

#[rstest]
fn plain_timestamp_scenario(collector: Collector) {
    let mut target = target_for(&collector, TimestampFormat::Integer);
    assert_eq!(target.tag(), "demo");
    assert_eq!(target.config().connection.port, collector.port());
    assert_eq!(target.config().timestamp_format, TimestampFormat::Integer);
    target
        .emit(
            Timestamp::Integer(1_700_000_000),
            vec![("message".into(), "hi".into())],
        )
        .expect("emit record");

    let (_, message) = collector.recv();
    assert_eq!(
        message,
        Value::Array(vec![
            Value::from("demo"),
            Value::from(1_700_000_000u64),
            Value::Map(vec![(Value::from("message"), Value::from("hi"))]),
        ])
    );
}

#[rstest]
fn event_time_scenario(collector: Collector) {
    let mut target = target_for(&collector, TimestampFormat::EventTime);
    let time = UNIX_EPOCH + Duration::new(1_700_000_000, 500_000_000);
    target
        .emit_at(time, vec![("message".into(), "hi".into())])
        .expect("emit record");

    let (_, message) = collector.recv();
    let (tag, timestamp, _) = slots(&message);
    assert_eq!(tag, "demo");
    let expected = EventTime::new(1_700_000_000, 500_000_000).to_payload().to_vec();
    assert_eq!(timestamp, &Value::Ext(0, expected));
    let Value::Ext(_, payload) = timestamp else {
        unreachable!();
    };
    assert_eq!(payload[..4], [0x65, 0x53, 0xf1, 0x00]);
    assert_eq!(payload[4..], [0x1d, 0xcd, 0x65, 0x00]);
}

#[rstest]
fn messages_arrive_in_call_order(collector: Collector) {
    let mut manager = ConnectionManager::new(
        ConnectionConfig::new(collector.host(), collector.port()),
        Emitter::default(),
    );
    for tag in ["a", "b", "c"] {
        manager
            .emit(&ForwardMessage::new(tag, Timestamp::Integer(1), Vec::new()))
            .expect("emit message");
    }

    let tags: Vec<String> = (0..3)
        .map(|_| {
            let (connection, message) = collector.recv();
            assert_eq!(connection, 0, "all messages share one connection");
            slots(&message).0.to_owned()
        })
        .collect();
    assert_eq!(tags, ["a", "b", "c"]);
}

#[rstest]
fn log_events_carry_nested_stack_frames(collector: Collector) {
    let mut target = target_for(&collector, TimestampFormat::Integer);
    let event = LogEvent::new("demo", Level::Error, "boom")
        .with_stack_trace(vec![StackFrame::new(Some("main.rs"), 10, 3, "main")])
        .with_property("request", DynamicValue::mapping([("id", 7u32)]));
    target.write(&event).expect("write event");

    let (_, message) = collector.recv();
    let (_, _, record) = slots(&message);
    assert_eq!(field(record, "level"), Some(&Value::from("Error")));
    assert_eq!(field(record, "message"), Some(&Value::from("boom")));
    assert_eq!(field(record, "logger_name"), Some(&Value::from("demo")));
    assert_eq!(
        field(record, "sequence_id"),
        Some(&Value::from(event.sequence_id))
    );
    let frames = field(record, "stacktrace")
        .and_then(Value::as_array)
        .expect("stacktrace array");
    assert_eq!(frames.len(), 1);
    let frame = frames[0].as_map().expect("frame map");
    assert_eq!(field(frame, "line"), Some(&Value::from(10u32)));
    assert_eq!(field(frame, "filename"), Some(&Value::from("main.rs")));
    let request = field(record, "request")
        .and_then(Value::as_map)
        .expect("request map");
    assert_eq!(field(request, "id"), Some(&Value::from(7u32)));
}

#[rstest]
fn target_reconnects_after_collector_drops_connection() {
    let collector = Collector::spawn(Some(1));
    let mut target = target_for(&collector, TimestampFormat::Integer);

    target
        .emit(Timestamp::Integer(1), vec![("n".into(), 1u32.into())])
        .expect("emit first");
    let (first_conn, _) = collector.recv();

    thread::sleep(Duration::from_millis(100));
    target
        .emit(Timestamp::Integer(2), vec![("n".into(), 2u32.into())])
        .expect("emit second");
    let (second_conn, message) = collector.recv();

    assert_ne!(first_conn, second_conn);
    let (_, _, record) = slots(&message);
    assert_eq!(field(record, "n"), Some(&Value::from(2u32)));
    assert_eq!(target.state(), ConnectionState::Connected);
}

#[rstest]
fn close_twice_then_write_again(collector: Collector) {
    let mut target = target_for(&collector, TimestampFormat::Integer);
    target
        .write(&LogEvent::new("demo", Level::Info, "one"))
        .expect("write first");
    collector.recv();

    target.close();
    target.close();
    assert_eq!(target.state(), ConnectionState::Disconnected);

    target
        .write(&LogEvent::new("demo", Level::Info, "two"))
        .expect("write after close");
    let (connection, _) = collector.recv();
    assert_eq!(connection, 1);
}

#[rstest]
fn unreachable_collector_fails_loudly() {
    let port = {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        listener.local_addr().expect("address").port()
    };
    let mut target = FluentdTarget::builder()
        .with_tcp("127.0.0.1", port)
        .with_tag("demo")
        .build()
        .expect("build target");

    for _ in 0..2 {
        let err = target
            .write(&LogEvent::new("demo", Level::Info, "lost"))
            .expect_err("collector is unreachable");
        assert!(matches!(err, ForwardError::Connect { .. }), "{err:?}");
        assert_eq!(target.state(), ConnectionState::Disconnected);
    }
}
