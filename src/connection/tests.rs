//! Tests for the connection manager lifecycle.

use std::{
    io,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::mpsc,
    thread,
    time::Duration,
};

use logtest::Logger;
use rstest::{fixture, rstest};

use crate::{
    emitter::{Emitter, ForwardMessage},
    error::ForwardError,
    event_time::Timestamp,
    value::DynamicValue,
};

use super::{ConnectionConfig, ConnectionManager, ConnectionState, SocketOptions};

#[fixture]
fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

fn manager_for(addr: SocketAddr) -> ConnectionManager {
    ConnectionManager::new(
        ConnectionConfig::new(addr.ip().to_string(), addr.port()),
        Emitter::default(),
    )
}

fn message(tag: &str) -> ForwardMessage {
    ForwardMessage::new(
        tag,
        Timestamp::Integer(1_700_000_000),
        vec![("message".into(), "hi".into())],
    )
}

fn read_tag(stream: &mut TcpStream) -> String {
    let value = rmpv::decode::read_value(stream).expect("decode message");
    value.as_array().expect("array")[0]
        .as_str()
        .expect("tag string")
        .to_owned()
}

fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    listener.local_addr().expect("listener has address")
}

#[rstest]
fn connects_lazily(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    let mut manager = manager_for(addr);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    manager.ensure_connected().expect("connect");
    assert_eq!(manager.state(), ConnectionState::Connected);
    tcp_listener.accept().expect("accept connection");
}

#[rstest]
fn close_is_idempotent(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    let mut manager = manager_for(addr);
    manager.ensure_connected().expect("connect");

    manager.close();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    manager.close();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.cleanup_failures(), 0);
}

#[rstest]
fn close_without_connection_is_a_no_op() {
    let mut manager = manager_for(unused_addr());
    manager.close();
    manager.close();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[rstest]
fn refused_connection_reports_connect_error() {
    let addr = unused_addr();
    let mut manager = manager_for(addr);
    let err = manager.emit(&message("a")).expect_err("nothing listens");
    assert!(
        matches!(&err, ForwardError::Connect { port, .. } if *port == addr.port()),
        "unexpected error: {err:?}"
    );
    assert!(err.is_transport());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[rstest]
fn applies_socket_options(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    let options = SocketOptions {
        no_delay: true,
        // Whole seconds survive the kernel's rounding to clock ticks.
        send_timeout: Some(Duration::from_secs(2)),
        receive_timeout: Some(Duration::from_secs(1)),
        linger: Some(Duration::from_secs(2)),
        ..SocketOptions::default()
    };
    let mut manager = ConnectionManager::new(
        ConnectionConfig::new(addr.ip().to_string(), addr.port()).with_socket_options(options),
        Emitter::default(),
    );
    let stream = manager.ensure_connected().expect("connect");
    assert!(stream.nodelay().expect("read nodelay"));
    assert_eq!(
        stream.write_timeout().expect("read write timeout"),
        Some(Duration::from_secs(2))
    );
    assert_eq!(
        stream.read_timeout().expect("read read timeout"),
        Some(Duration::from_secs(1))
    );
    assert_eq!(
        socket2::SockRef::from(&*stream).linger().expect("read linger"),
        Some(Duration::from_secs(2))
    );
}

#[rstest]
fn reconnects_after_peer_drop(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    let (tags_tx, tags_rx) = mpsc::channel();
    thread::spawn(move || {
        for _ in 0..2 {
            let (mut stream, _) = tcp_listener.accept().expect("accept connection");
            tags_tx.send(read_tag(&mut stream)).expect("send tag");
            drop(stream);
        }
    });

    let mut manager = manager_for(addr);
    manager.emit(&message("first")).expect("emit first");
    let first = tags_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("first message received");
    assert_eq!(first, "first");

    // Let the FIN from the dropped server stream arrive.
    thread::sleep(Duration::from_millis(100));
    manager.emit(&message("second")).expect("emit second");
    let second = tags_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("second message received on a new connection");
    assert_eq!(second, "second");
}

#[rstest]
fn reconnect_failure_leaves_manager_disconnected(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    let mut manager = manager_for(addr);
    manager.ensure_connected().expect("connect");
    let (stream, _) = tcp_listener.accept().expect("accept connection");
    drop(stream);
    drop(tcp_listener);
    thread::sleep(Duration::from_millis(100));

    let err = manager.emit(&message("lost")).expect_err("listener is gone");
    assert!(matches!(err, ForwardError::Connect { .. }), "unexpected error: {err:?}");
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[rstest]
fn emit_after_close_opens_a_new_connection(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    let mut manager = manager_for(addr);
    manager.ensure_connected().expect("connect");
    let (_first, _) = tcp_listener.accept().expect("accept first");
    manager.close();

    manager.emit(&message("again")).expect("emit after close");
    let (mut second, _) = tcp_listener.accept().expect("accept second");
    assert_eq!(read_tag(&mut second), "again");
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[rstest]
fn write_failure_drops_the_connection(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    let options = SocketOptions {
        send_buffer_size: 4096,
        send_timeout: Some(Duration::from_millis(200)),
        ..SocketOptions::default()
    };
    let mut manager = ConnectionManager::new(
        ConnectionConfig::new(addr.ip().to_string(), addr.port()).with_socket_options(options),
        Emitter::default(),
    );
    manager.ensure_connected().expect("connect");
    // Accepted but never read, so the kernel buffers fill and the send times out.
    let (_stalled, _) = tcp_listener.accept().expect("accept connection");

    let record = vec![("blob".into(), DynamicValue::Binary(vec![0; 64 << 20]))];
    let err = manager
        .emit(&ForwardMessage::new("big", Timestamp::Integer(1), record))
        .expect_err("peer never reads");
    assert!(matches!(err, ForwardError::Write(_)), "unexpected error: {err:?}");
    assert!(err.is_transport());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

// The only test in this binary that installs the global test logger.
#[rstest]
fn cleanup_failures_are_counted_and_logged() {
    let mut logger = Logger::start();
    let mut manager = manager_for(unused_addr());

    manager.note_cleanup(Ok(()));
    manager.note_cleanup(Err(io::Error::from(io::ErrorKind::NotConnected)));
    assert_eq!(manager.cleanup_failures(), 0);

    manager.note_cleanup(Err(io::Error::other("shutdown refused")));
    assert_eq!(manager.cleanup_failures(), 1);

    let warning = std::iter::from_fn(|| logger.pop())
        .find(|record| record.args().contains("shutdown refused"))
        .expect("cleanup failure logged");
    assert_eq!(warning.level(), log::Level::Warn);
    assert!(warning.args().contains("failed to close socket"));
}
