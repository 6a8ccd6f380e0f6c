//! In-process stand-in for a Fluentd `in_forward` listener.
//!
//! The collector accepts connections one after another on an ephemeral port
//! and decodes every MessagePack value it receives, reporting each one
//! together with the index of the connection it arrived on.

use std::{
    net::{SocketAddr, TcpListener},
    sync::mpsc,
    thread,
    time::Duration,
};

use rmpv::Value;

pub struct Collector {
    addr: SocketAddr,
    messages: mpsc::Receiver<(usize, Value)>,
}

impl Collector {
    /// Start a collector. With `Some(n)`, each connection is closed by the
    /// collector after `n` messages.
    pub fn spawn(messages_per_connection: Option<usize>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        let (tx, messages) = mpsc::channel();
        thread::spawn(move || {
            for (index, stream) in listener.incoming().enumerate() {
                let Ok(mut stream) = stream else {
                    continue;
                };
                let mut received = 0;
                while messages_per_connection.is_none_or(|limit| received < limit) {
                    let Ok(value) = rmpv::decode::read_value(&mut stream) else {
                        break;
                    };
                    if tx.send((index, value)).is_err() {
                        return;
                    }
                    received += 1;
                }
            }
        });
        Self { addr, messages }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the next message and the connection index it arrived on.
    pub fn recv(&self) -> (usize, Value) {
        self.messages
            .recv_timeout(Duration::from_secs(2))
            .expect("collector received a message")
    }
}

/// Split a decoded Forward message into its three slots.
#[allow(dead_code)]
pub fn slots(message: &Value) -> (&str, &Value, &Vec<(Value, Value)>) {
    let items = message.as_array().expect("message is an array");
    assert_eq!(items.len(), 3, "forward message has three slots");
    (
        items[0].as_str().expect("tag is a string"),
        &items[1],
        items[2].as_map().expect("record is a map"),
    )
}

/// Look up `key` in a decoded record.
#[allow(dead_code)]
pub fn field<'a>(record: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    record
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}
