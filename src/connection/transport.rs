//! Socket creation, option application, and liveness probing.

use std::{
    io,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use super::config::{ConnectionConfig, SocketOptions};

fn socket_addrs(config: &ConnectionConfig) -> io::Result<Vec<SocketAddr>> {
    (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map(|iter| iter.collect())
}

fn apply_options(socket: &Socket, options: &SocketOptions) -> io::Result<()> {
    socket.set_nodelay(options.no_delay)?;
    socket.set_send_buffer_size(options.send_buffer_size)?;
    socket.set_recv_buffer_size(options.receive_buffer_size)?;
    socket.set_write_timeout(options.send_timeout)?;
    socket.set_read_timeout(options.receive_timeout)?;
    socket.set_linger(options.linger)?;
    Ok(())
}

fn connect_addr(addr: &SocketAddr, config: &ConnectionConfig) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
    apply_options(&socket, &config.socket)?;
    let target = SockAddr::from(*addr);
    match config.connect_timeout {
        Some(timeout) => socket.connect_timeout(&target, timeout)?,
        None => socket.connect(&target)?,
    }
    Ok(socket.into())
}

/// Open a configured TCP stream to the first reachable resolved address.
pub(super) fn connect(config: &ConnectionConfig) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in socket_addrs(config)? {
        match connect_addr(&addr, config) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}:{} did not resolve to any address", config.host, config.port),
        )
    }))
}

/// Report whether the peer still holds its end of `stream` open.
///
/// TCP only notices a vanished peer on read or write, so this peeks without
/// blocking: end-of-stream means the peer closed, `WouldBlock` means the
/// connection is idle but open.
pub(super) fn peer_connected(stream: &TcpStream) -> io::Result<bool> {
    if let Some(err) = stream.take_error()? {
        return Err(err);
    }
    stream.set_nonblocking(true)?;
    let mut probe = [0u8; 1];
    let peeked = stream.peek(&mut probe);
    stream.set_nonblocking(false)?;
    match peeked {
        Ok(0) => Ok(false),
        Ok(_) => Ok(true),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(true)
        }
        Err(err) => Err(err),
    }
}
