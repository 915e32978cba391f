//! Kernel generic netlink socket.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tracing::debug;

use super::error::Result;
use super::transport::Transport;

/// Receive buffer size; large enough for one full dump datagram.
const RECV_BUFFER_SIZE: usize = 32768;

/// Non-blocking `NETLINK_GENERIC` socket.
///
/// Readiness is either polled with [`Transport::wait_readable`] or, inside
/// [`EventLoop`](super::EventLoop), through tokio's reactor.
pub struct NetlinkSocket {
    socket: Socket,
    /// Local port ID (assigned by kernel).
    pid: u32,
}

impl NetlinkSocket {
    /// Open and bind a generic netlink socket.
    pub fn new() -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_GENERIC)?;
        socket.set_non_blocking(true)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        if let Err(e) = socket.set_ext_ack(true) {
            debug!(error = %e, "extended ack not supported");
        }

        Ok(Self { socket, pid })
    }
}

impl Transport for NetlinkSocket {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.socket.send(bytes, 0)?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(RECV_BUFFER_SIZE);
        self.socket.recv(&mut buf, 0)?;
        Ok(buf.to_vec())
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        let mut pollfd = libc::pollfd {
            fd: self.socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        // SAFETY: pollfd is a valid, initialized pollfd and the count is 1.
        let ret = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err.into());
        }
        Ok(ret > 0 && pollfd.revents & libc::POLLIN != 0)
    }

    fn subscribe(&mut self, group: u32) -> Result<()> {
        self.socket.add_membership(group)?;
        Ok(())
    }

    fn port_id(&self) -> u32 {
        self.pid
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.socket.as_raw_fd())
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
