//! Datagram transport under the manager.

use std::os::unix::io::RawFd;
use std::time::Duration;

use super::error::Result;

/// A netlink datagram channel.
///
/// [`NetlinkSocket`](super::NetlinkSocket) is the kernel implementation;
/// tests use an in-memory one.
pub trait Transport {
    /// Send one datagram.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Receive one datagram.
    ///
    /// Fails with an [`io::ErrorKind::WouldBlock`](std::io::ErrorKind) I/O
    /// error when nothing is queued.
    fn recv(&mut self) -> Result<Vec<u8>>;

    /// Wait up to `timeout` for a datagram. Returns `false` on timeout.
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool>;

    /// Join a multicast group.
    fn subscribe(&mut self, group: u32) -> Result<()>;

    /// Local port id, written into every outgoing header.
    fn port_id(&self) -> u32;

    /// Descriptor to poll for readability, if the transport has one.
    fn raw_fd(&self) -> Option<RawFd>;
}
