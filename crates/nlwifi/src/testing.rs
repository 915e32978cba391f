//! In-memory transport for driving a [`Manager`](crate::netlink::Manager)
//! without a kernel.
//!
//! Enabled by the `testing` feature.
//!
//! ```ignore
//! use nlwifi::netlink::{Manager, ManualClock};
//! use nlwifi::testing::MockTransport;
//!
//! let clock = ManualClock::new();
//! let transport = MockTransport::with_clock(clock.clone());
//! let mut manager = Manager::new(transport.clone()).with_clock(clock.clone());
//!
//! transport.set_responder(|request| vec![reply_for(request)]);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

use crate::netlink::clock::ManualClock;
use crate::netlink::message::NetlinkMessage;
use crate::netlink::{Error, Result, Transport};

/// Produces the datagrams the "kernel" answers a sent datagram with.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>>>;

#[derive(Default)]
struct MockState {
    sent: Vec<Vec<u8>>,
    inbox: VecDeque<Vec<u8>>,
    groups: Vec<u32>,
    fail_next_sends: usize,
    port_id: u32,
    responder: Option<Responder>,
    clock: Option<ManualClock>,
}

/// A transport that records what is sent and replays queued datagrams.
///
/// Clones share state: hand one to the manager and keep one to inspect.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MockTransport")
            .field("sent", &state.sent.len())
            .field("inbox", &state.inbox.len())
            .field("groups", &state.groups)
            .field("fail_next_sends", &state.fail_next_sends)
            .field("responder", &state.responder.is_some())
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `wait_readable` advances `clock` when it would
    /// otherwise block, so bounded waits finish instantly.
    pub fn with_clock(clock: ManualClock) -> Self {
        let transport = Self::default();
        transport.state.borrow_mut().clock = Some(clock);
        transport
    }

    pub fn set_port_id(&self, port_id: u32) {
        self.state.borrow_mut().port_id = port_id;
    }

    /// Queue a raw datagram for the next `recv`.
    pub fn queue(&self, datagram: impl Into<Vec<u8>>) {
        self.state.borrow_mut().inbox.push_back(datagram.into());
    }

    /// Queue `message` encoded with `seq` as a datagram of its own.
    pub fn queue_message(&self, message: &NetlinkMessage, seq: u32) -> Result<()> {
        self.queue(message.encode(seq, 0)?);
        Ok(())
    }

    /// Number of datagrams waiting to be received.
    pub fn pending(&self) -> usize {
        self.state.borrow().inbox.len()
    }

    /// Pop the next queued datagram without going through `recv`.
    pub fn pop_queued(&self) -> Option<Vec<u8>> {
        self.state.borrow_mut().inbox.pop_front()
    }

    /// Every datagram sent so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.borrow().sent.clone()
    }

    /// Drain the record of sent datagrams.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.borrow_mut().sent)
    }

    pub fn last_sent(&self) -> Option<Vec<u8>> {
        self.state.borrow().sent.last().cloned()
    }

    /// Make the next `count` sends fail with EIO.
    pub fn fail_next_sends(&self, count: usize) {
        self.state.borrow_mut().fail_next_sends = count;
    }

    /// Answer every successful send with the datagrams `responder` returns.
    pub fn set_responder(&self, responder: impl FnMut(&[u8]) -> Vec<Vec<u8>> + 'static) {
        self.state.borrow_mut().responder = Some(Box::new(responder));
    }

    pub fn clear_responder(&self) {
        self.state.borrow_mut().responder = None;
    }

    pub fn subscribed_groups(&self) -> Vec<u32> {
        self.state.borrow().groups.clone()
    }
}

/// Sequence number in the header of `datagram`.
pub fn sequence_number(datagram: &[u8]) -> Option<u32> {
    let bytes = datagram.get(8..12)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

impl Transport for MockTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut responder = {
            let mut state = self.state.borrow_mut();
            if state.fail_next_sends > 0 {
                state.fail_next_sends -= 1;
                return Err(Error::Io(io::Error::from_raw_os_error(libc::EIO)));
            }
            state.sent.push(bytes.to_vec());
            state.responder.take()
        };

        // The responder runs unborrowed so it may call back into the mock.
        if let Some(respond) = responder.as_mut() {
            let replies = respond(bytes);
            let mut state = self.state.borrow_mut();
            state.inbox.extend(replies);
            if state.responder.is_none() {
                state.responder = responder;
            }
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        self.state
            .borrow_mut()
            .inbox
            .pop_front()
            .ok_or_else(|| Error::Io(io::ErrorKind::WouldBlock.into()))
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
        let state = self.state.borrow();
        if !state.inbox.is_empty() {
            return Ok(true);
        }
        if let Some(clock) = &state.clock {
            clock.advance(timeout);
        }
        Ok(false)
    }

    fn subscribe(&mut self, group: u32) -> Result<()> {
        self.state.borrow_mut().groups.push(group);
        Ok(())
    }

    fn port_id(&self) -> u32 {
        self.state.borrow().port_id
    }

    fn raw_fd(&self) -> Option<RawFd> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::clock::Clock;

    #[test]
    fn test_failing_sends_are_not_recorded() {
        let mut transport = MockTransport::new();
        transport.fail_next_sends(1);
        assert!(transport.send(b"one").is_err());
        transport.send(b"two").unwrap();
        assert_eq!(transport.sent(), vec![b"two".to_vec()]);
    }

    #[test]
    fn test_responder_fills_inbox() {
        let mut transport = MockTransport::new();
        transport.set_responder(|request| vec![request.to_vec(), request.to_vec()]);
        transport.send(b"ping").unwrap();
        assert_eq!(transport.pending(), 2);
        assert_eq!(transport.recv().unwrap(), b"ping");
    }

    #[test]
    fn test_empty_recv_would_block() {
        let mut transport = MockTransport::new();
        assert!(transport.recv().unwrap_err().is_would_block());
    }

    #[test]
    fn test_wait_advances_clock() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut transport = MockTransport::with_clock(clock.clone());
        assert!(!transport.wait_readable(Duration::from_millis(250)).unwrap());
        assert_eq!(clock.now() - start, Duration::from_millis(250));

        transport.queue(vec![0u8; 16]);
        assert!(transport.wait_readable(Duration::from_secs(1)).unwrap());
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn test_sequence_number() {
        let bytes = NetlinkMessage::done(77).encode(77, 0).unwrap();
        assert_eq!(sequence_number(&bytes), Some(77));
        assert_eq!(sequence_number(&[0; 4]), None);
    }

    #[test]
    fn test_queued_message_received_whole() {
        let mut transport = MockTransport::new();
        transport.queue_message(&NetlinkMessage::done(12), 12).unwrap();
        let datagram = transport.recv().unwrap();
        assert_eq!(sequence_number(&datagram), Some(12));
        assert_eq!(datagram, NetlinkMessage::done(12).encode(12, 0).unwrap());
    }
}
