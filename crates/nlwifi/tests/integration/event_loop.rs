//! The tokio driver over a real socket pair.

use std::cell::RefCell;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::rc::Rc;
use std::time::Duration;

use nlwifi::netlink::genl::nl80211::{Nl80211Cmd, Nl80211Message};
use nlwifi::netlink::{EventLoop, Manager, NetlinkMessage, Transport};
use nlwifi::testing::{MockTransport, sequence_number};
use nlwifi::{Error, Result};
use tokio::sync::oneshot;

use crate::common::{NL80211_ID, scan_results_event, wiphy_part};

/// One end of a datagram socket pair standing in for the kernel socket.
struct PairTransport {
    socket: UnixDatagram,
}

impl PairTransport {
    fn pair() -> (Self, UnixDatagram) {
        let (ours, theirs) = UnixDatagram::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        (Self { socket: ours }, theirs)
    }
}

impl Transport for PairTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.socket.send(bytes)?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; 32768];
        let n = self.socket.recv(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn wait_readable(&mut self, _timeout: Duration) -> Result<bool> {
        Err(Error::Io(io::ErrorKind::Unsupported.into()))
    }

    fn subscribe(&mut self, _group: u32) -> Result<()> {
        Ok(())
    }

    fn port_id(&self) -> u32 {
        0
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.socket.as_raw_fd())
    }
}

#[tokio::test]
async fn test_broadcast_through_event_loop() {
    let (transport, kernel) = PairTransport::pair();
    let mut manager = Manager::new(transport);

    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);
    manager.add_broadcast_handler(move |_, message| {
        let command = message.as_generic().map(|g| g.command());
        if let Some(tx) = tx.take() {
            let _ = tx.send(command);
        }
    });

    kernel.send(&scan_results_event(4).encode(0, 0).unwrap()).unwrap();

    let run = EventLoop::run_until(&mut manager, rx);
    let command = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("event loop stalled")
        .unwrap()
        .unwrap();
    // No factory is registered for the family id, so it arrives undecoded.
    assert_eq!(command, None);
}

#[tokio::test]
async fn test_request_and_reply_through_event_loop() {
    let (transport, kernel) = PairTransport::pair();
    let mut manager = Manager::new(transport);
    manager
        .factory_mut()
        .add_factory_method(NL80211_ID, nlwifi::netlink::genl::nl80211::create_message);

    let names = Rc::new(RefCell::new(Vec::new()));
    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);
    let seen = names.clone();
    let handler = nlwifi::netlink::ResponseHandler::new()
        .on_message(move |_, message| {
            let command = message.as_generic().map(|g| g.command());
            seen.borrow_mut().push(command);
        })
        .on_error(move |_, kind, _| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(kind);
            }
        });
    let seq = manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), handler)
        .unwrap();

    let mut request = vec![0u8; 4096];
    let n = kernel.recv(&mut request).unwrap();
    assert_eq!(sequence_number(&request[..n]), Some(seq));

    let mut reply = wiphy_part(0, "phy0").encode(seq, 0).unwrap();
    reply.extend(NetlinkMessage::done(seq).encode(seq, 0).unwrap());
    kernel.send(&reply).unwrap();

    let kind = EventLoop::run_until(&mut manager, rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kind, nlwifi::netlink::AuxiliaryMessageType::Done);
    assert_eq!(*names.borrow(), [Some(Nl80211Cmd::NEW_WIPHY)]);
}

#[tokio::test]
async fn test_timers_fire_in_event_loop() {
    let (transport, _kernel) = PairTransport::pair();
    let mut manager = Manager::new(transport);

    let (tx, rx) = oneshot::channel();
    manager.post_delayed(Duration::from_millis(10), move |_| {
        let _ = tx.send(());
    });

    tokio::time::timeout(Duration::from_secs(5), EventLoop::run_until(&mut manager, rx))
        .await
        .expect("task never ran")
        .unwrap()
        .unwrap();
    assert_eq!(manager.next_deadline(), None);
}

#[tokio::test]
async fn test_event_loop_needs_descriptor() {
    let mut manager = Manager::new(MockTransport::new());
    let err = EventLoop::run_until(&mut manager, std::future::ready(()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
}
