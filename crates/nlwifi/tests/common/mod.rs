//! Shared fixtures for the integration tests.
//!
//! [`Harness`] wires a [`Manager`] to a [`MockTransport`] and a
//! [`ManualClock`]; [`Recorder`] collects what a response handler sees.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use nlwifi::Result;
use nlwifi::netlink::genl::nl80211::{self, Nl80211Attr, Nl80211Cmd, Nl80211Message};
use nlwifi::netlink::genl::{ControlMessage, GENL_ID_CTRL};
use nlwifi::netlink::message::NLM_F_MULTI;
use nlwifi::netlink::{
    AckDisposition, AuxiliaryMessageType, Manager, ManagerConfig, ManualClock, NetlinkMessage,
    ResponseHandler,
};
use nlwifi::testing::{MockTransport, sequence_number};

/// Family id the fake kernel assigns to nl80211.
pub const NL80211_ID: u16 = 27;
/// Id of the `scan` multicast group.
pub const SCAN_GROUP: u32 = 4;
/// Id of the `mlme` multicast group.
pub const MLME_GROUP: u32 = 7;

/// Message type in the header of `datagram`.
pub fn message_type(datagram: &[u8]) -> u16 {
    u16::from_ne_bytes([datagram[4], datagram[5]])
}

/// Answer to a `CTRL_CMD_GETFAMILY` request for nl80211.
pub fn nl80211_family_reply(seq: u32) -> Vec<u8> {
    ControlMessage::new_family(
        nl80211::FAMILY_NAME,
        NL80211_ID,
        &[("scan", SCAN_GROUP), ("mlme", MLME_GROUP)],
    )
    .unwrap()
    .encode(seq, 0).unwrap()
}

/// One part of a wiphy dump.
pub fn wiphy_part(index: u32, name: &str) -> NetlinkMessage {
    let mut message = Nl80211Message::new(NL80211_ID, Nl80211Cmd::NEW_WIPHY);
    let attributes = message.as_generic_mut().unwrap().attributes_mut();
    attributes
        .add_u32(Nl80211Attr::WIPHY, "NL80211_ATTR_WIPHY", index)
        .unwrap();
    attributes
        .add_string(Nl80211Attr::WIPHY_NAME, "NL80211_ATTR_WIPHY_NAME", name)
        .unwrap();
    message.add_flag(NLM_F_MULTI);
    message
}

/// A scan-results event as the kernel multicasts it.
pub fn scan_results_event(ifindex: u32) -> NetlinkMessage {
    let mut message = Nl80211Message::new(NL80211_ID, Nl80211Cmd::NEW_SCAN_RESULTS);
    message
        .as_generic_mut()
        .unwrap()
        .attributes_mut()
        .add_u32(Nl80211Attr::IFINDEX, "NL80211_ATTR_IFINDEX", ifindex)
        .unwrap();
    message
}

/// Manager, transport and clock wired together.
pub struct Harness {
    pub manager: Manager,
    pub transport: MockTransport,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let clock = ManualClock::new();
        let transport = MockTransport::with_clock(clock.clone());
        let manager = Manager::new(transport.clone())
            .with_config(config)
            .with_clock(clock.clone());
        Self {
            manager,
            transport,
            clock,
        }
    }

    /// A harness whose fake kernel answers nl80211 family requests, with
    /// the family already resolved.
    pub fn with_nl80211() -> Self {
        Self::with_nl80211_config(ManagerConfig::default())
    }

    pub fn with_nl80211_config(config: ManagerConfig) -> Self {
        let mut harness = Self::with_config(config);
        harness.answer_family_requests();
        let id = harness
            .manager
            .get_family(nl80211::FAMILY_NAME, Some(nl80211::create_message))
            .unwrap();
        assert_eq!(id, NL80211_ID);
        harness.transport.take_sent();
        harness
    }

    /// Reply to every `GETFAMILY` request with the nl80211 description.
    pub fn answer_family_requests(&self) {
        self.transport.set_responder(|request| {
            if message_type(request) != GENL_ID_CTRL {
                return Vec::new();
            }
            let seq = sequence_number(request).unwrap_or_default();
            vec![nl80211_family_reply(seq)]
        });
    }

    /// Sequence number of the last datagram sent.
    pub fn last_seq(&self) -> u32 {
        self.transport
            .last_sent()
            .and_then(|bytes| sequence_number(&bytes))
            .expect("nothing sent")
    }

    /// Receive `message` as a reply to `seq`.
    pub fn deliver(&mut self, message: &NetlinkMessage, seq: u32) -> Result<usize> {
        self.transport.queue_message(message, seq)?;
        self.manager.receive_available()
    }

    pub fn deliver_error(&mut self, seq: u32, errno: i32) {
        self.deliver(&NetlinkMessage::error_ack(seq, errno), seq)
            .unwrap();
    }

    pub fn deliver_done(&mut self, seq: u32) {
        self.deliver(&NetlinkMessage::done(seq), seq).unwrap();
    }

    /// Move time forward and fire whatever is due.
    pub fn advance(&mut self, by: Duration) -> usize {
        self.clock.advance(by);
        self.manager.run_expired_timers()
    }
}

/// What a response handler was called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A reply, by command.
    Message(u8),
    Ack,
    /// An auxiliary outcome, with the errno when the kernel sent one.
    Error(AuxiliaryMessageType, Option<i32>),
}

/// Records the events of every handler it creates.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> ResponseHandler {
        self.handler_with_ack(AckDisposition::Remove)
    }

    pub fn handler_with_ack(&self, disposition: AckDisposition) -> ResponseHandler {
        let messages = self.events.clone();
        let acks = self.events.clone();
        let errors = self.events.clone();
        ResponseHandler::new()
            .on_message(move |_, message| {
                let command = message.as_generic().map(|g| g.command()).unwrap_or_default();
                messages.borrow_mut().push(Event::Message(command));
            })
            .on_ack(move |_| {
                acks.borrow_mut().push(Event::Ack);
                disposition
            })
            .on_error(move |_, kind, message| {
                let errno = message
                    .and_then(NetlinkMessage::as_error_ack)
                    .map(|e| e.error());
                errors.borrow_mut().push(Event::Error(kind, errno));
            })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
