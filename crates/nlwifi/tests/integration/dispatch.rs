//! Replies, acks, errors and broadcast fan-out.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use nlwifi::netlink::genl::nl80211::{Nl80211Attr, Nl80211Cmd, Nl80211Message};
use nlwifi::netlink::genl::{ControlMessage, Family};
use nlwifi::netlink::message::NLM_F_MULTI;
use nlwifi::netlink::{
    AckDisposition, AuxiliaryMessageType, MessagePayload, NetlinkMessage, ResponseHandler,
};

use crate::common::{Event, Harness, NL80211_ID, Recorder, scan_results_event, wiphy_part};

#[test]
fn test_single_reply() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();

    let seq = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), recorder.handler())
        .unwrap();
    assert_eq!(harness.last_seq(), seq);

    let reply = Nl80211Message::new(NL80211_ID, Nl80211Cmd::GET_REG);
    harness.deliver(&reply, seq).unwrap();
    assert_eq!(recorder.events(), vec![Event::Message(Nl80211Cmd::GET_REG)]);
    assert!(!harness.manager.has_response_handler(seq));

    // A second reply with the same sequence number is a broadcast now.
    harness.deliver(&reply, seq).unwrap();
    assert_eq!(recorder.events().len(), 1);
}

#[test]
fn test_multipart_exchange() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();

    let seq = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), recorder.handler())
        .unwrap();

    harness.deliver(&wiphy_part(0, "phy0"), seq).unwrap();
    harness.deliver(&wiphy_part(1, "phy1"), seq).unwrap();
    assert!(harness.manager.has_response_handler(seq));
    harness.deliver_done(seq);

    assert_eq!(
        recorder.events(),
        vec![
            Event::Message(Nl80211Cmd::NEW_WIPHY),
            Event::Message(Nl80211Cmd::NEW_WIPHY),
            Event::Error(AuxiliaryMessageType::Done, None),
        ]
    );
    assert!(!harness.manager.has_response_handler(seq));
}

#[test]
fn test_several_parts_in_one_datagram() {
    let mut harness = Harness::with_nl80211();
    let names = Rc::new(RefCell::new(Vec::new()));
    let seen = names.clone();
    let handler = ResponseHandler::new().on_message(move |_, message| {
        let name = message
            .as_generic()
            .and_then(|g| g.attributes().get_string(Nl80211Attr::WIPHY_NAME).ok())
            .unwrap_or_default()
            .to_string();
        seen.borrow_mut().push(name);
    });
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), handler)
        .unwrap();

    let mut datagram = wiphy_part(0, "phy0").encode(seq, 0).unwrap();
    datagram.extend(wiphy_part(1, "phy1").encode(seq, 0).unwrap());
    datagram.extend(NetlinkMessage::done(seq).encode(seq, 0).unwrap());
    harness.transport.queue(datagram);
    harness.manager.receive_available().unwrap();

    assert_eq!(*names.borrow(), ["phy0", "phy1"]);
    assert!(!harness.manager.has_response_handler(seq));
}

#[test]
fn test_ack_and_error() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();

    let acked = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), recorder.handler())
        .unwrap();
    let rejected = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), recorder.handler())
        .unwrap();

    harness.deliver_error(acked, 0);
    harness.deliver_error(rejected, libc::EPERM);

    assert_eq!(
        recorder.events(),
        vec![
            Event::Ack,
            Event::Error(AuxiliaryMessageType::ErrorFromKernel, Some(libc::EPERM)),
        ]
    );
    assert!(!harness.manager.has_response_handler(acked));
    assert!(!harness.manager.has_response_handler(rejected));
}

#[test]
fn test_ack_can_keep_handler() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(
            Nl80211Message::get_reg(NL80211_ID),
            recorder.handler_with_ack(AckDisposition::Keep),
        )
        .unwrap();

    harness.deliver_error(seq, 0);
    assert!(harness.manager.has_response_handler(seq));
    harness.deliver(&Nl80211Message::new(NL80211_ID, Nl80211Cmd::GET_REG), seq)
        .unwrap();
    assert_eq!(
        recorder.events(),
        vec![Event::Ack, Event::Message(Nl80211Cmd::GET_REG)]
    );
}

#[test]
fn test_unexpected_response_type() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(
            Nl80211Message::get_reg(NL80211_ID),
            recorder.handler().expect_family(Family::Nl80211),
        )
        .unwrap();

    let wrong = ControlMessage::new_family("other", 40, &[]).unwrap();
    harness.deliver(&wrong, seq).unwrap();
    assert_eq!(
        recorder.events(),
        vec![Event::Error(AuxiliaryMessageType::UnexpectedResponseType, None)]
    );
}

#[test]
fn test_timed_out_handlers_reported_on_next_send() {
    let mut harness = Harness::with_nl80211();
    let stale = Recorder::new();
    let fresh = Recorder::new();

    let first = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), stale.handler())
        .unwrap();
    harness.clock.advance(Duration::from_secs(4));
    let second = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), fresh.handler())
        .unwrap();
    assert!(stale.events().is_empty());

    harness.clock.advance(Duration::from_secs(1));
    harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), ResponseHandler::new())
        .unwrap();

    assert_eq!(
        stale.events(),
        vec![Event::Error(AuxiliaryMessageType::TimeoutWaitingForResponse, None)]
    );
    assert!(fresh.events().is_empty());
    assert!(!harness.manager.has_response_handler(first));
    assert!(harness.manager.has_response_handler(second));
}

#[test]
fn test_remove_response_handler() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), recorder.handler())
        .unwrap();

    assert!(harness.manager.remove_response_handler(seq));
    assert!(!harness.manager.remove_response_handler(seq));
    harness.deliver_error(seq, libc::EINVAL);
    assert!(recorder.events().is_empty());
}

#[test]
fn test_handler_cancels_itself_while_multipart() {
    let mut harness = Harness::with_nl80211();
    let parts = Rc::new(RefCell::new(0));
    let count = parts.clone();
    let handler = ResponseHandler::new().on_message(move |manager, message| {
        *count.borrow_mut() += 1;
        manager.remove_response_handler(message.sequence_number());
    });
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), handler)
        .unwrap();

    harness.deliver(&wiphy_part(0, "phy0"), seq).unwrap();
    harness.deliver(&wiphy_part(1, "phy1"), seq).unwrap();
    assert_eq!(*parts.borrow(), 1);
    assert!(!harness.manager.has_response_handler(seq));
}

#[test]
fn test_handler_sends_follow_up() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let follow_up = recorder.clone();
    let handler = ResponseHandler::new().on_message(move |manager, _| {
        manager
            .send_message(Nl80211Message::get_reg(NL80211_ID), follow_up.handler())
            .unwrap();
    });
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), handler)
        .unwrap();

    harness
        .deliver(&Nl80211Message::new(NL80211_ID, Nl80211Cmd::GET_REG), seq)
        .unwrap();
    let second = harness.last_seq();
    assert_ne!(second, seq);
    harness.deliver_error(second, 0);
    assert_eq!(recorder.events(), vec![Event::Ack]);
}

#[test]
fn test_broadcast_fan_out() {
    let mut harness = Harness::with_nl80211();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let first = {
        let seen = seen.clone();
        harness.manager.add_broadcast_handler(move |_, message| {
            let command = message.as_generic().map(|g| g.command());
            seen.borrow_mut().push(("first", command));
        })
    };
    let second = {
        let seen = seen.clone();
        harness.manager.add_broadcast_handler(move |_, message| {
            let command = message.as_generic().map(|g| g.command());
            seen.borrow_mut().push(("second", command));
        })
    };
    assert_ne!(first, second);

    harness.deliver(&scan_results_event(3), 0).unwrap();
    let command = Some(Nl80211Cmd::NEW_SCAN_RESULTS);
    assert_eq!(*seen.borrow(), [("first", command), ("second", command)]);

    assert!(harness.manager.remove_broadcast_handler(second));
    assert!(!harness.manager.has_broadcast_handler(second));
    harness.deliver(&scan_results_event(3), 0).unwrap();
    assert_eq!(seen.borrow().len(), 3);

    harness.manager.clear_broadcast_handlers();
    assert!(!harness.manager.has_broadcast_handler(first));
    harness.deliver(&scan_results_event(3), 0).unwrap();
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn test_broadcast_of_unknown_type() {
    let mut harness = Harness::with_nl80211();
    let payloads = Rc::new(RefCell::new(Vec::new()));
    let seen = payloads.clone();
    harness.manager.add_broadcast_handler(move |_, message| {
        if let MessagePayload::Unknown(bytes) = message.payload() {
            seen.borrow_mut().push((message.message_type(), bytes.clone()));
        }
    });

    let unknown = NetlinkMessage::new(0x99, MessagePayload::Unknown(vec![1, 2, 3, 4]));
    harness.deliver(&unknown, 0).unwrap();
    assert_eq!(*payloads.borrow(), [(0x99, vec![1, 2, 3, 4])]);
}

#[test]
fn test_invalid_trailing_packet() {
    let mut harness = Harness::with_nl80211();
    let events = Rc::new(RefCell::new(0));
    let count = events.clone();
    harness
        .manager
        .add_broadcast_handler(move |_, _| *count.borrow_mut() += 1);

    let mut datagram = scan_results_event(3).encode(0, 0).unwrap();
    // A header claiming more bytes than follow.
    let mut bogus = vec![0u8; 16];
    bogus[0..4].copy_from_slice(&200u32.to_ne_bytes());
    datagram.extend(bogus);
    datagram.extend(scan_results_event(4).encode(0, 0).unwrap());

    harness.transport.queue(datagram);
    assert_eq!(harness.manager.receive_available().unwrap(), 1);
    assert_eq!(*events.borrow(), 1);
}

#[test]
fn test_undecodable_message_is_skipped() {
    let mut harness = Harness::with_nl80211();
    let events = Rc::new(RefCell::new(Vec::new()));
    let seen = events.clone();
    harness.manager.add_broadcast_handler(move |_, message| {
        seen.borrow_mut().push(message.message_type());
    });

    // nl80211 message whose IFINDEX carries two bytes instead of four.
    let mut payload = vec![Nl80211Cmd::NEW_SCAN_RESULTS, 1, 0, 0];
    payload.extend(6u16.to_ne_bytes());
    payload.extend(Nl80211Attr::IFINDEX.to_ne_bytes());
    payload.extend([3, 0, 0, 0]);
    let broken = NetlinkMessage::new(NL80211_ID, MessagePayload::Unknown(payload));
    let mut datagram = broken.encode(0, 0).unwrap();
    datagram.extend(scan_results_event(3).encode(0, 0).unwrap());

    harness.transport.queue(datagram);
    harness.manager.receive_available().unwrap();
    assert_eq!(*events.borrow(), [NL80211_ID]);
}

#[test]
fn test_multi_flag_without_parts_is_kept_until_done() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), recorder.handler())
        .unwrap();

    let mut part = Nl80211Message::new(NL80211_ID, Nl80211Cmd::GET_REG);
    part.add_flag(NLM_F_MULTI);
    harness.deliver(&part, seq).unwrap();

    // Refreshed deadline: still registered after the original timeout.
    harness.clock.advance(Duration::from_secs(3));
    harness.deliver(&part, seq).unwrap();
    harness.clock.advance(Duration::from_secs(3));
    harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), ResponseHandler::new())
        .unwrap();
    assert!(harness.manager.has_response_handler(seq));

    harness.deliver_done(seq);
    assert_eq!(recorder.events().len(), 3);
}
