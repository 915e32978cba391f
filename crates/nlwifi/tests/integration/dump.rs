//! Dump queue, EBUSY resends and dump timeouts.

use std::time::Duration;

use nlwifi::netlink::genl::nl80211::{Nl80211Cmd, Nl80211Message};
use nlwifi::netlink::{AuxiliaryMessageType, ManagerConfig};
use nlwifi::testing::sequence_number;

use crate::common::{Event, Harness, NL80211_ID, Recorder, wiphy_part};

fn sent_sequences(harness: &Harness) -> Vec<u32> {
    harness
        .transport
        .sent()
        .iter()
        .filter_map(|bytes| sequence_number(bytes))
        .collect()
}

#[test]
fn test_dump_completes_on_done() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();

    harness.deliver(&wiphy_part(0, "phy0"), seq).unwrap();
    harness.deliver_done(seq);
    assert_eq!(
        recorder.events(),
        vec![
            Event::Message(Nl80211Cmd::NEW_WIPHY),
            Event::Error(AuxiliaryMessageType::Done, None),
        ]
    );
    assert_eq!(harness.manager.next_deadline(), None);
}

#[test]
fn test_busy_dump_is_resent() {
    let config = ManagerConfig::default().with_max_dump_retries(2);
    let mut harness = Harness::with_nl80211_config(config);
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();
    let original = harness.transport.last_sent().unwrap();

    for _ in 0..2 {
        harness.deliver_error(seq, libc::EBUSY);
        assert!(recorder.events().is_empty());
        assert_eq!(harness.advance(Duration::from_millis(299)), 0);
        assert_eq!(harness.advance(Duration::from_millis(1)), 1);
    }

    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|bytes| *bytes == original));

    harness.deliver(&wiphy_part(0, "phy0"), seq).unwrap();
    harness.deliver(&wiphy_part(1, "phy1"), seq).unwrap();
    harness.deliver_done(seq);

    assert_eq!(
        recorder.events(),
        vec![
            Event::Message(Nl80211Cmd::NEW_WIPHY),
            Event::Message(Nl80211Cmd::NEW_WIPHY),
            Event::Error(AuxiliaryMessageType::Done, None),
        ]
    );
    // Completed once: nothing left to time out.
    assert_eq!(harness.advance(Duration::from_secs(10)), 0);
    assert_eq!(harness.transport.sent().len(), 3);
}

#[test]
fn test_busy_dump_out_of_retries() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();

    harness.deliver_error(seq, libc::EBUSY);
    harness.advance(Duration::from_millis(300));
    harness.deliver_error(seq, libc::EBUSY);

    assert_eq!(
        recorder.events(),
        vec![Event::Error(
            AuxiliaryMessageType::ErrorFromKernel,
            Some(libc::EBUSY)
        )]
    );
    assert_eq!(harness.transport.sent().len(), 2);
    assert_eq!(harness.manager.next_deadline(), None);
}

#[test]
fn test_failed_resend_reports_last_error() {
    let mut harness = Harness::with_nl80211();
    let first = Recorder::new();
    let second = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), first.handler())
        .unwrap();
    let queued = harness
        .manager
        .send_message(Nl80211Message::get_interfaces(NL80211_ID), second.handler())
        .unwrap();

    harness.deliver_error(seq, libc::EBUSY);
    harness.transport.fail_next_sends(1);
    harness.advance(Duration::from_millis(300));

    assert_eq!(
        first.events(),
        vec![Event::Error(
            AuxiliaryMessageType::ErrorFromKernel,
            Some(libc::EBUSY)
        )]
    );
    // The queue moved on.
    assert_eq!(sent_sequences(&harness), vec![seq, queued]);
    assert!(second.events().is_empty());
}

#[test]
fn test_dump_timeout() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();

    assert_eq!(harness.advance(Duration::from_millis(499)), 0);
    assert_eq!(harness.advance(Duration::from_millis(1)), 1);
    assert_eq!(
        recorder.events(),
        vec![Event::Error(
            AuxiliaryMessageType::TimeoutWaitingForResponse,
            None
        )]
    );
    assert_eq!(harness.manager.next_deadline(), None);
}

#[test]
fn test_parts_do_not_complete_dump() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();
    harness.deliver(&wiphy_part(0, "phy0"), seq).unwrap();

    // Still in flight: the timeout fires.
    harness.advance(Duration::from_millis(500));
    assert_eq!(
        recorder.events(),
        vec![
            Event::Message(Nl80211Cmd::NEW_WIPHY),
            Event::Error(AuxiliaryMessageType::TimeoutWaitingForResponse, None),
        ]
    );
}

#[test]
fn test_queued_dumps_sent_in_order() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();

    let wiphy = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();
    let interfaces = harness
        .manager
        .send_message(Nl80211Message::get_interfaces(NL80211_ID), recorder.handler())
        .unwrap();
    let scan = harness
        .manager
        .send_message(Nl80211Message::get_scan(NL80211_ID, 3).unwrap(), recorder.handler())
        .unwrap();
    assert_eq!(sent_sequences(&harness), vec![wiphy]);

    // A regular request is not held back by the dump queue.
    let reg = harness
        .manager
        .send_message(Nl80211Message::get_reg(NL80211_ID), recorder.handler())
        .unwrap();
    assert_eq!(sent_sequences(&harness), vec![wiphy, reg]);

    harness.deliver_done(wiphy);
    assert_eq!(sent_sequences(&harness), vec![wiphy, reg, interfaces]);

    harness.deliver_done(interfaces);
    assert_eq!(sent_sequences(&harness), vec![wiphy, reg, interfaces, scan]);

    harness.deliver_done(scan);
    assert_eq!(
        recorder.events(),
        vec![Event::Error(AuxiliaryMessageType::Done, None); 3]
    );
    assert_eq!(harness.manager.next_deadline(), None);
}

#[test]
fn test_timeout_sends_next_dump() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let first = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();
    let second = harness
        .manager
        .send_message(Nl80211Message::get_interfaces(NL80211_ID), recorder.handler())
        .unwrap();

    harness.advance(Duration::from_millis(500));
    assert_eq!(sent_sequences(&harness), vec![first, second]);
    assert!(harness.manager.has_response_handler(second));
    assert!(!harness.manager.has_response_handler(first));
}

#[test]
fn test_queued_dump_can_be_cancelled() {
    let mut harness = Harness::with_nl80211();
    let recorder = Recorder::new();
    let first = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();
    let second = harness
        .manager
        .send_message(Nl80211Message::get_interfaces(NL80211_ID), recorder.handler())
        .unwrap();

    assert!(harness.manager.remove_response_handler(second));
    harness.deliver_done(first);
    assert_eq!(sent_sequences(&harness), vec![first]);
    assert_eq!(harness.manager.next_deadline(), None);
}

#[test]
fn test_queued_dump_send_failure() {
    let mut harness = Harness::with_nl80211();
    let first = Recorder::new();
    let second = Recorder::new();
    let third = Recorder::new();
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), first.handler())
        .unwrap();
    harness
        .manager
        .send_message(Nl80211Message::get_interfaces(NL80211_ID), second.handler())
        .unwrap();
    let last = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), third.handler())
        .unwrap();

    harness.transport.fail_next_sends(1);
    harness.deliver_done(seq);

    assert_eq!(
        second.events(),
        vec![Event::Error(
            AuxiliaryMessageType::ErrorFromKernel,
            Some(libc::EIO)
        )]
    );
    assert_eq!(sent_sequences(&harness), vec![seq, last]);
    assert!(harness.manager.has_response_handler(last));
    assert!(third.events().is_empty());
}

#[test]
fn test_dump_send_failure_returns_error() {
    let mut harness = Harness::with_nl80211();
    harness.transport.fail_next_sends(1);
    let recorder = Recorder::new();
    assert!(
        harness
            .manager
            .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
            .is_err()
    );
    assert_eq!(harness.manager.next_deadline(), None);

    // The queue is empty, so the next dump goes out at once.
    let seq = harness
        .manager
        .send_message(Nl80211Message::get_wiphy(NL80211_ID), recorder.handler())
        .unwrap();
    assert_eq!(sent_sequences(&harness), vec![seq]);
}
