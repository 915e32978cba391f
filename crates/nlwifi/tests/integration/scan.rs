//! Scan sessions against a fake kernel.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use nlwifi::netlink::genl::nl80211::{self, Nl80211Attr, Nl80211Cmd, Nl80211Group};
use nlwifi::netlink::{MessageContext, NetlinkMessage, NetlinkPacket};
use nlwifi::testing::sequence_number;
use nlwifi::wifi::{ScanSession, ScanSessionConfig};

use crate::common::{Harness, NL80211_ID, SCAN_GROUP, message_type, scan_results_event};

const IFINDEX: u32 = 4;

fn decode_request(bytes: &[u8]) -> NetlinkMessage {
    let mut packet = NetlinkPacket::new(bytes).unwrap();
    nl80211::create_message(&mut packet, &MessageContext::default()).unwrap()
}

fn requested_frequencies(bytes: &[u8]) -> Vec<u32> {
    let message = decode_request(bytes);
    let attributes = message.as_generic().unwrap().attributes();
    attributes
        .nested(Nl80211Attr::SCAN_FREQUENCIES)
        .unwrap()
        .iter()
        .map(|a| a.u32_value().unwrap())
        .collect()
}

#[test]
fn test_scan_until_pool_exhausted() {
    let mut harness = Harness::with_nl80211();
    harness
        .manager
        .subscribe_to_events(nl80211::FAMILY_NAME, Nl80211Group::SCAN)
        .unwrap();
    assert_eq!(harness.transport.subscribed_groups(), vec![SCAN_GROUP]);

    // Acknowledge every trigger, then announce results on the scan group.
    harness.transport.set_responder(|request| {
        if message_type(request) != NL80211_ID {
            return Vec::new();
        }
        let seq = sequence_number(request).unwrap_or_default();
        vec![
            NetlinkMessage::error_ack(seq, 0).encode(seq, 0).unwrap(),
            scan_results_event(IFINDEX).encode(0, 0).unwrap(),
        ]
    });

    let failures = Rc::new(Cell::new(0));
    let counter = failures.clone();
    let counts: HashMap<u16, u64> = [(2412, 20), (5180, 10), (2437, 5), (5745, 1)].into();
    let available = [2412, 2437, 2462, 5180, 5200, 5745];
    let config = ScanSessionConfig::default()
        .with_min_frequencies(2)
        .with_max_frequencies(3);
    let session = ScanSession::new(
        NL80211_ID,
        IFINDEX,
        &counts,
        &available,
        config,
        move || counter.set(counter.get() + 1),
    );

    // Each results event starts the next batch until nothing is left.
    let results = Rc::new(RefCell::new(0));
    {
        let session = session.clone();
        let results = results.clone();
        harness.manager.add_broadcast_handler(move |manager, message| {
            let Some(event) = message.as_generic() else {
                return;
            };
            if event.command() != Nl80211Cmd::NEW_SCAN_RESULTS {
                return;
            }
            *results.borrow_mut() += 1;
            if session.has_more_frequencies() {
                session.initiate_scan(manager).unwrap();
            }
        });
    }

    session.initiate_scan(&mut harness.manager).unwrap();
    harness.manager.receive_available().unwrap();

    let batches: Vec<Vec<u32>> = harness
        .transport
        .sent()
        .iter()
        .map(|bytes| requested_frequencies(bytes))
        .collect();
    assert_eq!(
        batches,
        vec![vec![2412, 5180], vec![2437, 5745], vec![2462, 5200]]
    );
    assert_eq!(*results.borrow(), 3);

    let report = session.report();
    assert_eq!(report.batches, 3);
    assert_eq!(report.frequencies_scanned, 6);
    assert_eq!(report.frequencies_remaining, 0);
    assert!(!report.found_error);
    assert_eq!(failures.get(), 0);
}

#[test]
fn test_trigger_carries_ssids() {
    let mut harness = Harness::with_nl80211();
    let session = ScanSession::new(
        NL80211_ID,
        IFINDEX,
        &HashMap::new(),
        &[2412],
        ScanSessionConfig::default(),
        || {},
    );
    session.add_ssid("office");
    session.add_ssid(b"cafe".to_vec());
    session.initiate_scan(&mut harness.manager).unwrap();

    let sent = harness.transport.last_sent().unwrap();
    let message = decode_request(&sent);
    let generic = message.as_generic().unwrap();
    assert_eq!(generic.command(), Nl80211Cmd::TRIGGER_SCAN);

    let attributes = generic.attributes();
    assert_eq!(attributes.get_u32(Nl80211Attr::IFINDEX).unwrap(), IFINDEX);
    let ssids = attributes.nested(Nl80211Attr::SCAN_SSIDS).unwrap();
    let ssids: Vec<&[u8]> = ssids.iter().map(|a| a.raw_value().unwrap()).collect();
    assert_eq!(ssids, [&b"office"[..], b"cafe", b""]);
}
