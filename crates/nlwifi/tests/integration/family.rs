//! Family resolution and multicast subscription.

use std::time::Duration;

use nlwifi::Error;
use nlwifi::netlink::genl::nl80211::{self, Nl80211Group};
use nlwifi::netlink::genl::{ControlMessage, GENL_ID_CTRL};
use nlwifi::netlink::{Clock, ManagerConfig, NetlinkPacket};

use crate::common::{Harness, MLME_GROUP, NL80211_ID, SCAN_GROUP, message_type};

#[test]
fn test_get_family_round_trip() {
    let mut harness = Harness::new();
    harness.answer_family_requests();

    let id = harness
        .manager
        .get_family(nl80211::FAMILY_NAME, Some(nl80211::create_message))
        .unwrap();
    assert_eq!(id, NL80211_ID);

    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(message_type(&sent[0]), GENL_ID_CTRL);
    let expected = ControlMessage::get_family(nl80211::FAMILY_NAME)
        .unwrap()
        .encode(1, 0).unwrap();
    assert_eq!(sent[0], expected);

    assert_eq!(harness.manager.family_id(nl80211::FAMILY_NAME), Some(NL80211_ID));
    assert_eq!(
        harness
            .manager
            .multicast_group_id(nl80211::FAMILY_NAME, Nl80211Group::SCAN)
            .unwrap(),
        SCAN_GROUP
    );
    let info = harness.manager.family_info(nl80211::FAMILY_NAME).unwrap();
    assert_eq!(info.name, "nl80211");
    assert_eq!(info.mcast_groups.len(), 2);
    assert!(harness.manager.factory().has_factory_method(NL80211_ID));
}

#[test]
fn test_get_family_is_cached() {
    let mut harness = Harness::with_nl80211();
    let id = harness
        .manager
        .get_family(nl80211::FAMILY_NAME, None)
        .unwrap();
    assert_eq!(id, NL80211_ID);
    assert!(harness.transport.sent().is_empty());
}

#[test]
fn test_get_family_times_out() {
    let mut harness =
        Harness::with_config(ManagerConfig::default().with_family_wait(Duration::from_millis(250)));
    let start = harness.clock.now();

    let err = harness
        .manager
        .get_family("nosuchfamily", None)
        .unwrap_err();
    assert!(matches!(err, Error::FamilyNotFound { ref name } if name == "nosuchfamily"));
    assert!(harness.clock.now() - start >= Duration::from_millis(250));
    assert_eq!(harness.manager.family_id("nosuchfamily"), None);
}

#[test]
fn test_family_reply_for_other_name_keeps_waiting() {
    let mut harness = Harness::new();
    // Answer with nl80211 whatever was asked for.
    harness.answer_family_requests();
    assert!(harness.manager.get_family("other", None).is_err());
    assert_eq!(harness.manager.family_id("other"), None);
}

#[test]
fn test_subscribe_to_events() {
    let mut harness = Harness::with_nl80211();
    harness
        .manager
        .subscribe_to_events(nl80211::FAMILY_NAME, Nl80211Group::SCAN)
        .unwrap();
    harness
        .manager
        .subscribe_to_events(nl80211::FAMILY_NAME, Nl80211Group::MLME)
        .unwrap();
    assert_eq!(harness.transport.subscribed_groups(), vec![SCAN_GROUP, MLME_GROUP]);
}

#[test]
fn test_subscribe_unknown_group_or_family() {
    let mut harness = Harness::with_nl80211();
    let err = harness
        .manager
        .subscribe_to_events(nl80211::FAMILY_NAME, Nl80211Group::VENDOR)
        .unwrap_err();
    assert!(matches!(err, Error::GroupNotFound { .. }));

    let err = harness
        .manager
        .subscribe_to_events("nosuchfamily", "events")
        .unwrap_err();
    assert!(matches!(err, Error::FamilyNotFound { .. }));
    assert!(harness.transport.subscribed_groups().is_empty());
}

#[test]
fn test_reset_forgets_families() {
    let mut harness = Harness::with_nl80211();
    harness.manager.reset();
    assert_eq!(harness.manager.family_id(nl80211::FAMILY_NAME), None);
    assert!(!harness.manager.factory().has_factory_method(NL80211_ID));

    // Resolving again asks the kernel again.
    harness
        .manager
        .get_family(nl80211::FAMILY_NAME, Some(nl80211::create_message))
        .unwrap();
    let sent = harness.transport.take_sent();
    assert_eq!(sent.len(), 1);
    let packet = NetlinkPacket::new(&sent[0]).unwrap();
    assert_eq!(packet.message_type(), GENL_ID_CTRL);
}
