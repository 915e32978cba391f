//! nl80211: the 802.11 configuration family.
//!
//! The family id is assigned by the kernel at runtime, so every constructor
//! here takes the id resolved through
//! [`Manager::get_family`](crate::netlink::Manager::get_family).
//!
//! # Example
//!
//! ```ignore
//! use nlwifi::netlink::genl::nl80211::{FAMILY_NAME, Nl80211Message, create_message};
//!
//! let family_id = manager.get_family(FAMILY_NAME, Some(create_message))?;
//! let request = Nl80211Message::get_scan(family_id, ifindex)?;
//! let handler = ResponseHandler::new()
//!     .expect_family(Family::Nl80211)
//!     .on_message(|_, bss| println!("{}", bss))
//!     .on_error(|_, kind, _| println!("scan dump ended: {}", kind));
//! manager.send_message(request, handler)?;
//! ```

use super::{Family, decode_generic};
use crate::netlink::error::Result;
use crate::netlink::message::{NLM_F_DUMP, NetlinkMessage};
use crate::netlink::packet::NetlinkPacket;
use crate::netlink::schema::MessageContext;

pub mod attrs;
mod ie;

pub use attrs::{Nl80211Attr, WowlanTrigger};
pub use ie::ElementId;

/// Kernel name of the family.
pub const FAMILY_NAME: &str = "nl80211";

/// Multicast groups the family registers.
pub struct Nl80211Group;

impl Nl80211Group {
    pub const CONFIG: &'static str = "config";
    pub const SCAN: &'static str = "scan";
    pub const REGULATORY: &'static str = "regulatory";
    pub const MLME: &'static str = "mlme";
    pub const VENDOR: &'static str = "vendor";
    pub const TESTMODE: &'static str = "testmode";
}

macro_rules! nl80211_commands {
    ($($name:ident = $value:literal,)*) => {
        /// nl80211 command ids.
        pub struct Nl80211Cmd;

        impl Nl80211Cmd {
            $(pub const $name: u8 = $value;)*
        }

        pub(crate) fn command_name(command: u8) -> Option<&'static str> {
            match command {
                $($value => Some(concat!("NL80211_CMD_", stringify!($name))),)*
                _ => None,
            }
        }
    };
}

nl80211_commands! {
    UNSPEC = 0,
    GET_WIPHY = 1,
    SET_WIPHY = 2,
    NEW_WIPHY = 3,
    DEL_WIPHY = 4,
    GET_INTERFACE = 5,
    SET_INTERFACE = 6,
    NEW_INTERFACE = 7,
    DEL_INTERFACE = 8,
    GET_KEY = 9,
    SET_KEY = 10,
    NEW_KEY = 11,
    DEL_KEY = 12,
    GET_BEACON = 13,
    SET_BEACON = 14,
    START_AP = 15,
    STOP_AP = 16,
    GET_STATION = 17,
    SET_STATION = 18,
    NEW_STATION = 19,
    DEL_STATION = 20,
    GET_MPATH = 21,
    SET_MPATH = 22,
    NEW_MPATH = 23,
    DEL_MPATH = 24,
    SET_BSS = 25,
    SET_REG = 26,
    REQ_SET_REG = 27,
    GET_MESH_CONFIG = 28,
    SET_MESH_CONFIG = 29,
    SET_MGMT_EXTRA_IE = 30,
    GET_REG = 31,
    GET_SCAN = 32,
    TRIGGER_SCAN = 33,
    NEW_SCAN_RESULTS = 34,
    SCAN_ABORTED = 35,
    REG_CHANGE = 36,
    AUTHENTICATE = 37,
    ASSOCIATE = 38,
    DEAUTHENTICATE = 39,
    DISASSOCIATE = 40,
    MICHAEL_MIC_FAILURE = 41,
    REG_BEACON_HINT = 42,
    JOIN_IBSS = 43,
    LEAVE_IBSS = 44,
    TESTMODE = 45,
    CONNECT = 46,
    ROAM = 47,
    DISCONNECT = 48,
    SET_WIPHY_NETNS = 49,
    GET_SURVEY = 50,
    NEW_SURVEY_RESULTS = 51,
    SET_PMKSA = 52,
    DEL_PMKSA = 53,
    FLUSH_PMKSA = 54,
    REMAIN_ON_CHANNEL = 55,
    CANCEL_REMAIN_ON_CHANNEL = 56,
    SET_TX_BITRATE_MASK = 57,
    REGISTER_FRAME = 58,
    FRAME = 59,
    FRAME_TX_STATUS = 60,
    SET_POWER_SAVE = 61,
    GET_POWER_SAVE = 62,
    SET_CQM = 63,
    NOTIFY_CQM = 64,
    SET_CHANNEL = 65,
    SET_WDS_PEER = 66,
    FRAME_WAIT_CANCEL = 67,
    JOIN_MESH = 68,
    LEAVE_MESH = 69,
    UNPROT_DEAUTHENTICATE = 70,
    UNPROT_DISASSOCIATE = 71,
    NEW_PEER_CANDIDATE = 72,
    GET_WOWLAN = 73,
    SET_WOWLAN = 74,
    START_SCHED_SCAN = 75,
    STOP_SCHED_SCAN = 76,
    SCHED_SCAN_RESULTS = 77,
    SCHED_SCAN_STOPPED = 78,
    SET_REKEY_OFFLOAD = 79,
    PMKSA_CANDIDATE = 80,
    TDLS_OPER = 81,
    TDLS_MGMT = 82,
    UNEXPECTED_FRAME = 83,
    PROBE_CLIENT = 84,
    REGISTER_BEACONS = 85,
    UNEXPECTED_4ADDR_FRAME = 86,
    SET_NOACK_MAP = 87,
    CH_SWITCH_NOTIFY = 88,
    START_P2P_DEVICE = 89,
    STOP_P2P_DEVICE = 90,
    CONN_FAILED = 91,
    SET_MCAST_RATE = 92,
    SET_MAC_ACL = 93,
    RADAR_DETECT = 94,
    GET_PROTOCOL_FEATURES = 95,
    UPDATE_FT_IES = 96,
    FT_EVENT = 97,
    CRIT_PROTOCOL_START = 98,
    CRIT_PROTOCOL_STOP = 99,
    GET_COALESCE = 100,
    SET_COALESCE = 101,
    CHANNEL_SWITCH = 102,
    VENDOR = 103,
    SET_QOS_MAP = 104,
}

/// Factory method for messages of the nl80211 family id.
pub fn create_message(
    packet: &mut NetlinkPacket<'_>,
    context: &MessageContext,
) -> Result<NetlinkMessage> {
    decode_generic(Family::Nl80211, packet, context)
}

/// Constructors for nl80211 requests.
pub struct Nl80211Message;

impl Nl80211Message {
    /// An empty request for `command`.
    pub fn new(family_id: u16, command: u8) -> NetlinkMessage {
        NetlinkMessage::generic(family_id, Family::Nl80211, command)
    }

    fn dump(family_id: u16, command: u8) -> NetlinkMessage {
        let mut message = Self::new(family_id, command);
        message.add_flag(NLM_F_DUMP);
        message
    }

    fn with_ifindex(mut message: NetlinkMessage, ifindex: u32) -> Result<NetlinkMessage> {
        if let Some(generic) = message.as_generic_mut() {
            generic
                .attributes_mut()
                .add_u32(Nl80211Attr::IFINDEX, "NL80211_ATTR_IFINDEX", ifindex)?;
        }
        Ok(message)
    }

    /// Dump of every wiphy and its capabilities.
    pub fn get_wiphy(family_id: u16) -> NetlinkMessage {
        Self::dump(family_id, Nl80211Cmd::GET_WIPHY)
    }

    /// Dump of every wireless interface.
    pub fn get_interfaces(family_id: u16) -> NetlinkMessage {
        Self::dump(family_id, Nl80211Cmd::GET_INTERFACE)
    }

    /// Dump of the scan results cached for `ifindex`.
    pub fn get_scan(family_id: u16, ifindex: u32) -> Result<NetlinkMessage> {
        Self::with_ifindex(Self::dump(family_id, Nl80211Cmd::GET_SCAN), ifindex)
    }

    /// Dump of the stations known on `ifindex`.
    pub fn get_station(family_id: u16, ifindex: u32) -> Result<NetlinkMessage> {
        Self::with_ifindex(Self::dump(family_id, Nl80211Cmd::GET_STATION), ifindex)
    }

    /// Current regulatory domain.
    pub fn get_reg(family_id: u16) -> NetlinkMessage {
        Self::new(family_id, Nl80211Cmd::GET_REG)
    }

    /// Scan request for `frequencies` on `ifindex`.
    ///
    /// `SCAN_SSIDS` is only added when `ssids` is non-empty, and then ends
    /// with an empty wildcard entry so broadcast probes still go out.
    pub fn trigger_scan(
        family_id: u16,
        ifindex: u32,
        frequencies: &[u32],
        ssids: &[Vec<u8>],
    ) -> Result<NetlinkMessage> {
        let mut message =
            Self::with_ifindex(Self::new(family_id, Nl80211Cmd::TRIGGER_SCAN), ifindex)?;
        let Some(generic) = message.as_generic_mut() else {
            return Ok(message);
        };
        let attributes = generic.attributes_mut();

        if !ssids.is_empty() {
            let list = attributes.create_nested(Nl80211Attr::SCAN_SSIDS, "NL80211_ATTR_SCAN_SSIDS")?;
            let wildcard: &[u8] = &[];
            for (index, ssid) in ssids
                .iter()
                .map(Vec::as_slice)
                .chain(std::iter::once(wildcard))
                .enumerate()
            {
                list.add_raw(index as u16, format!("NL80211_SCAN_SSID_{}", index), ssid)?;
            }
            attributes.set_nested_has_value(Nl80211Attr::SCAN_SSIDS)?;
        }

        let list = attributes.create_nested(
            Nl80211Attr::SCAN_FREQUENCIES,
            "NL80211_ATTR_SCAN_FREQUENCIES",
        )?;
        for (index, frequency) in frequencies.iter().enumerate() {
            list.add_u32(
                index as u16,
                format!("NL80211_SCAN_FREQ_{}", index),
                *frequency,
            )?;
        }
        attributes.set_nested_has_value(Nl80211Attr::SCAN_FREQUENCIES)?;
        Ok(message)
    }
}
