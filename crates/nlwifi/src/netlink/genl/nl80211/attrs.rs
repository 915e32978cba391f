//! nl80211 attribute ids and decode schemas.
//!
//! The top-level table covers every attribute this crate knows how to type;
//! ids missing from it still decode, as raw "unknown attribute" values.

use super::Nl80211Cmd;
use super::ie::parse_information_elements;
use crate::netlink::attribute::AttributeKind;
use crate::netlink::schema::{MessageContext, NestedEntry, NestedSchema, find_entry};

macro_rules! entry {
    ($id:expr, $name:expr, $kind:ident) => {
        NestedEntry::new($id, AttributeKind::$kind, $name)
    };
    ($id:expr, $name:expr, Nested => $schema:expr) => {
        NestedEntry::nested($id, $name, $schema)
    };
}

/// Keyed schema backed by its own static entry array.
macro_rules! keyed {
    ($schema:ident = [$($entry:expr),* $(,)?]) => {
        static $schema: NestedSchema = {
            static ENTRIES: [NestedEntry; [$(stringify!($entry)),*].len()] = [$($entry),*];
            NestedSchema::Keyed(&ENTRIES)
        };
    };
}

macro_rules! nl80211_attributes {
    ($($name:ident = $id:literal : $kind:ident $(=> $schema:expr)?,)*) => {
        /// nl80211 top-level attribute ids.
        pub struct Nl80211Attr;

        impl Nl80211Attr {
            $(pub const $name: u16 = $id;)*
        }

        static TABLE: &[NestedEntry] = &[
            $(entry!($id, concat!("NL80211_ATTR_", stringify!($name)), $kind $(=> $schema)?),)*
        ];
    };
}

nl80211_attributes! {
    WIPHY = 1: U32,
    WIPHY_NAME = 2: String,
    IFINDEX = 3: U32,
    IFNAME = 4: String,
    IFTYPE = 5: U32,
    MAC = 6: Raw,
    KEY_DATA = 7: Raw,
    KEY_IDX = 8: U8,
    KEY_CIPHER = 9: U32,
    KEY_SEQ = 10: Raw,
    KEY_DEFAULT = 11: Flag,
    BEACON_INTERVAL = 12: U32,
    DTIM_PERIOD = 13: U32,
    BEACON_HEAD = 14: Raw,
    BEACON_TAIL = 15: Raw,
    STA_AID = 16: U16,
    STA_FLAGS = 17: Nested,
    STA_LISTEN_INTERVAL = 18: U16,
    STA_SUPPORTED_RATES = 19: Raw,
    STA_VLAN = 20: U32,
    STA_INFO = 21: Nested => &STA_INFO,
    WIPHY_BANDS = 22: Nested => &WIPHY_BANDS,
    MNTR_FLAGS = 23: Nested,
    MESH_ID = 24: Raw,
    STA_PLINK_ACTION = 25: U8,
    MPATH_NEXT_HOP = 26: Raw,
    MPATH_INFO = 27: Nested,
    BSS_CTS_PROT = 28: U8,
    BSS_SHORT_PREAMBLE = 29: U8,
    BSS_SHORT_SLOT_TIME = 30: U8,
    HT_CAPABILITY = 31: Raw,
    SUPPORTED_IFTYPES = 32: Nested => &SUPPORTED_IFTYPES,
    REG_ALPHA2 = 33: String,
    REG_RULES = 34: Nested => &REG_RULES,
    MESH_CONFIG = 35: Nested,
    BSS_BASIC_RATES = 36: Raw,
    WIPHY_TXQ_PARAMS = 37: Nested,
    WIPHY_FREQ = 38: U32,
    WIPHY_CHANNEL_TYPE = 39: U32,
    KEY_DEFAULT_MGMT = 40: Flag,
    MGMT_SUBTYPE = 41: U8,
    IE = 42: Raw,
    MAX_NUM_SCAN_SSIDS = 43: U8,
    SCAN_FREQUENCIES = 44: Nested => &SCAN_FREQUENCIES,
    SCAN_SSIDS = 45: Nested => &SCAN_SSIDS,
    GENERATION = 46: U32,
    BSS = 47: Nested => &BSS,
    REG_INITIATOR = 48: U8,
    REG_TYPE = 49: U8,
    SUPPORTED_COMMANDS = 50: Nested => &SUPPORTED_COMMANDS,
    FRAME = 51: Raw,
    SSID = 52: Raw,
    AUTH_TYPE = 53: U32,
    REASON_CODE = 54: U16,
    KEY_TYPE = 55: U32,
    MAX_SCAN_IE_LEN = 56: U16,
    CIPHER_SUITES = 57: Raw,
    FREQ_BEFORE = 58: Nested,
    FREQ_AFTER = 59: Nested,
    FREQ_FIXED = 60: Flag,
    WIPHY_RETRY_SHORT = 61: U8,
    WIPHY_RETRY_LONG = 62: U8,
    WIPHY_FRAG_THRESHOLD = 63: U32,
    WIPHY_RTS_THRESHOLD = 64: U32,
    TIMED_OUT = 65: Flag,
    USE_MFP = 66: U32,
    STA_FLAGS2 = 67: Raw,
    CONTROL_PORT = 68: Flag,
    TESTDATA = 69: Raw,
    PRIVACY = 70: Flag,
    DISCONNECTED_BY_AP = 71: Flag,
    STATUS_CODE = 72: U16,
    CIPHER_SUITES_PAIRWISE = 73: Raw,
    CIPHER_SUITE_GROUP = 74: U32,
    WPA_VERSIONS = 75: U32,
    AKM_SUITES = 76: Raw,
    REQ_IE = 77: Raw,
    RESP_IE = 78: Raw,
    PREV_BSSID = 79: Raw,
    KEY = 80: Nested,
    KEYS = 81: Nested,
    PID = 82: U32,
    FOUR_ADDR = 83: U8,
    SURVEY_INFO = 84: Nested => &SURVEY_INFO,
    PMKID = 85: Raw,
    MAX_NUM_PMKIDS = 86: U8,
    DURATION = 87: U32,
    COOKIE = 88: U64,
    WIPHY_COVERAGE_CLASS = 89: U8,
    TX_RATES = 90: Nested,
    FRAME_MATCH = 91: Raw,
    ACK = 92: Flag,
    PS_STATE = 93: U32,
    CQM = 94: Nested => &CQM,
    LOCAL_STATE_CHANGE = 95: Flag,
    AP_ISOLATE = 96: U8,
    WIPHY_TX_POWER_SETTING = 97: U32,
    WIPHY_TX_POWER_LEVEL = 98: U32,
    TX_FRAME_TYPES = 99: Nested,
    RX_FRAME_TYPES = 100: Nested,
    FRAME_TYPE = 101: U16,
    CONTROL_PORT_ETHERTYPE = 102: Flag,
    CONTROL_PORT_NO_ENCRYPT = 103: Flag,
    SUPPORT_IBSS_RSN = 104: Flag,
    WIPHY_ANTENNA_TX = 105: U32,
    WIPHY_ANTENNA_RX = 106: U32,
    MCAST_RATE = 107: U32,
    OFFCHANNEL_TX_OK = 108: Flag,
    BSS_HT_OPMODE = 109: U16,
    KEY_DEFAULT_TYPES = 110: Nested,
    MAX_REMAIN_ON_CHANNEL_DURATION = 111: U32,
    MESH_SETUP = 112: Nested,
    WIPHY_ANTENNA_AVAIL_TX = 113: U32,
    WIPHY_ANTENNA_AVAIL_RX = 114: U32,
    SUPPORT_MESH_AUTH = 115: Flag,
    STA_PLINK_STATE = 116: U8,
    WOWLAN_TRIGGERS = 117: Nested => &WOWLAN_TRIGGERS,
    WOWLAN_TRIGGERS_SUPPORTED = 118: Nested => &WOWLAN_TRIGGERS_SUPPORTED,
    SCHED_SCAN_INTERVAL = 119: U32,
    INTERFACE_COMBINATIONS = 120: Nested,
    SOFTWARE_IFTYPES = 121: Nested => &SUPPORTED_IFTYPES,
    REKEY_DATA = 122: Nested,
    MAX_NUM_SCHED_SCAN_SSIDS = 123: U8,
    MAX_SCHED_SCAN_IE_LEN = 124: U16,
    SCAN_SUPP_RATES = 125: Nested,
    HIDDEN_SSID = 126: U32,
    IE_PROBE_RESP = 127: Raw,
    IE_ASSOC_RESP = 128: Raw,
    STA_WME = 129: Nested,
    SUPPORT_AP_UAPSD = 130: Flag,
    ROAM_SUPPORT = 131: Flag,
    SCHED_SCAN_MATCH = 132: Nested => &SCHED_SCAN_MATCH,
    MAX_MATCH_SETS = 133: U8,
    PMKSA_CANDIDATE = 134: Nested,
    TX_NO_CCK_RATE = 135: Flag,
    TDLS_ACTION = 136: U8,
    TDLS_DIALOG_TOKEN = 137: U8,
    TDLS_OPERATION = 138: U8,
    TDLS_SUPPORT = 139: Flag,
    TDLS_EXTERNAL_SETUP = 140: Flag,
    DEVICE_AP_SME = 141: U32,
    DONT_WAIT_FOR_ACK = 142: Flag,
    FEATURE_FLAGS = 143: U32,
    PROBE_RESP_OFFLOAD = 144: U32,
    PROBE_RESP = 145: Raw,
    DFS_REGION = 146: U8,
    DISABLE_HT = 147: Flag,
    HT_CAPABILITY_MASK = 148: Raw,
    NOACK_MAP = 149: U16,
    INACTIVITY_TIMEOUT = 150: U16,
    RX_SIGNAL_DBM = 151: U32,
    BG_SCAN_PERIOD = 152: U16,
    WDEV = 153: U64,
    USER_REG_HINT_TYPE = 154: U32,
    CONN_FAILED_REASON = 155: U32,
    SAE_DATA = 156: Raw,
    VHT_CAPABILITY = 157: Raw,
    SCAN_FLAGS = 158: U32,
    CHANNEL_WIDTH = 159: U32,
    CENTER_FREQ1 = 160: U32,
    CENTER_FREQ2 = 161: U32,
}

// BSS

keyed! {
    BSS = [
        entry!(1, "NL80211_BSS_BSSID", Raw),
        entry!(2, "NL80211_BSS_FREQUENCY", U32),
        entry!(3, "NL80211_BSS_TSF", U64),
        entry!(4, "NL80211_BSS_BEACON_INTERVAL", U16),
        entry!(5, "NL80211_BSS_CAPABILITY", U16),
        NestedEntry::custom(
            6,
            AttributeKind::Nested,
            "NL80211_BSS_INFORMATION_ELEMENTS",
            parse_information_elements,
        ),
        entry!(7, "NL80211_BSS_SIGNAL_MBM", U32),
        entry!(8, "NL80211_BSS_SIGNAL_UNSPEC", U8),
        entry!(9, "NL80211_BSS_STATUS", U32),
        entry!(10, "NL80211_BSS_SEEN_MS_AGO", U32),
        entry!(11, "NL80211_BSS_BEACON_IES", Raw),
        entry!(12, "NL80211_BSS_CHAN_WIDTH", U32),
        entry!(13, "NL80211_BSS_BEACON_TSF", U64),
        entry!(14, "NL80211_BSS_PRESP_DATA", Flag),
    ]
}

// Wiphy bands

keyed! {
    FREQUENCY = [
        entry!(1, "NL80211_FREQUENCY_ATTR_FREQ", U32),
        entry!(2, "NL80211_FREQUENCY_ATTR_DISABLED", Flag),
        entry!(3, "NL80211_FREQUENCY_ATTR_NO_IR", Flag),
        entry!(4, "NL80211_FREQUENCY_ATTR_NO_IBSS", Flag),
        entry!(5, "NL80211_FREQUENCY_ATTR_RADAR", Flag),
        entry!(6, "NL80211_FREQUENCY_ATTR_MAX_TX_POWER", U32),
        entry!(7, "NL80211_FREQUENCY_ATTR_DFS_STATE", U32),
    ]
}
static FREQS_ELEMENT: NestedEntry = entry!(0, "NL80211_BAND_ATTR_FREQ", Nested => &FREQUENCY);
static FREQS: NestedSchema = NestedSchema::Array(&FREQS_ELEMENT);

keyed! {
    BITRATE = [
        entry!(1, "NL80211_BITRATE_ATTR_RATE", U32),
        entry!(2, "NL80211_BITRATE_ATTR_2GHZ_SHORTPREAMBLE", Flag),
    ]
}
static RATES_ELEMENT: NestedEntry = entry!(0, "NL80211_BAND_ATTR_RATE", Nested => &BITRATE);
static RATES: NestedSchema = NestedSchema::Array(&RATES_ELEMENT);

keyed! {
    BAND = [
        entry!(1, "NL80211_BAND_ATTR_FREQS", Nested => &FREQS),
        entry!(2, "NL80211_BAND_ATTR_RATES", Nested => &RATES),
        entry!(3, "NL80211_BAND_ATTR_HT_MCS_SET", Raw),
        entry!(4, "NL80211_BAND_ATTR_HT_CAPA", U16),
        entry!(5, "NL80211_BAND_ATTR_HT_AMPDU_FACTOR", U8),
        entry!(6, "NL80211_BAND_ATTR_HT_AMPDU_DENSITY", U8),
        entry!(7, "NL80211_BAND_ATTR_VHT_MCS_SET", Raw),
        entry!(8, "NL80211_BAND_ATTR_VHT_CAPA", U32),
    ]
}
static BANDS_ELEMENT: NestedEntry = entry!(0, "NL80211_ATTR_BANDS", Nested => &BAND);
static WIPHY_BANDS: NestedSchema = NestedSchema::Array(&BANDS_ELEMENT);

// Scanning

static SCAN_FREQ: NestedEntry = entry!(0, "NL80211_SCAN_FREQ", U32);
static SCAN_FREQUENCIES: NestedSchema = NestedSchema::Array(&SCAN_FREQ);

static SCAN_SSID: NestedEntry = entry!(0, "NL80211_SCAN_SSID", Raw);
static SCAN_SSIDS: NestedSchema = NestedSchema::Array(&SCAN_SSID);

keyed! {
    SCHED_SCAN_MATCH_SINGLE = [
        entry!(1, "NL80211_SCHED_SCAN_MATCH_ATTR_SSID", Raw),
        entry!(2, "NL80211_SCHED_SCAN_MATCH_ATTR_RSSI", U32),
    ]
}
static SCHED_SCAN_MATCH_ELEMENT: NestedEntry = entry!(
    0,
    "NL80211_ATTR_SCHED_SCAN_MATCH_SINGLE",
    Nested => &SCHED_SCAN_MATCH_SINGLE
);
static SCHED_SCAN_MATCH: NestedSchema = NestedSchema::Array(&SCHED_SCAN_MATCH_ELEMENT);

static SUPPORTED_COMMAND: NestedEntry = entry!(0, "NL80211_CMD", U32);
static SUPPORTED_COMMANDS: NestedSchema = NestedSchema::Array(&SUPPORTED_COMMAND);

// Station info

keyed! {
    RATE_INFO = [
        entry!(1, "NL80211_RATE_INFO_BITRATE", U16),
        entry!(2, "NL80211_RATE_INFO_MCS", U8),
        entry!(3, "NL80211_RATE_INFO_40_MHZ_WIDTH", Flag),
        entry!(4, "NL80211_RATE_INFO_SHORT_GI", Flag),
        entry!(5, "NL80211_RATE_INFO_BITRATE32", U32),
        entry!(6, "NL80211_RATE_INFO_VHT_MCS", U8),
        entry!(7, "NL80211_RATE_INFO_VHT_NSS", U8),
        entry!(8, "NL80211_RATE_INFO_80_MHZ_WIDTH", Flag),
        entry!(9, "NL80211_RATE_INFO_80P80_MHZ_WIDTH", Flag),
        entry!(10, "NL80211_RATE_INFO_160_MHZ_WIDTH", Flag),
    ]
}

keyed! {
    STA_BSS_PARAM = [
        entry!(1, "NL80211_STA_BSS_PARAM_CTS_PROT", Flag),
        entry!(2, "NL80211_STA_BSS_PARAM_SHORT_PREAMBLE", Flag),
        entry!(3, "NL80211_STA_BSS_PARAM_SHORT_SLOT_TIME", Flag),
        entry!(4, "NL80211_STA_BSS_PARAM_DTIM_PERIOD", U8),
        entry!(5, "NL80211_STA_BSS_PARAM_BEACON_INTERVAL", U16),
    ]
}

keyed! {
    STA_INFO = [
        entry!(1, "NL80211_STA_INFO_INACTIVE_TIME", U32),
        entry!(2, "NL80211_STA_INFO_RX_BYTES", U32),
        entry!(3, "NL80211_STA_INFO_TX_BYTES", U32),
        entry!(4, "NL80211_STA_INFO_LLID", U16),
        entry!(5, "NL80211_STA_INFO_PLID", U16),
        entry!(6, "NL80211_STA_INFO_PLINK_STATE", U8),
        entry!(7, "NL80211_STA_INFO_SIGNAL", U8),
        entry!(8, "NL80211_STA_INFO_TX_BITRATE", Nested => &RATE_INFO),
        entry!(9, "NL80211_STA_INFO_RX_PACKETS", U32),
        entry!(10, "NL80211_STA_INFO_TX_PACKETS", U32),
        entry!(11, "NL80211_STA_INFO_TX_RETRIES", U32),
        entry!(12, "NL80211_STA_INFO_TX_FAILED", U32),
        entry!(13, "NL80211_STA_INFO_SIGNAL_AVG", U8),
        entry!(14, "NL80211_STA_INFO_RX_BITRATE", Nested => &RATE_INFO),
        entry!(15, "NL80211_STA_INFO_BSS_PARAM", Nested => &STA_BSS_PARAM),
        entry!(16, "NL80211_STA_INFO_CONNECTED_TIME", U32),
        entry!(17, "NL80211_STA_INFO_STA_FLAGS", Raw),
        entry!(18, "NL80211_STA_INFO_BEACON_LOSS", U32),
        entry!(19, "NL80211_STA_INFO_T_OFFSET", U64),
        entry!(20, "NL80211_STA_INFO_LOCAL_PM", U32),
        entry!(21, "NL80211_STA_INFO_PEER_PM", U32),
        entry!(22, "NL80211_STA_INFO_NONPEER_PM", U32),
        entry!(23, "NL80211_STA_INFO_RX_BYTES64", U64),
        entry!(24, "NL80211_STA_INFO_TX_BYTES64", U64),
    ]
}

// Regulatory

keyed! {
    REG_RULE = [
        entry!(1, "NL80211_ATTR_REG_RULE_FLAGS", U32),
        entry!(2, "NL80211_ATTR_FREQ_RANGE_START", U32),
        entry!(3, "NL80211_ATTR_FREQ_RANGE_END", U32),
        entry!(4, "NL80211_ATTR_FREQ_RANGE_MAX_BW", U32),
        entry!(5, "NL80211_ATTR_POWER_RULE_MAX_ANT_GAIN", U32),
        entry!(6, "NL80211_ATTR_POWER_RULE_MAX_EIRP", U32),
        entry!(7, "NL80211_ATTR_DFS_CAC_TIME", U32),
    ]
}
static REG_RULES_ELEMENT: NestedEntry = entry!(0, "NL80211_REG_RULES", Nested => &REG_RULE);
static REG_RULES: NestedSchema = NestedSchema::Array(&REG_RULES_ELEMENT);

// Connection quality monitor

keyed! {
    CQM = [
        entry!(1, "NL80211_ATTR_CQM_RSSI_THOLD", U32),
        entry!(2, "NL80211_ATTR_CQM_RSSI_HYST", U32),
        entry!(3, "NL80211_ATTR_CQM_RSSI_THRESHOLD_EVENT", U32),
        entry!(4, "NL80211_ATTR_CQM_PKT_LOSS_EVENT", U32),
        entry!(5, "NL80211_ATTR_CQM_TXE_RATE", U32),
        entry!(6, "NL80211_ATTR_CQM_TXE_PKTS", U32),
        entry!(7, "NL80211_ATTR_CQM_TXE_INTVL", U32),
        entry!(8, "NL80211_ATTR_CQM_BEACON_LOSS_EVENT", Flag),
    ]
}

keyed! {
    SURVEY_INFO = [
        entry!(1, "NL80211_SURVEY_INFO_FREQUENCY", U32),
        entry!(2, "NL80211_SURVEY_INFO_NOISE", U8),
        entry!(3, "NL80211_SURVEY_INFO_IN_USE", Flag),
        entry!(4, "NL80211_SURVEY_INFO_CHANNEL_TIME", U64),
        entry!(5, "NL80211_SURVEY_INFO_CHANNEL_TIME_BUSY", U64),
        entry!(6, "NL80211_SURVEY_INFO_CHANNEL_TIME_EXT_BUSY", U64),
        entry!(7, "NL80211_SURVEY_INFO_CHANNEL_TIME_RX", U64),
        entry!(8, "NL80211_SURVEY_INFO_CHANNEL_TIME_TX", U64),
    ]
}

keyed! {
    SUPPORTED_IFTYPES = [
        entry!(1, "NL80211_IFTYPE_ADHOC", Flag),
        entry!(2, "NL80211_IFTYPE_STATION", Flag),
        entry!(3, "NL80211_IFTYPE_AP", Flag),
        entry!(4, "NL80211_IFTYPE_AP_VLAN", Flag),
        entry!(5, "NL80211_IFTYPE_WDS", Flag),
        entry!(6, "NL80211_IFTYPE_MONITOR", Flag),
        entry!(7, "NL80211_IFTYPE_MESH_POINT", Flag),
        entry!(8, "NL80211_IFTYPE_P2P_CLIENT", Flag),
        entry!(9, "NL80211_IFTYPE_P2P_GO", Flag),
        entry!(10, "NL80211_IFTYPE_P2P_DEVICE", Flag),
    ]
}

// Wake on WLAN

/// `NL80211_WOWLAN_TRIG_*` ids.
pub struct WowlanTrigger;

impl WowlanTrigger {
    pub const ANY: u16 = 1;
    pub const DISCONNECT: u16 = 2;
    pub const MAGIC_PKT: u16 = 3;
    pub const PKT_PATTERN: u16 = 4;
    pub const GTK_REKEY_SUPPORTED: u16 = 5;
    pub const GTK_REKEY_FAILURE: u16 = 6;
    pub const EAP_IDENT_REQUEST: u16 = 7;
    pub const FOUR_WAY_HANDSHAKE: u16 = 8;
    pub const RFKILL_RELEASE: u16 = 9;
    pub const WAKEUP_PKT_80211: u16 = 10;
    pub const WAKEUP_PKT_80211_LEN: u16 = 11;
    pub const WAKEUP_PKT_8023: u16 = 12;
    pub const WAKEUP_PKT_8023_LEN: u16 = 13;
    pub const NET_DETECT: u16 = 18;
    pub const NET_DETECT_RESULTS: u16 = 19;
}

keyed! {
    PKT_PATTERN = [
        entry!(1, "NL80211_PKTPAT_MASK", Raw),
        entry!(2, "NL80211_PKTPAT_PATTERN", Raw),
        entry!(3, "NL80211_PKTPAT_OFFSET", U32),
    ]
}
static PKT_PATTERNS_ELEMENT: NestedEntry = entry!(0, "Pattern Match Info", Nested => &PKT_PATTERN);
static PKT_PATTERNS: NestedSchema = NestedSchema::Array(&PKT_PATTERNS_ELEMENT);

keyed! {
    NET_DETECT = [
        entry!(44, "NL80211_ATTR_SCAN_FREQUENCIES", Nested => &SCAN_FREQUENCIES),
        entry!(119, "NL80211_ATTR_SCHED_SCAN_INTERVAL", U32),
        entry!(132, "NL80211_ATTR_SCHED_SCAN_MATCH", Nested => &SCHED_SCAN_MATCH),
    ]
}

keyed! {
    NET_DETECT_RESULT = [
        entry!(44, "NL80211_ATTR_SCAN_FREQUENCIES", Nested => &SCAN_FREQUENCIES),
        entry!(52, "NL80211_ATTR_SSID", Raw),
    ]
}
static NET_DETECT_RESULTS_ELEMENT: NestedEntry =
    entry!(0, "NL80211_WOWLAN_TRIG_NET_DETECT_RESULT", Nested => &NET_DETECT_RESULT);
static NET_DETECT_RESULTS: NestedSchema = NestedSchema::Array(&NET_DETECT_RESULTS_ELEMENT);

macro_rules! wowlan_triggers {
    ($schema:ident, $pkt_pattern:expr) => {
        keyed! {
            $schema = [
                entry!(1, "NL80211_WOWLAN_TRIG_ANY", Flag),
                entry!(2, "NL80211_WOWLAN_TRIG_DISCONNECT", Flag),
                entry!(3, "NL80211_WOWLAN_TRIG_MAGIC_PKT", Flag),
                $pkt_pattern,
                entry!(5, "NL80211_WOWLAN_TRIG_GTK_REKEY_SUPPORTED", Flag),
                entry!(6, "NL80211_WOWLAN_TRIG_GTK_REKEY_FAILURE", Flag),
                entry!(7, "NL80211_WOWLAN_TRIG_EAP_IDENT_REQUEST", Flag),
                entry!(8, "NL80211_WOWLAN_TRIG_4WAY_HANDSHAKE", Flag),
                entry!(9, "NL80211_WOWLAN_TRIG_RFKILL_RELEASE", Flag),
                entry!(10, "NL80211_WOWLAN_TRIG_WAKEUP_PKT_80211", Raw),
                entry!(11, "NL80211_WOWLAN_TRIG_WAKEUP_PKT_80211_LEN", U32),
                entry!(12, "NL80211_WOWLAN_TRIG_WAKEUP_PKT_8023", Raw),
                entry!(13, "NL80211_WOWLAN_TRIG_WAKEUP_PKT_8023_LEN", U32),
                entry!(18, "NL80211_WOWLAN_TRIG_NET_DETECT", Nested => &NET_DETECT),
                entry!(19, "NL80211_WOWLAN_TRIG_NET_DETECT_RESULTS", Nested => &NET_DETECT_RESULTS),
            ]
        }
    };
}

// Triggers as programmed into the device: patterns are a nested array.
wowlan_triggers!(
    WOWLAN_TRIGGERS,
    entry!(4, "NL80211_WOWLAN_TRIG_PKT_PATTERN", Nested => &PKT_PATTERNS)
);

// Triggers in a wake report: the pattern trigger is the index that matched.
wowlan_triggers!(
    WOWLAN_WAKE_REPORT,
    entry!(4, "NL80211_WOWLAN_TRIG_PKT_PATTERN", U32)
);

static WOWLAN_WAKE_REPORT_ENTRY: NestedEntry =
    entry!(Nl80211Attr::WOWLAN_TRIGGERS, "NL80211_ATTR_WOWLAN_TRIGGERS", Nested => &WOWLAN_WAKE_REPORT);

keyed! {
    WOWLAN_TRIGGERS_SUPPORTED = [
        entry!(1, "NL80211_WOWLAN_TRIG_ANY", Flag),
        entry!(2, "NL80211_WOWLAN_TRIG_DISCONNECT", Flag),
        entry!(3, "NL80211_WOWLAN_TRIG_MAGIC_PKT", Flag),
        entry!(4, "NL80211_WOWLAN_TRIG_PKT_PATTERN", Raw),
        entry!(5, "NL80211_WOWLAN_TRIG_GTK_REKEY_SUPPORTED", Flag),
        entry!(6, "NL80211_WOWLAN_TRIG_GTK_REKEY_FAILURE", Flag),
        entry!(7, "NL80211_WOWLAN_TRIG_EAP_IDENT_REQUEST", Flag),
        entry!(8, "NL80211_WOWLAN_TRIG_4WAY_HANDSHAKE", Flag),
        entry!(9, "NL80211_WOWLAN_TRIG_RFKILL_RELEASE", Flag),
        entry!(18, "NL80211_WOWLAN_TRIG_NET_DETECT", U32),
    ]
}

/// Top-level nl80211 attribute lookup.
///
/// `WOWLAN_TRIGGERS` in a broadcast `SET_WOWLAN` is a wake report and uses
/// a different shape than everywhere else.
pub fn lookup(id: u16, context: &MessageContext) -> Option<&'static NestedEntry> {
    if id == Nl80211Attr::WOWLAN_TRIGGERS
        && context.is_broadcast
        && context.nl80211_command == Some(Nl80211Cmd::SET_WOWLAN)
    {
        return Some(&WOWLAN_WAKE_REPORT_ENTRY);
    }
    find_entry(TABLE, id)
}
