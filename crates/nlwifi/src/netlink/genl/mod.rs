//! Generic Netlink (GENL) families.
//!
//! Generic netlink multiplexes many kernel subsystems over one protocol.
//! Every family except the control family gets its id assigned at runtime,
//! so a family has to be resolved by name (see
//! [`Manager::get_family`](crate::netlink::Manager::get_family)) before any
//! of its messages can be sent or decoded.
//!
//! Two families are known here:
//!
//! - [`control`]: fixed id [`GENL_ID_CTRL`], used for family resolution.
//! - [`nl80211`]: the 802.11 configuration family.
//!
//! Both describe their attributes with static schema tables; the shared
//! decode path is [`decode_generic`].

use tracing::warn;

use super::error::Result;
use super::message::{MessagePayload, NetlinkMessage};
use super::packet::NetlinkPacket;
use super::schema::{AttributeLookup, MessageContext};

pub mod control;
mod header;
pub mod nl80211;

pub use control::{ControlMessage, FamilyInfo};
pub use header::{GENL_HDRLEN, GenlMsgHdr};
pub use nl80211::Nl80211Message;

/// Control family id (fixed, not dynamically assigned).
pub const GENL_ID_CTRL: u16 = 0x10;

/// Interface version sent in every GENL header.
pub const GENL_VERSION: u8 = 1;

/// A generic netlink family this crate has schemas for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Control,
    Nl80211,
}

impl Family {
    /// Kernel name of the family.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Control => "nlctrl",
            Self::Nl80211 => nl80211::FAMILY_NAME,
        }
    }

    pub fn version(&self) -> u8 {
        GENL_VERSION
    }

    /// Name of `command`, or `None` if the family does not define it.
    pub fn command_name(&self, command: u8) -> Option<&'static str> {
        match self {
            Self::Control => control::command_name(command),
            Self::Nl80211 => nl80211::command_name(command),
        }
    }

    /// Top-level attribute table.
    pub fn lookup(&self) -> AttributeLookup {
        match self {
            Self::Control => control::lookup,
            Self::Nl80211 => nl80211::attrs::lookup,
        }
    }
}

/// Decode the rest of `packet` as a message of `family`.
///
/// An unknown command is logged and decoded anyway.
pub fn decode_generic(
    family: Family,
    packet: &mut NetlinkPacket<'_>,
    context: &MessageContext,
) -> Result<NetlinkMessage> {
    let header = packet.consume_genl_header()?;
    if family.command_name(header.cmd).is_none() {
        warn!(
            family = family.name(),
            command = header.cmd,
            "unknown command, decoding anyway"
        );
    }

    let context = MessageContext {
        nl80211_command: (family == Family::Nl80211).then_some(header.cmd),
        ..*context
    };
    let attributes = packet.consume_attributes(family.lookup(), &context)?;
    Ok(NetlinkMessage::from_packet(
        packet,
        MessagePayload::Generic(super::message::GenericMessage::new(
            family, header.cmd, attributes,
        )),
    ))
}
