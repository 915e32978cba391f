//! Generic netlink control family (`nlctrl`).
//!
//! The control family has the fixed id [`GENL_ID_CTRL`] and resolves every
//! other family: a `CTRL_CMD_GETFAMILY` request naming a family is answered
//! by `CTRL_CMD_NEWFAMILY` carrying its id and multicast groups.

use std::collections::HashMap;

use super::{Family, GENL_ID_CTRL, decode_generic};
use crate::netlink::attribute::AttributeKind;
use crate::netlink::attribute_list::AttributeList;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::NetlinkMessage;
use crate::netlink::packet::NetlinkPacket;
use crate::netlink::schema::{MessageContext, NestedEntry, NestedSchema, find_entry};

/// Control family commands
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCmd {
    Unspec = 0,
    NewFamily = 1,
    DelFamily = 2,
    GetFamily = 3,
    NewOps = 4,
    DelOps = 5,
    GetOps = 6,
    NewMcastGrp = 7,
    DelMcastGrp = 8,
    GetMcastGrp = 9,
    GetPolicy = 10,
}

/// Control family attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttr {
    Unspec = 0,
    FamilyId = 1,
    FamilyName = 2,
    Version = 3,
    HdrSize = 4,
    MaxAttr = 5,
    Ops = 6,
    McastGroups = 7,
}

/// Control family multicast group attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttrMcastGrp {
    Unspec = 0,
    Name = 1,
    Id = 2,
}

/// Control family operation attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttrOp {
    Unspec = 0,
    Id = 1,
    Flags = 2,
}

pub(crate) fn command_name(command: u8) -> Option<&'static str> {
    Some(match command {
        0 => "CTRL_CMD_UNSPEC",
        1 => "CTRL_CMD_NEWFAMILY",
        2 => "CTRL_CMD_DELFAMILY",
        3 => "CTRL_CMD_GETFAMILY",
        4 => "CTRL_CMD_NEWOPS",
        5 => "CTRL_CMD_DELOPS",
        6 => "CTRL_CMD_GETOPS",
        7 => "CTRL_CMD_NEWMCAST_GRP",
        8 => "CTRL_CMD_DELMCAST_GRP",
        9 => "CTRL_CMD_GETMCAST_GRP",
        10 => "CTRL_CMD_GETPOLICY",
        _ => return None,
    })
}

static OP_ENTRIES: [NestedEntry; 2] = [
    NestedEntry::new(CtrlAttrOp::Id as u16, AttributeKind::U32, "CTRL_ATTR_OP_ID"),
    NestedEntry::new(CtrlAttrOp::Flags as u16, AttributeKind::U32, "CTRL_ATTR_OP_FLAGS"),
];
static OP: NestedSchema = NestedSchema::Keyed(&OP_ENTRIES);
static OPS_ELEMENT: NestedEntry = NestedEntry::nested(0, "CTRL_ATTR_OP", &OP);
static OPS: NestedSchema = NestedSchema::Array(&OPS_ELEMENT);

static MCAST_GRP_ENTRIES: [NestedEntry; 2] = [
    NestedEntry::new(
        CtrlAttrMcastGrp::Name as u16,
        AttributeKind::String,
        "CTRL_ATTR_MCAST_GRP_NAME",
    ),
    NestedEntry::new(
        CtrlAttrMcastGrp::Id as u16,
        AttributeKind::U32,
        "CTRL_ATTR_MCAST_GRP_ID",
    ),
];
static MCAST_GRP: NestedSchema = NestedSchema::Keyed(&MCAST_GRP_ENTRIES);
static MCAST_GROUPS_ELEMENT: NestedEntry = NestedEntry::nested(0, "CTRL_ATTR_MCAST_GRP", &MCAST_GRP);
static MCAST_GROUPS: NestedSchema = NestedSchema::Array(&MCAST_GROUPS_ELEMENT);

static TABLE: [NestedEntry; 7] = [
    NestedEntry::new(CtrlAttr::FamilyId as u16, AttributeKind::U16, "CTRL_ATTR_FAMILY_ID"),
    NestedEntry::new(
        CtrlAttr::FamilyName as u16,
        AttributeKind::String,
        "CTRL_ATTR_FAMILY_NAME",
    ),
    NestedEntry::new(CtrlAttr::Version as u16, AttributeKind::U32, "CTRL_ATTR_VERSION"),
    NestedEntry::new(CtrlAttr::HdrSize as u16, AttributeKind::U32, "CTRL_ATTR_HDRSIZE"),
    NestedEntry::new(CtrlAttr::MaxAttr as u16, AttributeKind::U32, "CTRL_ATTR_MAXATTR"),
    NestedEntry::nested(CtrlAttr::Ops as u16, "CTRL_ATTR_OPS", &OPS),
    NestedEntry::nested(
        CtrlAttr::McastGroups as u16,
        "CTRL_ATTR_MCAST_GROUPS",
        &MCAST_GROUPS,
    ),
];

/// Top-level control attribute table.
pub fn lookup(id: u16, _: &MessageContext) -> Option<&'static NestedEntry> {
    find_entry(&TABLE, id)
}

/// Factory method for messages of type [`GENL_ID_CTRL`].
pub fn create_message(
    packet: &mut NetlinkPacket<'_>,
    context: &MessageContext,
) -> Result<NetlinkMessage> {
    decode_generic(Family::Control, packet, context)
}

/// Information about a Generic Netlink family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FamilyInfo {
    /// Family name.
    pub name: String,
    /// Dynamically assigned family ID (used as nlmsg_type).
    pub id: u16,
    /// Family version.
    pub version: u32,
    /// Header size (additional bytes after genlmsghdr).
    pub hdr_size: u32,
    /// Maximum attribute number.
    pub max_attr: u32,
    /// Multicast groups: name -> group ID.
    pub mcast_groups: HashMap<String, u32>,
}

impl FamilyInfo {
    /// Read a family description out of a `CTRL_CMD_NEWFAMILY` reply.
    ///
    /// Only the family id is required. Multicast groups missing a name or an
    /// id are skipped.
    pub fn from_attributes(attributes: &AttributeList) -> Result<Self> {
        let id = attributes
            .get_u16(CtrlAttr::FamilyId as u16)
            .map_err(|_| Error::InvalidMessage("missing family ID".into()))?;
        let optional_u32 = |attr: CtrlAttr| attributes.get_u32(attr as u16).unwrap_or(0);

        let mut mcast_groups = HashMap::new();
        if let Ok(groups) = attributes.nested(CtrlAttr::McastGroups as u16) {
            for group in groups.iter() {
                let group = group.nested()?;
                let name = group.get_string(CtrlAttrMcastGrp::Name as u16);
                let group_id = group.get_u32(CtrlAttrMcastGrp::Id as u16);
                if let (Ok(name), Ok(group_id)) = (name, group_id) {
                    mcast_groups.insert(name.to_string(), group_id);
                }
            }
        }

        Ok(Self {
            name: attributes
                .get_string(CtrlAttr::FamilyName as u16)
                .unwrap_or_default()
                .to_string(),
            id,
            version: optional_u32(CtrlAttr::Version),
            hdr_size: optional_u32(CtrlAttr::HdrSize),
            max_attr: optional_u32(CtrlAttr::MaxAttr),
            mcast_groups,
        })
    }
}

/// Constructors for control family messages.
pub struct ControlMessage;

impl ControlMessage {
    /// An empty control message for `command`.
    pub fn new(command: CtrlCmd) -> NetlinkMessage {
        NetlinkMessage::generic(GENL_ID_CTRL, Family::Control, command as u8)
    }

    /// `CTRL_CMD_GETFAMILY` for `name`.
    pub fn get_family(name: &str) -> Result<NetlinkMessage> {
        let mut message = Self::new(CtrlCmd::GetFamily);
        if let Some(generic) = message.as_generic_mut() {
            generic.attributes_mut().add_string(
                CtrlAttr::FamilyName as u16,
                "CTRL_ATTR_FAMILY_NAME",
                name,
            )?;
        }
        Ok(message)
    }

    /// `CTRL_CMD_NEWFAMILY` describing a family, as the kernel sends it.
    pub fn new_family(name: &str, id: u16, groups: &[(&str, u32)]) -> Result<NetlinkMessage> {
        let mut message = Self::new(CtrlCmd::NewFamily);
        if let Some(generic) = message.as_generic_mut() {
            let attributes = generic.attributes_mut();
            attributes.add_u16(CtrlAttr::FamilyId as u16, "CTRL_ATTR_FAMILY_ID", id)?;
            attributes.add_string(CtrlAttr::FamilyName as u16, "CTRL_ATTR_FAMILY_NAME", name)?;
            if !groups.is_empty() {
                let list =
                    attributes.create_nested(CtrlAttr::McastGroups as u16, "CTRL_ATTR_MCAST_GROUPS")?;
                for (index, (group_name, group_id)) in groups.iter().enumerate() {
                    let index = index as u16 + 1;
                    let group = list.create_nested(index, "CTRL_ATTR_MCAST_GRP")?;
                    group.add_string(
                        CtrlAttrMcastGrp::Name as u16,
                        "CTRL_ATTR_MCAST_GRP_NAME",
                        *group_name,
                    )?;
                    group.add_u32(CtrlAttrMcastGrp::Id as u16, "CTRL_ATTR_MCAST_GRP_ID", *group_id)?;
                    list.set_nested_has_value(index)?;
                }
                attributes.set_nested_has_value(CtrlAttr::McastGroups as u16)?;
            }
        }
        Ok(message)
    }
}
