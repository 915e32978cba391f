//! Declarative attribute schemas.
//!
//! Families describe their attributes with static tables of [`NestedEntry`]
//! values. A top-level table maps every known id to a kind and a name; ids a
//! table does not know are kept as raw "unknown attribute" values. Nested
//! attributes point at a [`NestedSchema`]:
//!
//! - [`NestedSchema::Keyed`]: each expected sub-id has its own entry; sub-ids
//!   that are not listed are dropped.
//! - [`NestedSchema::Array`]: one entry describes every child, and the child
//!   id is its position in the array.
//!
//! An entry can also carry a [`CustomParser`] that takes over decoding of
//! that id entirely (information elements are decoded this way).

use tracing::debug;

use super::attr::iterate_attributes;
use super::attribute::{Attribute, AttributeKind, AttributeValue};
use super::attribute_list::AttributeList;
use super::error::Result;

/// Parser that fully replaces default decoding for one id.
///
/// Arguments are the list to add to, the attribute id, the entry name and the
/// attribute payload.
pub type CustomParser = fn(&mut AttributeList, u16, &'static str, &[u8]) -> Result<()>;

/// Lookup from a top-level attribute id to its entry.
pub type AttributeLookup = fn(u16, &MessageContext) -> Option<&'static NestedEntry>;

/// Name given to top-level attributes missing from a family table.
pub const UNKNOWN_ATTRIBUTE_NAME: &str = "unknown attribute";

/// Decode-time context for entries whose shape depends on the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageContext {
    /// nl80211 command of the message being decoded.
    pub nl80211_command: Option<u8>,
    /// The message arrived without a matching request.
    pub is_broadcast: bool,
}

/// One attribute description.
#[derive(Debug, Clone, Copy)]
pub struct NestedEntry {
    pub id: u16,
    pub kind: AttributeKind,
    pub name: &'static str,
    /// Schema for the children of a nested entry.
    pub deeper: Option<&'static NestedSchema>,
    pub parser: Option<CustomParser>,
}

impl NestedEntry {
    pub const fn new(id: u16, kind: AttributeKind, name: &'static str) -> Self {
        Self {
            id,
            kind,
            name,
            deeper: None,
            parser: None,
        }
    }

    /// Nested entry whose children follow `schema`.
    pub const fn nested(id: u16, name: &'static str, schema: &'static NestedSchema) -> Self {
        Self {
            id,
            kind: AttributeKind::Nested,
            name,
            deeper: Some(schema),
            parser: None,
        }
    }

    /// Entry decoded by `parser`.
    pub const fn custom(
        id: u16,
        kind: AttributeKind,
        name: &'static str,
        parser: CustomParser,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            deeper: None,
            parser: Some(parser),
        }
    }
}

/// Schema for the children of a nested attribute.
#[derive(Debug)]
pub enum NestedSchema {
    Keyed(&'static [NestedEntry]),
    Array(&'static NestedEntry),
}

impl NestedSchema {
    /// Find the entry for a keyed sub-id.
    pub fn entry(&self, id: u16) -> Option<&'static NestedEntry> {
        match self {
            Self::Keyed(entries) => find_entry(*entries, id),
            Self::Array(entry) => Some(*entry),
        }
    }
}

/// Find an entry by id in a table.
pub fn find_entry(entries: &'static [NestedEntry], id: u16) -> Option<&'static NestedEntry> {
    entries.iter().find(|e| e.id == id)
}

/// Name of the `index`-th element of an array attribute.
pub fn indexed_name(name: &str, index: usize) -> String {
    format!("{}_{}", name, index)
}

/// Decode one attribute described by `entry` and add it to `list`.
pub(crate) fn decode_entry(
    list: &mut AttributeList,
    id: u16,
    entry: &'static NestedEntry,
    name: String,
    payload: &[u8],
) -> Result<()> {
    if let Some(parser) = entry.parser {
        return parser(list, id, entry.name, payload);
    }

    let mut attr = Attribute::new(id, entry.kind, name);
    match (entry.kind, entry.deeper) {
        (AttributeKind::Nested, Some(schema)) => {
            decode_nested(attr.nested_mut()?, schema, payload)?;
            attr.set_nested_has_value()?;
        }
        _ => attr.decode_payload(payload)?,
    }
    list.insert(attr)
}

/// Decode `payload` into `list` following `schema`.
pub(crate) fn decode_nested(
    list: &mut AttributeList,
    schema: &'static NestedSchema,
    payload: &[u8],
) -> Result<()> {
    iterate_attributes(payload, 0, |id, child| match schema {
        NestedSchema::Array(entry) => {
            decode_entry(list, id, *entry, indexed_name(entry.name, id as usize), child)
        }
        NestedSchema::Keyed(entries) => match find_entry(*entries, id) {
            Some(entry) => decode_entry(list, id, entry, entry.name.to_string(), child),
            None => {
                debug!(id, "dropping nested attribute missing from schema");
                Ok(())
            }
        },
    })
}

/// Decode a family's top-level attribute stream.
pub(crate) fn decode_top_level(
    list: &mut AttributeList,
    lookup: AttributeLookup,
    context: &MessageContext,
    payload: &[u8],
    offset: usize,
) -> Result<()> {
    iterate_attributes(payload, offset, |id, child| match lookup(id, context) {
        Some(entry) => decode_entry(list, id, entry, entry.name.to_string(), child),
        None => {
            debug!(id, "keeping unknown attribute as raw bytes");
            list.insert(Attribute::with_value(
                id,
                UNKNOWN_ATTRIBUTE_NAME,
                AttributeValue::Raw(child.to_vec()),
            ))
        }
    })
}
