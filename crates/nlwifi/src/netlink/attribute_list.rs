//! Ordered attribute collections.
//!
//! An [`AttributeList`] owns its attributes, keyed by id and always iterated
//! (and encoded) in ascending id order, so encoding the same list twice gives
//! the same bytes.
//!
//! # Example
//!
//! ```
//! use nlwifi::netlink::AttributeList;
//!
//! let mut list = AttributeList::new();
//! list.add_u32(3, "NL80211_ATTR_IFINDEX", 4).unwrap();
//! let frequencies = list.create_nested(44, "NL80211_ATTR_SCAN_FREQUENCIES").unwrap();
//! frequencies.add_u32(0, "NL80211_SCAN_FREQ_0", 2412).unwrap();
//! list.set_nested_has_value(44).unwrap();
//!
//! let bytes = list.encode().unwrap();
//! assert_eq!(bytes.len() % 4, 0);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use super::attribute::{Attribute, AttributeKind, AttributeValue};
use super::builder::AttrWriter;
use super::error::{Error, Result};
use super::schema::{self, AttributeLookup, MessageContext, NestedSchema};

/// An ordered collection of attributes keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeList {
    attributes: BTreeMap<u16, Attribute>,
}

macro_rules! typed_list_accessors {
    ($($add:ident, $set:ident, $get:ident, $attr_get:ident, $attr_set:ident, $variant:ident, $ty:ty;)*) => {
        $(
            #[doc = concat!("Create a `", stringify!($variant), "` attribute holding `value`.")]
            pub fn $add(&mut self, id: u16, name: impl Into<String>, value: $ty) -> Result<()> {
                self.insert(Attribute::with_value(id, name, AttributeValue::$variant(value)))
            }

            #[doc = concat!("Set the value of an existing `", stringify!($variant), "` attribute.")]
            pub fn $set(&mut self, id: u16, value: $ty) -> Result<()> {
                self.attribute_mut(id)?.$attr_set(value)
            }

            #[doc = concat!("Get the value of a `", stringify!($variant), "` attribute.")]
            pub fn $get(&self, id: u16) -> Result<$ty> {
                self.attribute(id)?.$attr_get()
            }
        )*
    };
}

impl AttributeList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the list has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Get an attribute by id.
    pub fn get(&self, id: u16) -> Option<&Attribute> {
        self.attributes.get(&id)
    }

    /// Check whether an attribute with this id exists.
    pub fn contains(&self, id: u16) -> bool {
        self.attributes.contains_key(&id)
    }

    /// Get an attribute by id, failing when it is missing.
    pub fn attribute(&self, id: u16) -> Result<&Attribute> {
        self.attributes
            .get(&id)
            .ok_or(Error::AttributeNotFound { id })
    }

    /// Mutable access to an attribute by id.
    pub fn attribute_mut(&mut self, id: u16) -> Result<&mut Attribute> {
        self.attributes
            .get_mut(&id)
            .ok_or(Error::AttributeNotFound { id })
    }

    /// Add an attribute. Ids are unique; adding an existing id fails.
    pub fn insert(&mut self, attribute: Attribute) -> Result<()> {
        let id = attribute.id();
        if self.attributes.contains_key(&id) {
            return Err(Error::AttributeExists { id });
        }
        self.attributes.insert(id, attribute);
        Ok(())
    }

    /// Create an attribute of `kind` without a value.
    pub fn create(&mut self, id: u16, kind: AttributeKind, name: impl Into<String>) -> Result<()> {
        self.insert(Attribute::new(id, kind, name))
    }

    /// Remove an attribute.
    pub fn remove(&mut self, id: u16) -> Option<Attribute> {
        self.attributes.remove(&id)
    }

    typed_list_accessors! {
        add_u8, set_u8, get_u8, u8_value, set_u8, U8, u8;
        add_u16, set_u16, get_u16, u16_value, set_u16, U16, u16;
        add_u32, set_u32, get_u32, u32_value, set_u32, U32, u32;
        add_u64, set_u64, get_u64, u64_value, set_u64, U64, u64;
    }

    /// Create a flag attribute.
    pub fn add_flag(&mut self, id: u16, name: impl Into<String>, value: bool) -> Result<()> {
        self.insert(Attribute::with_value(id, name, AttributeValue::Flag(value)))
    }

    /// Set an existing flag attribute.
    pub fn set_flag(&mut self, id: u16, value: bool) -> Result<()> {
        self.attribute_mut(id)?.set_flag(value)
    }

    /// A flag is true only when present and set; a missing flag is false.
    pub fn is_flag_true(&self, id: u16) -> bool {
        self.get(id)
            .and_then(|a| a.flag_value().ok())
            .unwrap_or(false)
    }

    /// Create a string attribute.
    pub fn add_string(
        &mut self,
        id: u16,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.insert(Attribute::with_value(
            id,
            name,
            AttributeValue::String(value.into()),
        ))
    }

    /// Set an existing string attribute.
    pub fn set_string(&mut self, id: u16, value: impl Into<String>) -> Result<()> {
        self.attribute_mut(id)?.set_string(value)
    }

    /// Get a string attribute.
    pub fn get_string(&self, id: u16) -> Result<&str> {
        self.attribute(id)?.string_value()
    }

    /// Create a raw attribute.
    pub fn add_raw(
        &mut self,
        id: u16,
        name: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Result<()> {
        self.insert(Attribute::with_value(id, name, AttributeValue::Raw(value.into())))
    }

    /// Set an existing raw attribute.
    pub fn set_raw(&mut self, id: u16, value: impl Into<Vec<u8>>) -> Result<()> {
        self.attribute_mut(id)?.set_raw(value)
    }

    /// Get a raw attribute.
    pub fn get_raw(&self, id: u16) -> Result<&[u8]> {
        self.attribute(id)?.raw_value()
    }

    /// Create a nested attribute and return its (empty) child list.
    ///
    /// The attribute has no value until
    /// [`set_nested_has_value`](Self::set_nested_has_value) is called.
    pub fn create_nested(&mut self, id: u16, name: impl Into<String>) -> Result<&mut AttributeList> {
        self.insert(Attribute::new(id, AttributeKind::Nested, name))?;
        self.attribute_mut(id)?.nested_mut()
    }

    /// Child list of a nested attribute.
    pub fn nested(&self, id: u16) -> Result<&AttributeList> {
        self.attribute(id)?.nested()
    }

    /// Mutable child list of a nested attribute.
    pub fn nested_mut(&mut self, id: u16) -> Result<&mut AttributeList> {
        self.attribute_mut(id)?.nested_mut()
    }

    /// Mark a nested attribute as carrying a value.
    pub fn set_nested_has_value(&mut self, id: u16) -> Result<()> {
        self.attribute_mut(id)?.set_nested_has_value()
    }

    /// Append every attribute to `writer`, in ascending id order.
    pub fn encode_into(&self, writer: &mut AttrWriter) -> Result<()> {
        for attribute in self.attributes.values() {
            attribute.encode_into(writer)?;
        }
        Ok(())
    }

    /// Encode the list as a TLV stream.
    ///
    /// Fails if any attribute, or any nested list, does not fit an attribute
    /// length field.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut writer = AttrWriter::new();
        self.encode_into(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Decode a family's top-level attribute stream starting at `offset`.
    ///
    /// Ids that `lookup` does not know are kept as raw attributes named
    /// [`UNKNOWN_ATTRIBUTE_NAME`](super::schema::UNKNOWN_ATTRIBUTE_NAME).
    pub fn decode(
        payload: &[u8],
        offset: usize,
        lookup: AttributeLookup,
        context: &MessageContext,
    ) -> Result<Self> {
        let mut list = Self::new();
        schema::decode_top_level(&mut list, lookup, context, payload, offset)?;
        Ok(list)
    }

    /// Decode the children of a nested attribute into this list.
    pub fn decode_nested(&mut self, schema: &'static NestedSchema, payload: &[u8]) -> Result<()> {
        schema::decode_nested(self, schema, payload)
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for attribute in self.attributes.values() {
            write!(f, "{:indent$}{}: ", "", attribute.name(), indent = depth * 2)?;
            match attribute.value() {
                None => writeln!(f, "<no value>")?,
                Some(AttributeValue::Nested(child)) => {
                    writeln!(f)?;
                    child.fmt_indented(f, depth + 1)?;
                }
                Some(value) => writeln!(f, "{}", value)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 1)
    }
}
