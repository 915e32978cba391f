//! Typed, named netlink attributes.
//!
//! An [`Attribute`] pairs a wire id with a fixed [`AttributeKind`] and a value
//! of that kind. The kind is chosen at construction and never changes; every
//! typed accessor checks it and fails without touching the attribute when it
//! does not match.

use std::fmt;

use tracing::debug;

use super::attr::{NLA_HDRLEN, get, iterate_attributes, nla_align};
use super::attribute_list::AttributeList;
use super::builder::AttrWriter;
use super::error::{Error, Result};

/// The kind of value an attribute carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    U8,
    U16,
    U32,
    U64,
    /// True when present on the wire, false when absent.
    Flag,
    String,
    Nested,
    Raw,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Flag => "flag",
            Self::String => "string",
            Self::Nested => "nested",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Flag(bool),
    String(String),
    Nested(AttributeList),
    Raw(Vec<u8>),
}

impl AttributeValue {
    /// The kind of this value.
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::U8(_) => AttributeKind::U8,
            Self::U16(_) => AttributeKind::U16,
            Self::U32(_) => AttributeKind::U32,
            Self::U64(_) => AttributeKind::U64,
            Self::Flag(_) => AttributeKind::Flag,
            Self::String(_) => AttributeKind::String,
            Self::Nested(_) => AttributeKind::Nested,
            Self::Raw(_) => AttributeKind::Raw,
        }
    }

    fn empty(kind: AttributeKind) -> Self {
        match kind {
            AttributeKind::U8 => Self::U8(0),
            AttributeKind::U16 => Self::U16(0),
            AttributeKind::U32 => Self::U32(0),
            AttributeKind::U64 => Self::U64(0),
            AttributeKind::Flag => Self::Flag(false),
            AttributeKind::String => Self::String(String::new()),
            AttributeKind::Nested => Self::Nested(AttributeList::new()),
            AttributeKind::Raw => Self::Raw(Vec::new()),
        }
    }
}

/// A single netlink attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    id: u16,
    name: String,
    value: AttributeValue,
    has_value: bool,
}

macro_rules! scalar_accessors {
    ($($get:ident, $set:ident, $variant:ident, $ty:ty;)*) => {
        $(
            #[doc = concat!("Get the value of a `", stringify!($variant), "` attribute.")]
            pub fn $get(&self) -> Result<$ty> {
                match &self.value {
                    AttributeValue::$variant(v) if self.has_value => Ok(*v),
                    AttributeValue::$variant(_) => Err(Error::AttributeNoValue { id: self.id }),
                    _ => Err(self.wrong_kind(AttributeKind::$variant)),
                }
            }

            #[doc = concat!("Set the value of a `", stringify!($variant), "` attribute.")]
            pub fn $set(&mut self, value: $ty) -> Result<()> {
                match &mut self.value {
                    AttributeValue::$variant(v) => {
                        *v = value;
                        self.has_value = true;
                        Ok(())
                    }
                    _ => Err(self.wrong_kind(AttributeKind::$variant)),
                }
            }
        )*
    };
}

impl Attribute {
    /// Create an attribute of `kind` that has no value yet.
    pub fn new(id: u16, kind: AttributeKind, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            value: AttributeValue::empty(kind),
            has_value: false,
        }
    }

    /// Create an attribute holding `value`.
    pub fn with_value(id: u16, name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            id,
            name: name.into(),
            value,
            has_value: true,
        }
    }

    /// Wire id.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind fixed at construction.
    pub fn kind(&self) -> AttributeKind {
        self.value.kind()
    }

    /// Whether a value was set or decoded.
    pub fn has_value(&self) -> bool {
        self.has_value
    }

    /// The value, if one was set or decoded.
    pub fn value(&self) -> Option<&AttributeValue> {
        self.has_value.then_some(&self.value)
    }

    fn wrong_kind(&self, expected: AttributeKind) -> Error {
        Error::WrongAttributeKind {
            id: self.id,
            expected,
            actual: self.kind(),
        }
    }

    scalar_accessors! {
        u8_value, set_u8, U8, u8;
        u16_value, set_u16, U16, u16;
        u32_value, set_u32, U32, u32;
        u64_value, set_u64, U64, u64;
    }

    /// Get a flag. A flag that was never set reads as false.
    pub fn flag_value(&self) -> Result<bool> {
        match self.value {
            AttributeValue::Flag(v) => Ok(self.has_value && v),
            _ => Err(self.wrong_kind(AttributeKind::Flag)),
        }
    }

    /// Set a flag.
    pub fn set_flag(&mut self, value: bool) -> Result<()> {
        match &mut self.value {
            AttributeValue::Flag(v) => {
                *v = value;
                self.has_value = true;
                Ok(())
            }
            _ => Err(self.wrong_kind(AttributeKind::Flag)),
        }
    }

    /// Get the value of a string attribute.
    pub fn string_value(&self) -> Result<&str> {
        match &self.value {
            AttributeValue::String(s) if self.has_value => Ok(s),
            AttributeValue::String(_) => Err(Error::AttributeNoValue { id: self.id }),
            _ => Err(self.wrong_kind(AttributeKind::String)),
        }
    }

    /// Set the value of a string attribute.
    pub fn set_string(&mut self, value: impl Into<String>) -> Result<()> {
        match &mut self.value {
            AttributeValue::String(s) => {
                *s = value.into();
                self.has_value = true;
                Ok(())
            }
            _ => Err(self.wrong_kind(AttributeKind::String)),
        }
    }

    /// Get the bytes of a raw attribute.
    pub fn raw_value(&self) -> Result<&[u8]> {
        match &self.value {
            AttributeValue::Raw(b) if self.has_value => Ok(b),
            AttributeValue::Raw(_) => Err(Error::AttributeNoValue { id: self.id }),
            _ => Err(self.wrong_kind(AttributeKind::Raw)),
        }
    }

    /// Set the bytes of a raw attribute.
    pub fn set_raw(&mut self, value: impl Into<Vec<u8>>) -> Result<()> {
        match &mut self.value {
            AttributeValue::Raw(b) => {
                *b = value.into();
                self.has_value = true;
                Ok(())
            }
            _ => Err(self.wrong_kind(AttributeKind::Raw)),
        }
    }

    /// The child list of a nested attribute.
    ///
    /// The list exists from construction; it only counts as a value once
    /// [`set_nested_has_value`](Self::set_nested_has_value) was called.
    pub fn nested(&self) -> Result<&AttributeList> {
        match &self.value {
            AttributeValue::Nested(list) => Ok(list),
            _ => Err(self.wrong_kind(AttributeKind::Nested)),
        }
    }

    /// Mutable access to the child list of a nested attribute.
    pub fn nested_mut(&mut self) -> Result<&mut AttributeList> {
        let expected = self.wrong_kind(AttributeKind::Nested);
        match &mut self.value {
            AttributeValue::Nested(list) => Ok(list),
            _ => Err(expected),
        }
    }

    /// Mark a nested attribute's child list as its value.
    pub fn set_nested_has_value(&mut self) -> Result<()> {
        match self.value {
            AttributeValue::Nested(_) => {
                self.has_value = true;
                Ok(())
            }
            _ => Err(self.wrong_kind(AttributeKind::Nested)),
        }
    }

    /// Decode `payload` according to this attribute's kind.
    ///
    /// Nested attributes decoded here have no schema: every child becomes a
    /// raw attribute. Schema-driven decoding lives in
    /// [`AttributeList::decode_nested`].
    pub fn decode_payload(&mut self, payload: &[u8]) -> Result<()> {
        match &mut self.value {
            AttributeValue::U8(v) => *v = get::u8(payload)?,
            AttributeValue::U16(v) => *v = get::u16_ne(payload)?,
            AttributeValue::U32(v) => *v = get::u32_ne(payload)?,
            AttributeValue::U64(v) => *v = get::u64_ne(payload)?,
            AttributeValue::Flag(v) => {
                if !payload.is_empty() {
                    debug!(
                        id = self.id,
                        len = payload.len(),
                        "flag attribute carries a payload"
                    );
                }
                *v = true;
            }
            AttributeValue::String(s) => *s = get::string(payload),
            AttributeValue::Raw(b) => *b = payload.to_vec(),
            AttributeValue::Nested(list) => {
                let name = &self.name;
                iterate_attributes(payload, 0, |id, child| {
                    list.insert(Attribute::with_value(
                        id,
                        format!("{}_{}", name, id),
                        AttributeValue::Raw(child.to_vec()),
                    ))
                })?;
            }
        }
        self.has_value = true;
        Ok(())
    }

    /// Append this attribute to `writer`.
    ///
    /// Attributes without a value and flags that are false encode to nothing.
    /// A string, raw or nested value too long for the 16-bit length field is
    /// an error and leaves `writer` as it was.
    pub fn encode_into(&self, writer: &mut AttrWriter) -> Result<()> {
        if !self.has_value {
            return Ok(());
        }
        match &self.value {
            AttributeValue::U8(v) => writer.put_u8(self.id, *v),
            AttributeValue::U16(v) => writer.put_u16(self.id, *v),
            AttributeValue::U32(v) => writer.put_u32(self.id, *v),
            AttributeValue::U64(v) => writer.put_u64(self.id, *v),
            AttributeValue::Flag(true) => writer.put_flag(self.id),
            AttributeValue::Flag(false) => {}
            AttributeValue::String(s) => writer.put_str(self.id, s)?,
            AttributeValue::Raw(b) => writer.put(self.id, b)?,
            AttributeValue::Nested(list) => {
                let nest = writer.begin_nested(self.id);
                if let Err(e) = list.encode_into(writer) {
                    writer.abandon_nested(nest);
                    return Err(e);
                }
                writer.end_nested(nest)?;
            }
        }
        Ok(())
    }

    /// Encode this attribute on its own.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut writer = AttrWriter::new();
        self.encode_into(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Length of the header plus unpadded payload this attribute encodes to,
    /// or 0 when it encodes to nothing.
    pub fn encoded_len(&self) -> usize {
        if !self.has_value {
            return 0;
        }
        let payload = match &self.value {
            AttributeValue::U8(_) => 1,
            AttributeValue::U16(_) => 2,
            AttributeValue::U32(_) => 4,
            AttributeValue::U64(_) => 8,
            AttributeValue::Flag(true) => 0,
            AttributeValue::Flag(false) => return 0,
            AttributeValue::String(s) => s.len() + 1,
            AttributeValue::Raw(b) => b.len(),
            AttributeValue::Nested(list) => list
                .iter()
                .map(|child| nla_align(child.encoded_len()))
                .sum(),
        };
        NLA_HDRLEN + payload
    }
}

/// Equality covers id, kind and value; the debug name is not compared.
impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.has_value == other.has_value && self.value == other.value
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::Flag(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "'{}'", s),
            Self::Raw(b) => {
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Self::Nested(list) => write!(f, "{} attributes", list.len()),
        }
    }
}
