//! Netlink attribute (nlattr) wire handling.
//!
//! Every attribute is a TLV: a 4-byte header followed by the payload, and the
//! whole attribute padded to a 4-byte boundary.
//!
//! ```text
//! ┌───────────┬───────────┬──────────────────────┬─────────┐
//! │ len (u16) │ type (u16)│ payload (len - 4)    │ padding │
//! └───────────┴───────────┴──────────────────────┴─────────┘
//! ```

use tracing::debug;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};

/// Attributes start on 4-byte boundaries.
pub const NLA_ALIGNTO: usize = 4;

#[inline]
pub const fn nla_align(len: usize) -> usize {
    len.next_multiple_of(NLA_ALIGNTO)
}

pub const NLA_HDRLEN: usize = 4;

/// Netlink attribute header (mirrors struct nlattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Header plus unpadded payload.
    pub nla_len: u16,
    /// Id in the low 14 bits, flags above.
    pub nla_type: u16,
}

pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Header for an attribute of `nla_len` bytes, header included.
    ///
    /// Callers check the length; [`AttrWriter`](super::AttrWriter) rejects
    /// anything a `u16` cannot hold.
    pub const fn with_len(attr_type: u16, nla_len: u16) -> Self {
        Self { nla_len, nla_type: attr_type }
    }

    /// Attribute id with the flag bits masked off.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if the sender marked this attribute as nested.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Copy the header out of the start of `data`, wherever it sits in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(header, _)| header)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Yields `(type, payload)` with the flag bits masked off. A header whose
/// length is shorter than the header itself, or that runs past the buffer,
/// yields one error and ends the iteration. Fewer than [`NLA_HDRLEN`] trailing
/// bytes end the stream without an error.
pub struct AttrIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> AttrIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// True once no full header is left.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<(u16, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLA_HDRLEN {
            if !self.data.is_empty() {
                debug!(
                    offset = self.offset,
                    count = self.data.len(),
                    "ignoring unparsed bytes after last attribute"
                );
                self.data = &[];
            }
            return None;
        }

        let attr = match NlAttr::from_bytes(self.data) {
            Ok(a) => a,
            Err(e) => {
                self.data = &[];
                return Some(Err(e));
            }
        };

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            let offset = self.offset;
            self.data = &[];
            return Some(Err(Error::MalformedAttribute {
                offset,
                length: len,
            }));
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len).min(self.data.len());
        self.data = &self.data[aligned_len..];
        self.offset += aligned_len;

        Some(Ok((attr.kind(), payload)))
    }
}

/// Walk the attributes of `buffer` starting at `offset` (rounded up to the
/// attribute alignment), calling `visit` for each one.
///
/// The first malformed header or the first visitor error aborts the walk; in
/// the malformed case nothing past the previous attribute is visited.
pub fn iterate_attributes<F>(buffer: &[u8], offset: usize, mut visit: F) -> Result<()>
where
    F: FnMut(u16, &[u8]) -> Result<()>,
{
    let start = nla_align(offset);
    if start >= buffer.len() {
        return Ok(());
    }
    for item in AttrIter::new(&buffer[start..]) {
        let (attr_type, payload) = item?;
        visit(attr_type, payload)?;
    }
    Ok(())
}

/// Payload readers. Integers must match their width exactly.
pub mod get {
    use tracing::{debug, warn};

    use super::*;

    fn exact<const N: usize>(data: &[u8], what: &str) -> Result<[u8; N]> {
        data.try_into().map_err(|_| {
            Error::InvalidAttribute(format!(
                "{} attribute needs {} bytes, got {}",
                what,
                N,
                data.len()
            ))
        })
    }

    pub fn u8(data: &[u8]) -> Result<u8> {
        Ok(exact::<1>(data, "u8")?[0])
    }

    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        Ok(u16::from_ne_bytes(exact(data, "u16")?))
    }

    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        Ok(u32::from_ne_bytes(exact(data, "u32")?))
    }

    pub fn u64_ne(data: &[u8]) -> Result<u64> {
        Ok(u64::from_ne_bytes(exact(data, "u64")?))
    }

    /// A single trailing NUL is the terminator. An unterminated string or
    /// one with an embedded NUL is accepted as-is and logged.
    pub fn string(data: &[u8]) -> String {
        let body = match data.split_last() {
            Some((0, rest)) => rest,
            Some(_) => {
                debug!(len = data.len(), "string attribute is not NUL-terminated");
                data
            }
            None => data,
        };
        if body.contains(&0) {
            warn!("string attribute has an embedded NUL");
        }
        String::from_utf8_lossy(body).into_owned()
    }
}
