//! Writers for attribute streams and whole messages.
//!
//! [`AttrWriter`] produces the TLV payload; [`MessageBuilder`] frames a
//! payload with a netlink header and fixes up the total length.

use zerocopy::IntoBytes;

use super::attr::{NLA_F_NESTED, NLA_HDRLEN, NlAttr, nla_align};
use super::error::{Error, Result};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

/// Position of an open nested attribute, closed by [`AttrWriter::end_nested`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an open nested attribute keeps a zero length until closed"]
pub struct NestedMark {
    offset: usize,
    id: u16,
}

/// Appends 4-byte aligned attributes to a growing buffer.
#[derive(Debug, Clone, Default)]
pub struct AttrWriter {
    buf: Vec<u8>,
}

impl AttrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write one attribute with an arbitrary payload, then pad.
    ///
    /// Fails without writing anything when the attribute would not fit the
    /// 16-bit length field.
    pub fn put(&mut self, id: u16, payload: &[u8]) -> Result<()> {
        let header = NlAttr::with_len(id, attribute_len(id, NLA_HDRLEN + payload.len())?);
        self.write(header, payload);
        Ok(())
    }

    pub fn put_u8(&mut self, id: u16, value: u8) {
        self.put_fixed(id, &[value]);
    }

    pub fn put_u16(&mut self, id: u16, value: u16) {
        self.put_fixed(id, &value.to_ne_bytes());
    }

    pub fn put_u32(&mut self, id: u16, value: u32) {
        self.put_fixed(id, &value.to_ne_bytes());
    }

    pub fn put_u64(&mut self, id: u16, value: u64) {
        self.put_fixed(id, &value.to_ne_bytes());
    }

    /// A flag is a header with no payload.
    pub fn put_flag(&mut self, id: u16) {
        self.put_fixed(id, &[]);
    }

    /// Strings go out NUL-terminated.
    pub fn put_str(&mut self, id: u16, value: &str) -> Result<()> {
        let len = attribute_len(id, NLA_HDRLEN + value.len() + 1)?;
        self.buf.extend_from_slice(NlAttr::with_len(id, len).as_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        self.pad();
        Ok(())
    }

    /// Open a nested attribute. Everything written until the matching
    /// [`end_nested`](Self::end_nested) becomes its payload.
    pub fn begin_nested(&mut self, id: u16) -> NestedMark {
        let mark = NestedMark {
            offset: self.buf.len(),
            id,
        };
        self.buf
            .extend_from_slice(NlAttr::with_len(id | NLA_F_NESTED, NLA_HDRLEN as u16).as_bytes());
        mark
    }

    /// Close a nested attribute by writing its final length.
    ///
    /// A nest whose contents overflow the length field is dropped from the
    /// buffer along with everything written into it.
    pub fn end_nested(&mut self, mark: NestedMark) -> Result<()> {
        let start = mark.offset;
        let len = match attribute_len(mark.id, self.buf.len() - start) {
            Ok(len) => len,
            Err(e) => {
                self.abandon_nested(mark);
                return Err(e);
            }
        };
        self.buf[start..start + 2].copy_from_slice(&len.to_ne_bytes());
        self.pad();
        Ok(())
    }

    /// Drop an open nest and everything written into it.
    pub fn abandon_nested(&mut self, mark: NestedMark) {
        self.buf.truncate(mark.offset);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Fixed-width payloads always fit.
    fn put_fixed(&mut self, id: u16, payload: &[u8]) {
        self.write(NlAttr::with_len(id, (NLA_HDRLEN + payload.len()) as u16), payload);
    }

    fn write(&mut self, header: NlAttr, payload: &[u8]) {
        self.buf.extend_from_slice(header.as_bytes());
        self.buf.extend_from_slice(payload);
        self.pad();
    }

    fn pad(&mut self) {
        self.buf.resize(nla_align(self.buf.len()), 0);
    }
}

/// Header plus payload length of attribute `id`, checked against `nla_len`.
fn attribute_len(id: u16, len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| {
        Error::InvalidAttribute(format!(
            "attribute {} needs {} bytes, more than the {} a header can describe",
            id,
            len,
            u16::MAX
        ))
    })
}

/// Frames a payload with a netlink header.
///
/// ```ignore
/// let bytes = MessageBuilder::new(GENL_ID_CTRL, NLM_F_REQUEST)
///     .with_sequence(1)
///     .push(genl_header)
///     .push(&attributes)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: NlMsgHdr,
    body: Vec<u8>,
}

impl MessageBuilder {
    pub fn new(message_type: u16, flags: u16) -> Self {
        Self {
            header: NlMsgHdr::new(message_type, flags),
            body: Vec::new(),
        }
    }

    pub fn with_sequence(mut self, seq: u32) -> Self {
        self.header.nlmsg_seq = seq;
        self
    }

    pub fn with_port(mut self, pid: u32) -> Self {
        self.header.nlmsg_pid = pid;
        self
    }

    /// Append body bytes, padded to the message alignment.
    pub fn push(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self.body.resize(nlmsg_align(self.body.len()), 0);
        self
    }

    /// Header and body with `nlmsg_len` filled in.
    pub fn build(mut self) -> Vec<u8> {
        let total = NLMSG_HDRLEN + self.body.len();
        self.header.nlmsg_len = total as u32;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(self.header.as_bytes());
        out.resize(NLMSG_HDRLEN, 0);
        out.extend_from_slice(&self.body);
        out
    }
}
