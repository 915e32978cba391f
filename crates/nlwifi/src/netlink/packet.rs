//! Received datagram slicing.
//!
//! A [`NetlinkPacket`] is one netlink message inside a received buffer: the
//! validated header plus a consume cursor over the payload. Decoders walk the
//! payload front to back with [`consume`](NetlinkPacket::consume),
//! [`consume_genl_header`](NetlinkPacket::consume_genl_header) and
//! [`consume_attributes`](NetlinkPacket::consume_attributes).

use super::attr::nla_align;
use super::attribute_list::AttributeList;
use super::error::{Error, Result};
use super::genl::{GENL_HDRLEN, GenlMsgHdr};
use super::message::{NLMSG_HDRLEN, NlMsgHdr};
use super::schema::{AttributeLookup, MessageContext};

/// One validated netlink message inside a receive buffer.
#[derive(Debug, Clone)]
pub struct NetlinkPacket<'a> {
    header: NlMsgHdr,
    payload: &'a [u8],
    consumed: usize,
}

impl<'a> NetlinkPacket<'a> {
    /// Validate the header at the start of `bytes`.
    ///
    /// The declared length must cover at least the header and must not run
    /// past `bytes`. Bytes after the declared length belong to the next
    /// message and are not part of this packet.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < NLMSG_HDRLEN {
            return Err(Error::Truncated {
                expected: NLMSG_HDRLEN,
                actual: bytes.len(),
            });
        }
        let header = NlMsgHdr::from_bytes(bytes)?;
        let len = header.nlmsg_len as usize;
        if len < NLMSG_HDRLEN {
            return Err(Error::InvalidMessage(format!(
                "declared length {} is shorter than the header",
                len
            )));
        }
        if len > bytes.len() {
            return Err(Error::Truncated {
                expected: len,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            header,
            payload: &bytes[NLMSG_HDRLEN..len],
            consumed: 0,
        })
    }

    /// The netlink header.
    pub fn header(&self) -> &NlMsgHdr {
        &self.header
    }

    pub fn message_type(&self) -> u16 {
        self.header.nlmsg_type
    }

    pub fn flags(&self) -> u16 {
        self.header.nlmsg_flags
    }

    pub fn sequence_number(&self) -> u32 {
        self.header.nlmsg_seq
    }

    pub fn pid(&self) -> u32 {
        self.header.nlmsg_pid
    }

    /// Total length declared by the header.
    pub fn length(&self) -> usize {
        self.header.nlmsg_len as usize
    }

    /// Payload bytes not yet consumed.
    pub fn remaining_bytes(&self) -> usize {
        self.payload.len() - self.consumed
    }

    /// The whole payload, regardless of the cursor.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// The unconsumed part of the payload.
    pub fn remaining(&self) -> &'a [u8] {
        &self.payload[self.consumed..]
    }

    /// Take the next `n` bytes.
    ///
    /// Fails without moving the cursor if fewer than `n` bytes remain. On
    /// success the cursor moves past the alignment padding as well, clamped to
    /// the end of the payload.
    pub fn consume(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining_bytes() {
            return Err(Error::Truncated {
                expected: n,
                actual: self.remaining_bytes(),
            });
        }
        let data = &self.payload[self.consumed..self.consumed + n];
        self.consumed = (self.consumed + nla_align(n)).min(self.payload.len());
        Ok(data)
    }

    /// Take the generic netlink sub-header.
    pub fn consume_genl_header(&mut self) -> Result<GenlMsgHdr> {
        let data = self.consume(GENL_HDRLEN)?;
        GenlMsgHdr::from_bytes(data)
    }

    /// Decode everything left as attributes.
    ///
    /// The cursor moves to the end of the payload whether or not decoding
    /// succeeds.
    pub fn consume_attributes(
        &mut self,
        lookup: AttributeLookup,
        context: &MessageContext,
    ) -> Result<AttributeList> {
        let data = self.remaining();
        self.consumed = self.payload.len();
        AttributeList::decode(data, 0, lookup, context)
    }
}

/// A packet whose header can be rewritten before it is parsed again.
///
/// Used to replay captured traffic with a different type, flags or sequence
/// number.
#[derive(Debug, Clone)]
pub struct MutableNetlinkPacket {
    bytes: Vec<u8>,
}

impl MutableNetlinkPacket {
    /// Copy a single message out of `bytes`, validating it.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let len = NetlinkPacket::new(bytes)?.length();
        Ok(Self {
            bytes: bytes[..len].to_vec(),
        })
    }

    pub fn set_message_type(&mut self, message_type: u16) {
        self.bytes[4..6].copy_from_slice(&message_type.to_ne_bytes());
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.bytes[6..8].copy_from_slice(&flags.to_ne_bytes());
    }

    pub fn set_sequence_number(&mut self, seq: u32) {
        self.bytes[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    /// Replace the payload and patch the header length.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.bytes.truncate(NLMSG_HDRLEN);
        self.bytes.extend_from_slice(payload);
        let len = self.bytes.len() as u32;
        self.bytes[0..4].copy_from_slice(&len.to_ne_bytes());
    }

    /// Parse the current bytes with a fresh cursor.
    pub fn packet(&self) -> Result<NetlinkPacket<'_>> {
        NetlinkPacket::new(&self.bytes)
    }

    /// The raw message bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
