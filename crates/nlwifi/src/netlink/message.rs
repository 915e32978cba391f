//! Netlink message header and decoded messages.

use std::fmt;
use std::io;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::attribute_list::AttributeList;
use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::genl::{Family, GenlMsgHdr};
use super::packet::NetlinkPacket;
use super::schema::MessageContext;

/// Messages start on 4-byte boundaries.
pub const NLMSG_ALIGNTO: usize = 4;

#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    len.next_multiple_of(NLMSG_ALIGNTO)
}

/// 16 bytes on every architecture.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// `struct nlmsghdr`, native endian.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Header plus body, before padding.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Additional flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sending process port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Header with zero sequence and port; the length is set when encoding.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        }
    }

    /// Convert header to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Copy the header out of the start of `data`. Datagram buffers carry
    /// no alignment guarantee, so the header is never borrowed in place.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(header, _)| header)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Reserved netlink message types.
pub struct NlMsgType;

impl NlMsgType {
    /// Ignored on receipt.
    pub const NOOP: u16 = 1;
    /// Error message or ACK.
    pub const ERROR: u16 = 2;
    /// End of multipart message.
    pub const DONE: u16 = 3;
    /// Data lost, request resend.
    pub const OVERRUN: u16 = 4;
}

/// Netlink message flags.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_ECHO: u16 = 0x08;
pub const NLM_F_DUMP_INTR: u16 = 0x10;

// Modifiers to GET request
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_ATOMIC: u16 = 0x400;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

/// Body of an `NLMSG_ERROR`: `-errno` then the offending header.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgError {
    /// Negative errno, or 0 for an ack.
    pub error: i32,
    /// Header of the request being answered.
    pub msg: NlMsgHdr,
}

/// Payload of an Error/Ack message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorAckMessage {
    error: i32,
}

impl ErrorAckMessage {
    /// Build from a positive errno; 0 is an ACK.
    pub fn new(errno: i32) -> Self {
        Self { error: errno }
    }

    /// The positive errno, 0 for an ACK.
    pub fn error(&self) -> i32 {
        self.error
    }

    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    pub fn is_busy(&self) -> bool {
        self.error == libc::EBUSY
    }

    /// Human-readable text for the errno.
    pub fn error_string(&self) -> String {
        if self.is_ack() {
            "success".to_string()
        } else {
            io::Error::from_raw_os_error(self.error).to_string()
        }
    }

    /// The kernel error this message carries, if it is not an ACK.
    pub fn to_error(&self) -> Option<Error> {
        (!self.is_ack()).then(|| Error::Kernel {
            errno: self.error,
            message: self.error_string(),
        })
    }
}

/// A generic netlink message: family, command and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericMessage {
    family: Family,
    command: u8,
    attributes: AttributeList,
}

impl GenericMessage {
    pub fn new(family: Family, command: u8, attributes: AttributeList) -> Self {
        Self {
            family,
            command,
            attributes,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    /// Name of the command from the family's command table.
    pub fn command_name(&self) -> &'static str {
        self.family
            .command_name(self.command)
            .unwrap_or("unknown command")
    }

    pub fn attributes(&self) -> &AttributeList {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeList {
        &mut self.attributes
    }
}

/// What a message carries after its header.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    ErrorAck(ErrorAckMessage),
    Noop,
    Done,
    Overrun,
    Generic(GenericMessage),
    /// A message type nothing is registered for.
    Unknown(Vec<u8>),
}

/// A decoded (or to-be-encoded) netlink message.
#[derive(Debug, Clone, PartialEq)]
pub struct NetlinkMessage {
    message_type: u16,
    flags: u16,
    sequence_number: u32,
    payload: MessagePayload,
}

impl NetlinkMessage {
    /// Create a message with no flags and sequence number 0.
    pub fn new(message_type: u16, payload: MessagePayload) -> Self {
        Self {
            message_type,
            flags: 0,
            sequence_number: 0,
            payload,
        }
    }

    /// Create a generic message for a family whose id is `family_id`.
    pub fn generic(family_id: u16, family: Family, command: u8) -> Self {
        Self::new(
            family_id,
            MessagePayload::Generic(GenericMessage::new(family, command, AttributeList::new())),
        )
    }

    /// Create an Error/Ack carrying a positive `errno` for `seq`.
    pub fn error_ack(seq: u32, errno: i32) -> Self {
        let mut message = Self::new(
            NlMsgType::ERROR,
            MessagePayload::ErrorAck(ErrorAckMessage::new(errno)),
        );
        message.sequence_number = seq;
        message
    }

    /// Create a Done marker for `seq`.
    pub fn done(seq: u32) -> Self {
        let mut message = Self::new(NlMsgType::DONE, MessagePayload::Done);
        message.flags = NLM_F_MULTI;
        message.sequence_number = seq;
        message
    }

    /// Take the header fields of `packet` and attach `payload`.
    pub fn from_packet(packet: &NetlinkPacket<'_>, payload: MessagePayload) -> Self {
        Self {
            message_type: packet.message_type(),
            flags: packet.flags(),
            sequence_number: packet.sequence_number(),
            payload,
        }
    }

    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn set_sequence_number(&mut self, seq: u32) {
        self.sequence_number = seq;
    }

    /// OR `flag` into the header flags.
    pub fn add_flag(&mut self, flag: u16) {
        self.flags |= flag;
    }

    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    pub fn as_generic(&self) -> Option<&GenericMessage> {
        match &self.payload {
            MessagePayload::Generic(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_generic_mut(&mut self) -> Option<&mut GenericMessage> {
        match &mut self.payload {
            MessagePayload::Generic(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_error_ack(&self) -> Option<&ErrorAckMessage> {
        match &self.payload {
            MessagePayload::ErrorAck(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is the Done marker of a multipart reply.
    pub fn is_done(&self) -> bool {
        matches!(self.payload, MessagePayload::Done)
    }

    /// Check if more parts of the same reply follow.
    pub fn is_multi(&self) -> bool {
        self.flags & NLM_F_MULTI != 0
    }

    /// Check if this is a dump request.
    pub fn is_dump_request(&self) -> bool {
        self.flags & NLM_F_DUMP != 0
    }

    /// Encode with `seq` and `pid`. `NLM_F_REQUEST` is always set.
    ///
    /// Fails when an attribute in a generic payload is too long to encode.
    pub fn encode(&self, seq: u32, pid: u32) -> Result<Vec<u8>> {
        let builder = MessageBuilder::new(self.message_type, self.flags | NLM_F_REQUEST)
            .with_sequence(seq)
            .with_port(pid);
        let builder = match &self.payload {
            MessagePayload::Generic(g) => builder
                .push(GenlMsgHdr::new(g.command, g.family.version()).as_bytes())
                .push(&g.attributes.encode()?),
            MessagePayload::ErrorAck(e) => {
                let mut offending = NlMsgHdr::new(0, 0);
                offending.nlmsg_seq = seq;
                let error = NlMsgError {
                    error: e.error.wrapping_neg(),
                    msg: offending,
                };
                builder.push(<NlMsgError as IntoBytes>::as_bytes(&error))
            }
            MessagePayload::Done => builder.push(&0i32.to_ne_bytes()),
            MessagePayload::Noop | MessagePayload::Overrun => builder,
            MessagePayload::Unknown(bytes) => builder.push(bytes),
        };
        Ok(builder.build())
    }

    /// Decode an Error/Ack. The wire carries `-errno`.
    pub fn decode_error_ack(packet: &mut NetlinkPacket<'_>, _: &MessageContext) -> Result<Self> {
        let code = packet.consume(4)?;
        let code = i32::from_ne_bytes([code[0], code[1], code[2], code[3]]);
        // The offending header and any extended ack attributes follow; the
        // sequence number already identifies the request.
        packet.consume(packet.remaining_bytes())?;
        Ok(Self::from_packet(
            packet,
            MessagePayload::ErrorAck(ErrorAckMessage::new(code.wrapping_neg())),
        ))
    }

    /// Decode a Done marker. A trailing status word is ignored.
    pub fn decode_done(packet: &mut NetlinkPacket<'_>, _: &MessageContext) -> Result<Self> {
        packet.consume(packet.remaining_bytes())?;
        Ok(Self::from_packet(packet, MessagePayload::Done))
    }

    pub fn decode_noop(packet: &mut NetlinkPacket<'_>, _: &MessageContext) -> Result<Self> {
        Ok(Self::from_packet(packet, MessagePayload::Noop))
    }

    pub fn decode_overrun(packet: &mut NetlinkPacket<'_>, _: &MessageContext) -> Result<Self> {
        Ok(Self::from_packet(packet, MessagePayload::Overrun))
    }
}

impl fmt::Display for NetlinkMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            MessagePayload::ErrorAck(e) if e.is_ack() => {
                write!(f, "ACK (seq {})", self.sequence_number)
            }
            MessagePayload::ErrorAck(e) => write!(
                f,
                "ERROR {}: {} (seq {})",
                e.error,
                e.error_string(),
                self.sequence_number
            ),
            MessagePayload::Noop => write!(f, "NOOP (seq {})", self.sequence_number),
            MessagePayload::Done => write!(f, "DONE (seq {})", self.sequence_number),
            MessagePayload::Overrun => write!(f, "OVERRUN (seq {})", self.sequence_number),
            MessagePayload::Generic(g) => {
                writeln!(
                    f,
                    "{} {} (type {}, flags {:#06x}, seq {})",
                    g.family.name(),
                    g.command_name(),
                    self.message_type,
                    self.flags,
                    self.sequence_number
                )?;
                write!(f, "{}", g.attributes)
            }
            MessagePayload::Unknown(bytes) => write!(
                f,
                "UNKNOWN type {} ({} bytes, seq {})",
                self.message_type,
                bytes.len(),
                self.sequence_number
            ),
        }
    }
}
