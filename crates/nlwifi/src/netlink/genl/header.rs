//! The 4-byte generic netlink header.
//!
//! It sits between the netlink header (whose type field holds the family id)
//! and the attribute stream: one command byte, one version byte and two
//! reserved bytes.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::netlink::error::{Error, Result};

/// `struct genlmsghdr`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GenlMsgHdr {
    pub cmd: u8,
    pub version: u8,
    pub reserved: u16,
}

pub const GENL_HDRLEN: usize = std::mem::size_of::<GenlMsgHdr>();

impl GenlMsgHdr {
    #[inline]
    pub const fn new(cmd: u8, version: u8) -> Self {
        Self {
            cmd,
            version,
            reserved: 0,
        }
    }

    /// Read the header at the start of a message body.
    pub fn from_bytes(body: &[u8]) -> Result<Self> {
        match Self::read_from_prefix(body) {
            Ok((header, _)) => Ok(header),
            Err(_) => Err(Error::Truncated {
                expected: GENL_HDRLEN,
                actual: body.len(),
            }),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }
}
