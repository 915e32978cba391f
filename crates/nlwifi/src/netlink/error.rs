//! Crate-wide error type.

use std::io;

use super::attribute::AttributeKind;

/// `Result` with [`Error`] as the error.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between the codec, the manager and the socket.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An Error/Ack carrying a nonzero errno.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The (positive) errno value from the kernel.
        errno: i32,
        /// `strerror` text.
        message: String,
    },

    /// Message or header was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected length.
        expected: usize,
        /// Actual bytes available.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Attribute payload does not match its kind.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// TLV header declares a length that cannot be honoured.
    #[error("malformed attribute at offset {offset}: declared length {length}")]
    MalformedAttribute {
        /// Offset of the attribute header in the decoded buffer.
        offset: usize,
        /// Length declared by the header.
        length: usize,
    },

    /// No attribute with this id in the list.
    #[error("attribute {id} not found")]
    AttributeNotFound {
        /// Attribute id.
        id: u16,
    },

    /// An attribute with this id is already in the list.
    #[error("attribute {id} already exists")]
    AttributeExists {
        /// Attribute id.
        id: u16,
    },

    /// Accessor used against an attribute of another kind.
    #[error("attribute {id} is {actual}, not {expected}")]
    WrongAttributeKind {
        /// Attribute id.
        id: u16,
        /// Kind the caller asked for.
        expected: AttributeKind,
        /// Kind the attribute was created with.
        actual: AttributeKind,
    },

    /// Attribute exists but was never given a value.
    #[error("attribute {id} has no value")]
    AttributeNoValue {
        /// Attribute id.
        id: u16,
    },

    /// Family could not be resolved through the control family.
    #[error("generic netlink family not found: {name}")]
    FamilyNotFound {
        /// Family name.
        name: String,
    },

    /// Family does not advertise the requested multicast group.
    #[error("multicast group {group} not found in family {family}")]
    GroupNotFound {
        /// Family name.
        family: String,
        /// Group name.
        group: String,
    },

    /// Operation not supported.
    #[error("operation not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Create a kernel error from a negative errno value as carried on the wire.
    pub fn from_errno(errno: i32) -> Self {
        let errno = errno.wrapping_neg();
        let message = io::Error::from_raw_os_error(errno).to_string();
        Self::Kernel { errno, message }
    }

    /// True for EBUSY, which the manager and scan sessions retry.
    pub fn is_busy(&self) -> bool {
        self.errno() == Some(libc::EBUSY)
    }

    /// Check if the transport had nothing to deliver.
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::WouldBlock)
    }

    /// Positive errno of a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
