//! Contains the crate-wide error type

use core::fmt;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A failed SDDL decode, pointing at the offending character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SddlDecodeError {
    pub message: String,

    /// Byte offset into the SDDL string
    pub offset: usize,
}

impl SddlDecodeError {
    #[inline]
    pub fn new( message: impl Into<String>, offset: usize ) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for SddlDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for SddlDecodeError {}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("buffer is truncated")]
    Truncated,

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unknown conditional ACE opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    #[error("invalid SID")]
    InvalidSid,

    #[error("alias {0} requires a domain SID")]
    DomainSidRequired(String),

    #[error("SDDL decode failed: {0}")]
    Sddl(SddlDecodeError),

    #[error("cannot encode: {0}")]
    Encode(String),
}

/// Error returned by every fallible operation of this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub fn new( kind: ErrorKind ) -> Self {
        Self { kind }
    }

    #[inline]
    pub fn kind( &self ) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn into_kind( self ) -> ErrorKind {
        self.kind
    }

    //

    #[inline]
    pub(crate) fn truncated() -> Self {
        Self::new(ErrorKind::Truncated)
    }

    #[inline]
    pub(crate) fn invalid( message: impl Into<String> ) -> Self {
        Self::new(ErrorKind::InvalidData(message.into()))
    }

    #[inline]
    pub(crate) fn limit( what: &'static str ) -> Self {
        Self::new(ErrorKind::LimitExceeded(what))
    }

    #[inline]
    pub(crate) fn encode( message: impl Into<String> ) -> Self {
        Self::new(ErrorKind::Encode(message.into()))
    }
}

impl From<ErrorKind> for Error {
    fn from( kind: ErrorKind ) -> Self {
        Self::new(kind)
    }
}

impl From<SddlDecodeError> for Error {
    fn from( err: SddlDecodeError ) -> Self {
        Self::new(ErrorKind::Sddl(err))
    }
}

pub type Result<T> = core::result::Result<T, Error>;
