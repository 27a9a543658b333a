//! Error handling module for the NSS helper bridge
//!
//! Every failure a lookup can hit is one of the variants below. The types are
//! `Copy` and carry no heap data so they can be built on the lookup path and
//! handed across the C boundary as a status/errno pair.

use nix::libc::{self, c_int};
use thiserror::Error;

use crate::types::{NssStatus, RecordKind};

/// Main error type for a single lookup
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NssError {
    /// The helper reported that no such entry exists (or printed nothing)
    #[error("no such entry")]
    NotFound,

    /// The helper asked the caller to retry later
    #[error("helper reported a transient failure")]
    TryAgain,

    /// The caller's buffer cannot hold the record; retry with more space
    #[error("output buffer too small")]
    BufferTooSmall,

    /// The helper could not be run or failed outright
    #[error("helper unavailable: {0}")]
    Unavailable(Unavailable),

    /// The helper replied with a line that does not describe a record
    #[error("malformed helper reply: {0}")]
    Malformed(#[from] MalformedReply),
}

/// Why the helper is considered unavailable
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// No usable exit status came back; the runner logs why
    #[error("helper could not answer")]
    HelperFailed,

    #[error("lookup key is not valid UTF-8")]
    InvalidKey,

    #[error("{0} entries cannot be looked up by id")]
    UnsupportedLookup(RecordKind),

    #[error("null pointer passed by caller")]
    NullArgument,

    #[error("lookup panicked")]
    Panicked,
}

/// Classification of a reply line that cannot be turned into a record
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReply {
    #[error("empty line")]
    Empty,

    #[error("reply is not valid UTF-8")]
    InvalidUtf8,

    #[error("{kind} line has {found} fields, at least {required} required")]
    TooFewFields {
        kind: RecordKind,
        found: usize,
        required: usize,
    },

    #[error("field `{0}` is not a valid number")]
    InvalidNumber(&'static str),
}

/// Raised by the buffer writer when the caller's region is exhausted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("buffer too small")]
pub struct BufferTooSmall;

/// Result type alias for lookups
pub type Result<T> = std::result::Result<T, NssError>;

impl From<BufferTooSmall> for NssError {
    fn from(_: BufferTooSmall) -> Self {
        Self::BufferTooSmall
    }
}

impl From<Unavailable> for NssError {
    fn from(reason: Unavailable) -> Self {
        Self::Unavailable(reason)
    }
}

impl NssError {
    /// Status reported to the resolver host
    pub fn status(&self) -> NssStatus {
        match self {
            Self::NotFound => NssStatus::NotFound,
            Self::TryAgain | Self::BufferTooSmall => NssStatus::TryAgain,
            Self::Unavailable(_) | Self::Malformed(_) => NssStatus::Unavail,
        }
    }

    /// Value stored through the host's `errnop`
    ///
    /// ERANGE tells glibc to grow the buffer and call again; EAGAIN marks a
    /// transient helper failure; ENOENT marks everything permanent.
    pub fn errno(&self) -> c_int {
        match self {
            Self::BufferTooSmall => libc::ERANGE,
            Self::TryAgain => libc::EAGAIN,
            Self::NotFound | Self::Unavailable(_) | Self::Malformed(_) => libc::ENOENT,
        }
    }

    /// Whether calling again can produce a different outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TryAgain | Self::BufferTooSmall)
    }
}
