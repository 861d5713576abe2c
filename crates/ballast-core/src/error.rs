//! Error types for Ballast buffers.
//!
//! Allocation failures and precondition violations are both reported
//! through [`BufferError`]. Which one a caller sees depends on the entry
//! point: `try_*` operations return allocation failures, the plain forms
//! abort the process instead. Index and range violations are always
//! returned, never fatal.

use std::error::Error;
use std::fmt;

/// Errors that can occur during buffer operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferError {
    /// The allocator could not satisfy a request.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },
    /// The requested capacity does not fit in `usize` elements or bytes.
    CapacityOverflow,
    /// An element index past the live region.
    IndexOutOfBounds {
        /// The rejected index.
        index: usize,
        /// Length of the buffer at the time of the call.
        len: usize,
    },
    /// A `start..end` range that is reversed or runs past the live region.
    InvalidRange {
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Length of the buffer at the time of the call.
        len: usize,
    },
}

impl BufferError {
    /// Returns `true` for failures reported by the allocator or by
    /// capacity arithmetic, as opposed to caller precondition violations.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::CapacityOverflow)
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "allocator failed to provide {requested} bytes")
            }
            Self::CapacityOverflow => write!(f, "capacity overflow"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::InvalidRange { start, end, len } => {
                write!(f, "invalid range {start}..{end} for length {len}")
            }
        }
    }
}

impl Error for BufferError {}
