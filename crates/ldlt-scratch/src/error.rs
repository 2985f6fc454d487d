//! Scratch allocation error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur while planning, acquiring, or slicing scratch memory.
///
/// Every variant is a local, synchronous failure: when one is returned no
/// buffer has been constructed and nothing needs releasing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScratchError {
    /// The heap source could not satisfy the request.
    AllocationFailed {
        /// Number of bytes requested.
        bytes: usize,
        /// Alignment requested.
        align: usize,
    },
    /// A size computation (count × element size, padding, or a running
    /// offset) does not fit in `usize`.
    SizeOverflow {
        /// Which computation overflowed.
        what: &'static str,
    },
    /// A view would extend past the end of its buffer.
    OutOfBounds {
        /// Byte offset the view starts at.
        offset: usize,
        /// Byte length the view requires.
        len: usize,
        /// Byte length of the buffer.
        capacity: usize,
    },
    /// A view offset is not a multiple of the element alignment.
    Misaligned {
        /// Byte offset the view starts at.
        offset: usize,
        /// Required alignment.
        align: usize,
    },
    /// A column-major matrix stride is smaller than its row count.
    InvalidStride {
        /// Row count.
        rows: usize,
        /// Requested stride.
        stride: usize,
    },
    /// A [`ScratchConfig`](crate::ScratchConfig) value violates its invariants.
    InvalidConfig {
        /// Human-readable description of the violation.
        reason: String,
    },
    /// No buffer with this name is part of the workspace.
    UnknownBuffer {
        /// The unrecognised name.
        name: &'static str,
    },
    /// Two buffers in one layout share a name.
    DuplicateBuffer {
        /// The repeated name.
        name: &'static str,
    },
    /// A buffer was requested as a different element type than it was
    /// declared with.
    TypeMismatch {
        /// Buffer name.
        name: &'static str,
        /// Element type the buffer was declared with.
        expected: &'static str,
        /// Element type requested.
        actual: &'static str,
    },
    /// A vector buffer was requested as a matrix or vice versa.
    ShapeMismatch {
        /// Buffer name.
        name: &'static str,
    },
    /// A view of this buffer is already handed out.
    AlreadyBorrowed {
        /// Buffer name.
        name: &'static str,
    },
}

impl fmt::Display for ScratchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { bytes, align } => {
                write!(
                    f,
                    "allocation failed: {bytes} bytes aligned to {align}"
                )
            }
            Self::SizeOverflow { what } => {
                write!(f, "size computation overflowed: {what}")
            }
            Self::OutOfBounds {
                offset,
                len,
                capacity,
            } => {
                write!(
                    f,
                    "slice out of bounds: offset {offset} + {len} bytes exceeds capacity {capacity}"
                )
            }
            Self::Misaligned { offset, align } => {
                write!(f, "offset {offset} is not aligned to {align}")
            }
            Self::InvalidStride { rows, stride } => {
                write!(f, "stride {stride} is smaller than row count {rows}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid config: {reason}"),
            Self::UnknownBuffer { name } => write!(f, "unknown buffer '{name}'"),
            Self::DuplicateBuffer { name } => write!(f, "duplicate buffer '{name}'"),
            Self::TypeMismatch {
                name,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "buffer '{name}' holds {expected}, requested as {actual}"
                )
            }
            Self::ShapeMismatch { name } => {
                write!(f, "buffer '{name}' requested with the wrong shape")
            }
            Self::AlreadyBorrowed { name } => {
                write!(f, "buffer '{name}' is already borrowed")
            }
        }
    }
}

impl Error for ScratchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_buffer() {
        let err = ScratchError::TypeMismatch {
            name: "d",
            expected: "f64",
            actual: "f32",
        };
        assert_eq!(err.to_string(), "buffer 'd' holds f64, requested as f32");
    }

    #[test]
    fn display_out_of_bounds() {
        let err = ScratchError::OutOfBounds {
            offset: 64,
            len: 128,
            capacity: 128,
        };
        assert!(err.to_string().contains("offset 64"));
    }
}
