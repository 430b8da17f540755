//! Error types for shmtensor.

use crate::tensor::{DType, Device, Layout};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using shmtensor's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
///
/// None of these are retried internally. Configuration, usage and conflict
/// errors require the caller to change its arguments; I/O errors usually
/// reflect resource exhaustion that a retry would not fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request asks for something this store cannot provide
    /// (non-CPU device, complex dtype, sparse layout, pinned memory).
    Config,
    /// A system call on the backing file or mapping failed.
    Io,
    /// The call is not valid for the value it was made on.
    Usage,
    /// The request would create a second file claiming the same tensor.
    Conflict,
}

/// Main error type for shmtensor operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A device other than the CPU was requested.
    #[error("unsupported device {0}: only cpu buffers can be memory-mapped")]
    UnsupportedDevice(Device),

    /// Complex-valued element types cannot be memory-mapped.
    #[error("unsupported dtype {0}: complex-valued buffers are not supported")]
    UnsupportedDType(DType),

    /// Only dense strided layouts are supported.
    #[error("unsupported layout {0:?}: only dense strided buffers are supported")]
    UnsupportedLayout(Layout),

    /// Pinned host memory was requested.
    #[error("pinned memory is not supported for memory-mapped buffers")]
    PinnedMemory,

    /// The requested shape does not fit in the address space.
    #[error("buffer of shape {shape:?} with dtype {dtype} overflows usize")]
    SizeOverflow {
        /// Requested dimensions.
        shape: Vec<usize>,
        /// Requested element type.
        dtype: DType,
    },

    /// Memory allocation or mapping failed.
    #[error("memory allocation failed: {0}")]
    AllocationFailed(String),

    /// The region has no locally open descriptor and cannot be serialized.
    #[error("region has no open file descriptor and cannot be serialized")]
    NoDescriptor,

    /// Typed access with an element type that differs from the buffer's.
    #[error("dtype mismatch: buffer holds {actual}, requested {expected}")]
    DTypeMismatch {
        /// The dtype the caller asked for.
        expected: DType,
        /// The dtype the buffer holds.
        actual: DType,
    },

    /// Shapes of two buffers (or a buffer and an index) disagree.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected dimensions.
        expected: Vec<usize>,
        /// Actual dimensions.
        actual: Vec<usize>,
    },

    /// A handle or descriptor received from elsewhere is malformed.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// Raw bytes cannot be viewed as the requested element type.
    #[error("invalid element bytes: {0}")]
    InvalidBytes(String),

    /// A device string could not be parsed.
    #[error("invalid device string: {0:?}")]
    InvalidDevice(String),

    /// A target file already exists or the source is already file backed.
    #[error("file conflict at {}: {reason}", path.display())]
    FileConflict {
        /// The file in question.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// System call error (via rustix).
    #[error("system error: {0}")]
    System(#[from] rustix::io::Errno),
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedDevice(_)
            | Error::UnsupportedDType(_)
            | Error::UnsupportedLayout(_)
            | Error::PinnedMemory
            | Error::SizeOverflow { .. } => ErrorKind::Config,
            Error::AllocationFailed(_) | Error::Io(_) | Error::System(_) => ErrorKind::Io,
            Error::NoDescriptor
            | Error::DTypeMismatch { .. }
            | Error::ShapeMismatch { .. }
            | Error::InvalidHandle(_)
            | Error::InvalidBytes(_)
            | Error::InvalidDevice(_) => ErrorKind::Usage,
            Error::FileConflict { .. } => ErrorKind::Conflict,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::Config`.
    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}
