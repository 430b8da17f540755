//! # shmtensor
//!
//! Typed tensor buffers backed by shared memory files.
//!
//! Buffers live either in an anonymous region (an unlinked temporary file,
//! placed in `/dev/shm` when it has room) or in a named file on disk. Both are
//! mapped shared, so the storage can be handed to another process without
//! copying: anonymous regions by duplicating their file descriptor, named
//! files by path.
//!
//! ## Features
//!
//! - **Anonymous regions**: unlinked on creation, released on drop
//! - **Fast-directory preference**: tmpfs when it has space, temp dir otherwise
//! - **Typed views**: f16/bf16/f32/f64, fixed-width integers and bool
//! - **Descriptor passing**: `SCM_RIGHTS` over Unix sockets
//! - **rkyv serialization**: buffer descriptors validated at the boundary
//!
//! ## Quick Start
//!
//! ```rust
//! use shmtensor::prelude::*;
//!
//! let mut weights = tensor::zeros([2, 3], DType::F32, &BufferOptions::default())?;
//! weights.set(&[1, 2], 0.5f32)?;
//!
//! let handle = weights.share()?;
//! let peer = TypedBuffer::from_shared(handle)?;
//! assert_eq!(peer.get::<f32>(&[1, 2])?, 0.5);
//! # Ok::<(), shmtensor::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod memory;
pub mod tensor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::memory::{AnonymousRegion, MemoryRegion, MemoryType, StorageConfig};
    pub use crate::tensor::{
        self, BufferOptions, DType, Device, Element, HostTensor, Shape, TensorSource, TypedBuffer,
    };
}

pub use error::{Error, ErrorKind, Result};
