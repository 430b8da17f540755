//! Memory regions backing shmtensor buffers.
//!
//! This module provides the storage layer: fixed-size shared mappings that
//! typed buffers are viewed over.
//!
//! # Architecture
//!
//! - [`MemoryRegion`]: Trait for mapped storage (anonymous or named file)
//! - [`AnonymousRegion`]: Unlinked temp file, shareable by fd duplication
//! - [`MappedFileRegion`]: Named file, shareable by path, persistent
//! - [`StorageConfig`]: Where anonymous backing files are created
//! - [`ipc`]: `SCM_RIGHTS` transport of region descriptors
//!
//! # Example
//!
//! ```rust
//! use shmtensor::memory::{AnonymousRegion, MemoryRegion};
//!
//! let mut region = AnonymousRegion::new(64 * 1024)?;
//! region.as_mut_bytes()[..5].copy_from_slice(b"hello");
//! assert_eq!(&region.as_bytes()[..5], b"hello");
//! # Ok::<(), shmtensor::Error>(())
//! ```

mod anonymous;
mod config;
pub mod defaults;
mod dirs;
pub mod ipc;
mod mapped_file;
mod region;

pub use anonymous::{AnonymousRegion, RegionHandle};
pub use config::StorageConfig;
pub use dirs::{Platform, available_space, choose_dir, preferred_fast_directories};
pub use mapped_file::{MappedFileRegion, ResizePolicy};
pub use region::{MemoryRegion, MemoryType};
