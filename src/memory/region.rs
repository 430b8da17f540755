//! Memory region trait and types.

use std::ptr::NonNull;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::super::AnonymousRegion {}
    impl Sealed for super::super::MappedFileRegion {}
}

/// Type of storage backing a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryType {
    /// Unlinked temporary file, reachable only through open descriptors.
    ///
    /// Shareable with other processes by descriptor duplication.
    Anonymous,
    /// Named file on disk, shareable by path and persistent after exit.
    MappedFile,
}

impl MemoryType {
    /// Can this region be handed to another process as a descriptor?
    #[inline]
    pub fn supports_fd_passing(&self) -> bool {
        matches!(self, MemoryType::Anonymous)
    }

    /// Does the storage outlive every process that maps it?
    #[inline]
    pub fn is_persistent(&self) -> bool {
        matches!(self, MemoryType::MappedFile)
    }
}

/// Trait for mapped storage backends.
///
/// A region is a contiguous, byte-addressable, read/write shared mapping of
/// exactly [`len`](MemoryRegion::len) bytes. Writes are visible through every
/// other mapping of the same file, including mappings held by other processes;
/// this trait provides no synchronization with those peers.
///
/// # Bounds
///
/// The byte views are exactly `len` bytes long. Offset `len - 1` is the last
/// writable byte. Indexing at `len` panics (slice bounds check) and
/// `as_bytes().get(len)` is `None`; nothing in the safe API reaches past the
/// mapping.
///
/// The trait is sealed: the provided byte views trust `as_ptr` and `len`, so
/// only the region types in this crate implement it.
///
/// ```compile_fail
/// use shmtensor::memory::{MemoryRegion, MemoryType};
///
/// struct Unmapped;
///
/// impl MemoryRegion for Unmapped {
///     fn as_ptr(&self) -> *const u8 {
///         0x10 as *const u8
///     }
///     fn len(&self) -> usize {
///         64
///     }
///     fn memory_type(&self) -> MemoryType {
///         MemoryType::Anonymous
///     }
///     fn as_mut_bytes(&mut self) -> &mut [u8] {
///         &mut []
///     }
/// }
/// ```
pub trait MemoryRegion: Send + Sync + sealed::Sealed {
    /// Get a raw pointer to the start of this region.
    fn as_ptr(&self) -> *const u8;

    /// Total size of the region in bytes.
    fn len(&self) -> usize;

    /// Returns true if the region has zero length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The type of storage backing this region.
    fn memory_type(&self) -> MemoryType;

    /// Get the region as a byte slice.
    ///
    /// Other processes mapping the same storage may write concurrently; the
    /// caller is responsible for any cross-process coordination.
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: the mapping is `len` bytes and lives as long as `self`.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// Get the region as a mutable byte slice.
    fn as_mut_bytes(&mut self) -> &mut [u8];
}

/// Placeholder pointer for zero-length regions.
///
/// `mmap` rejects a length of zero, so empty regions keep no mapping. The
/// pointer is aligned for every supported element type.
pub(crate) fn empty_region_ptr() -> NonNull<u8> {
    NonNull::<u64>::dangling().cast()
}

/// Map `size` bytes of `fd` shared and writable.
///
/// Returns the placeholder pointer without mapping when `size` is zero.
pub(crate) fn map_shared<Fd: rustix::fd::AsFd>(
    fd: Fd,
    size: usize,
) -> crate::Result<NonNull<u8>> {
    use rustix::mm::{MapFlags, ProtFlags};

    if size == 0 {
        return Ok(empty_region_ptr());
    }

    // MAP_SHARED: every mapping of this file sees the same pages
    let ptr = unsafe {
        rustix::mm::mmap(
            std::ptr::null_mut(),
            size,
            ProtFlags::READ | ProtFlags::WRITE,
            MapFlags::SHARED,
            fd,
            0,
        )?
    };

    NonNull::new(ptr.cast::<u8>())
        .ok_or_else(|| crate::Error::AllocationFailed("mmap returned null".into()))
}

/// Undo [`map_shared`].
pub(crate) fn unmap(ptr: NonNull<u8>, size: usize) {
    if size == 0 {
        return;
    }
    // SAFETY: `ptr`/`size` came from a successful `map_shared`.
    unsafe {
        let _ = rustix::mm::munmap(ptr.as_ptr().cast(), size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_type_capabilities() {
        assert!(MemoryType::Anonymous.supports_fd_passing());
        assert!(!MemoryType::Anonymous.is_persistent());
        assert!(!MemoryType::MappedFile.supports_fd_passing());
        assert!(MemoryType::MappedFile.is_persistent());
    }

    #[test]
    fn test_empty_region_ptr_alignment() {
        let ptr = empty_region_ptr();
        assert_eq!(ptr.as_ptr() as usize % std::mem::align_of::<u64>(), 0);
    }
}
