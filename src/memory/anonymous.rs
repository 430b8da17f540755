//! Anonymous file-backed memory region.
//!
//! An [`AnonymousRegion`] is backed by a temporary file that is unlinked right
//! after creation: no path resolves to it, and only open descriptors keep the
//! storage alive. The file lives in a memory-backed directory (`/dev/shm` on
//! Linux) when that has room, and in the generic temporary directory otherwise.
//!
//! Regions are shared with other processes by duplicating the descriptor
//! ([`AnonymousRegion::serialize`]) and mapping the duplicate on the other side
//! ([`AnonymousRegion::deserialize`]). Both mappings address the same physical
//! pages.
//!
//! # Example
//!
//! ```rust
//! use shmtensor::memory::{AnonymousRegion, MemoryRegion};
//!
//! let mut region = AnonymousRegion::new(4096)?;
//! region.as_mut_bytes()[0] = 42;
//!
//! // Duplicate the descriptor, e.g. for sending to a worker process.
//! let handle = region.serialize()?;
//! let peer = AnonymousRegion::deserialize(handle)?;
//! assert_eq!(peer.as_bytes()[0], 42);
//! # Ok::<(), shmtensor::Error>(())
//! ```

use super::region::{self, MemoryRegion, MemoryType};
use super::StorageConfig;
use crate::error::{Error, Result};
use rustix::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::{debug, trace};

/// A shared read/write mapping of an unlinked temporary file.
///
/// The mapping and the descriptor are released together when the region is
/// dropped, on every exit path. The storage itself is reclaimed by the kernel
/// once no process holds a descriptor or mapping of it.
pub struct AnonymousRegion {
    /// Local descriptor, or `None` when the region was attached to a
    /// descriptor it does not keep.
    fd: Option<OwnedFd>,
    /// Start of the mapping.
    ptr: NonNull<u8>,
    /// Size in bytes, fixed at creation.
    len: usize,
    /// Directory the backing file was created in, if created locally.
    dir: Option<PathBuf>,
}

/// Serialized form of an [`AnonymousRegion`]: its size and a duplicated
/// descriptor.
///
/// The descriptor is owned; dropping an unused handle closes it without
/// affecting the region it was taken from.
#[derive(Debug)]
pub struct RegionHandle {
    size: usize,
    fd: OwnedFd,
}

impl RegionHandle {
    /// Build a handle from a descriptor received from elsewhere.
    pub fn new(size: usize, fd: OwnedFd) -> Self {
        Self { size, fd }
    }

    /// Size of the region in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The duplicated descriptor.
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    /// Split into size and descriptor.
    pub fn into_parts(self) -> (usize, OwnedFd) {
        (self.size, self.fd)
    }
}

impl AnonymousRegion {
    /// Create a region of `size` bytes with the default [`StorageConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created, unlinked,
    /// truncated or mapped.
    pub fn new(size: usize) -> Result<Self> {
        Self::with_config(size, &StorageConfig::default())
    }

    /// Create a region of `size` bytes, choosing the directory per `config`.
    pub fn with_config(size: usize, config: &StorageConfig) -> Result<Self> {
        let dir = config.choose_dir(size);
        let fd = create_unlinked(&dir, &config.file_prefix())?;

        rustix::fs::ftruncate(&fd, size as u64)?;
        let ptr = region::map_shared(&fd, size)?;

        debug!(size, dir = %dir.display(), "created anonymous region");

        Ok(Self {
            fd: Some(fd),
            ptr,
            len: size,
            dir: Some(dir),
        })
    }

    /// Map `size` bytes of an already open descriptor, keeping it.
    ///
    /// This is the receiving side of [`serialize`](Self::serialize). The
    /// descriptor is usually a duplicate, so closing it does not affect the
    /// sender's copy. The resulting region can itself be serialized again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if the file is smaller than `size`
    /// (pages past the end of file would fault on access), or an I/O error if
    /// mapping fails.
    pub fn from_fd(size: usize, fd: OwnedFd) -> Result<Self> {
        check_file_size(&fd, size)?;
        let ptr = region::map_shared(&fd, size)?;

        trace!(size, "attached anonymous region");

        Ok(Self {
            fd: Some(fd),
            ptr,
            len: size,
            dir: None,
        })
    }

    /// Map `size` bytes of a descriptor without keeping any descriptor.
    ///
    /// The mapping stays valid after the caller closes `fd`, but the region
    /// has no local descriptor and [`serialize`](Self::serialize) fails with
    /// [`Error::NoDescriptor`].
    pub fn from_fd_detached<Fd: AsFd>(size: usize, fd: Fd) -> Result<Self> {
        check_file_size(fd.as_fd(), size)?;
        let ptr = region::map_shared(fd.as_fd(), size)?;

        trace!(size, "attached detached anonymous region");

        Ok(Self {
            fd: None,
            ptr,
            len: size,
            dir: None,
        })
    }

    /// Rebuild a region from its serialized form.
    pub fn deserialize(handle: RegionHandle) -> Result<Self> {
        let (size, fd) = handle.into_parts();
        Self::from_fd(size, fd)
    }

    /// Duplicate the descriptor for transfer to another process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoDescriptor`] if the region holds no local descriptor.
    pub fn serialize(&self) -> Result<RegionHandle> {
        let fd = self.fd.as_ref().ok_or(Error::NoDescriptor)?;
        let dup = rustix::io::fcntl_dupfd_cloexec(fd, 0)?;
        Ok(RegionHandle {
            size: self.len,
            fd: dup,
        })
    }

    /// Map the same storage a second time.
    ///
    /// The clone shares physical pages with `self` and owns its own
    /// descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Self::deserialize(self.serialize()?)
    }

    /// The local descriptor, if any.
    pub fn fd(&self) -> Option<BorrowedFd<'_>> {
        self.fd.as_ref().map(|fd| fd.as_fd())
    }

    /// Whether this region can be serialized.
    pub fn has_descriptor(&self) -> bool {
        self.fd.is_some()
    }

    /// Directory the backing file was created in.
    ///
    /// `None` for regions attached to a received descriptor.
    pub fn directory(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

/// Create a uniquely named file in `dir` and remove its name immediately.
fn create_unlinked(dir: &Path, prefix: &str) -> Result<OwnedFd> {
    let named = tempfile::Builder::new().prefix(prefix).tempfile_in(dir)?;
    let (file, path) = named.into_parts();
    trace!(path = %path.display(), "unlinking backing file");
    path.close()?;
    Ok(OwnedFd::from(file))
}

fn check_file_size<Fd: AsFd>(fd: Fd, size: usize) -> Result<()> {
    let stat = rustix::fs::fstat(fd)?;
    let actual = u64::try_from(stat.st_size).unwrap_or(0);
    if actual < size as u64 {
        return Err(Error::InvalidHandle(format!(
            "descriptor refers to {actual} bytes, {size} requested"
        )));
    }
    Ok(())
}

impl MemoryRegion for AnonymousRegion {
    #[inline]
    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn memory_type(&self) -> MemoryType {
        MemoryType::Anonymous
    }

    #[inline]
    fn as_mut_bytes(&mut self) -> &mut [u8] {
        // SAFETY: exclusive borrow of the region; the mapping is `len` bytes.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AnonymousRegion {
    fn drop(&mut self) {
        region::unmap(self.ptr, self.len);
        trace!(size = self.len, "released anonymous region");
        // fd is closed when the OwnedFd drops
    }
}

impl std::fmt::Debug for AnonymousRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymousRegion")
            .field("len", &self.len)
            .field("fd", &self.fd)
            .field("dir", &self.dir)
            .finish()
    }
}

// SAFETY: the mapping is process-wide memory, not thread-local, and the fd is
// reference-counted by the kernel. Mutation requires `&mut self`.
unsafe impl Send for AnonymousRegion {}
unsafe impl Sync for AnonymousRegion {}
