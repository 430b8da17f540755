//! Memory-mapped named file region.
//!
//! This is the nameable counterpart of [`AnonymousRegion`](super::AnonymousRegion):
//! the storage is a regular file whose bytes are exactly the buffer contents,
//! so it persists after the process exits and can be re-opened later by path.
//!
//! # Example
//!
//! ```rust
//! use shmtensor::memory::{MappedFileRegion, MemoryRegion, ResizePolicy};
//!
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("buffer.bin");
//!
//! let mut region = MappedFileRegion::open_or_create(&path, 1024, ResizePolicy::GrowOnly)?;
//! region.as_mut_bytes()[..5].copy_from_slice(b"hello");
//! region.sync()?;
//! drop(region);
//!
//! let region = MappedFileRegion::open(&path)?;
//! assert_eq!(&region.as_bytes()[..5], b"hello");
//! # Ok::<(), shmtensor::Error>(())
//! ```

use super::region::{self, MemoryRegion, MemoryType};
use crate::error::{Error, Result};
use rustix::fd::OwnedFd;
use rustix::fs::{Mode, OFlags};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::{debug, warn};

/// What to do when an existing file does not have the requested size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizePolicy {
    /// Extend a shorter file; refuse to shrink a longer one.
    ///
    /// Shrinking would silently discard the tail of whatever the file held.
    #[default]
    GrowOnly,
    /// Truncate or extend the file to exactly the requested size.
    Exact,
}

/// A shared read/write mapping of a named file.
pub struct MappedFileRegion {
    /// File descriptor.
    fd: OwnedFd,
    /// Pointer to the mmap'd region.
    ptr: NonNull<u8>,
    /// Size of the region.
    len: usize,
    /// Path to the file.
    path: PathBuf,
}

impl MappedFileRegion {
    /// Create a new file (or truncate an existing one) of `size` bytes and map it.
    ///
    /// # Errors
    ///
    /// Returns an error if file creation, truncation, or mapping fails.
    pub fn create<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let fd = rustix::fs::open(
            path,
            OFlags::RDWR | OFlags::CREATE | OFlags::TRUNC | OFlags::CLOEXEC,
            super::defaults::NAMED_FILE_MODE,
        )?;
        rustix::fs::ftruncate(&fd, size as u64)?;
        Self::map(fd, size, path)
    }

    /// Open an existing file and map all of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist or mapping fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fd = rustix::fs::open(path, OFlags::RDWR | OFlags::CLOEXEC, Mode::empty())?;
        let size = file_len(&fd)?;
        Self::map(fd, size, path)
    }

    /// Open `path`, creating it if needed, and map exactly `size` bytes.
    ///
    /// Existing contents are preserved. A new or shorter file is extended
    /// with zeros. A longer file is handled per `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileConflict`] if the file is longer than `size` and
    /// `policy` is [`ResizePolicy::GrowOnly`].
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        size: usize,
        policy: ResizePolicy,
    ) -> Result<Self> {
        let path = path.as_ref();
        let fd = rustix::fs::open(
            path,
            OFlags::RDWR | OFlags::CREATE | OFlags::CLOEXEC,
            super::defaults::NAMED_FILE_MODE,
        )?;

        let existing = file_len(&fd)?;
        if existing > size && policy == ResizePolicy::GrowOnly {
            return Err(Error::FileConflict {
                path: path.to_path_buf(),
                reason: format!(
                    "file holds {existing} bytes but the buffer needs {size}; refusing to shrink"
                ),
            });
        }
        if existing != size {
            debug!(path = %path.display(), existing, size, "resizing backing file");
            rustix::fs::ftruncate(&fd, size as u64)?;
        }

        Self::map(fd, size, path)
    }

    fn map(fd: OwnedFd, size: usize, path: &Path) -> Result<Self> {
        let ptr = region::map_shared(&fd, size)?;
        debug!(path = %path.display(), size, "mapped named file");
        Ok(Self {
            fd,
            ptr,
            len: size,
            path: path.to_path_buf(),
        })
    }

    /// Sync changes to disk.
    ///
    /// This calls `msync` to ensure all modifications are written to the file.
    pub fn sync(&self) -> Result<()> {
        self.msync(rustix::mm::MsyncFlags::SYNC)
    }

    fn msync(&self, flags: rustix::mm::MsyncFlags) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        unsafe {
            rustix::mm::msync(self.ptr.as_ptr().cast(), self.len, flags)?;
        }
        Ok(())
    }

    /// Get the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file descriptor.
    pub fn fd(&self) -> rustix::fd::BorrowedFd<'_> {
        use rustix::fd::AsFd;
        self.fd.as_fd()
    }
}

fn file_len(fd: &OwnedFd) -> Result<usize> {
    let stat = rustix::fs::fstat(fd)?;
    usize::try_from(stat.st_size)
        .map_err(|_| Error::AllocationFailed(format!("file size {} out of range", stat.st_size)))
}

impl MemoryRegion for MappedFileRegion {
    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_type(&self) -> MemoryType {
        MemoryType::MappedFile
    }

    fn as_mut_bytes(&mut self) -> &mut [u8] {
        // SAFETY: exclusive borrow of the region; the mapping is `len` bytes.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for MappedFileRegion {
    fn drop(&mut self) {
        // Sync before unmapping to ensure data is persisted
        if let Err(err) = self.sync() {
            warn!(path = %self.path.display(), %err, "msync failed on drop");
        }
        region::unmap(self.ptr, self.len);
        // fd is automatically closed when OwnedFd is dropped
    }
}

impl std::fmt::Debug for MappedFileRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFileRegion")
            .field("path", &self.path)
            .field("len", &self.len)
            .finish()
    }
}

// SAFETY: file mappings can be accessed from any thread; mutation requires
// `&mut self`.
unsafe impl Send for MappedFileRegion {}
unsafe impl Sync for MappedFileRegion {}
