//! Default constants for backing-file creation.
//!
//! # Usage
//!
//! ```rust
//! use shmtensor::memory::defaults;
//!
//! assert_eq!(defaults::LINUX_FAST_DIR, "/dev/shm");
//! ```

use rustix::fs::Mode;

// =============================================================================
// Directories
// =============================================================================

/// tmpfs mount present on virtually every Linux system.
pub const LINUX_FAST_DIR: &str = "/dev/shm";

/// Environment variable overriding the fallback temporary directory.
///
/// Only consulted by [`StorageConfig::from_env`](super::StorageConfig::from_env).
/// Without it the fallback is [`std::env::temp_dir`], which honours `TMPDIR`.
pub const TMPDIR_ENV: &str = "SHMTENSOR_TMPDIR";

// =============================================================================
// File naming and permissions
// =============================================================================

/// Prefix for anonymous backing files, followed by the process id.
///
/// The name only exists between creation and unlink, but a recognisable prefix
/// makes leftovers from a crash in that window easy to attribute.
pub const TEMP_FILE_PREFIX: &str = "shmt";

/// Permission bits for named backing files created by the factory (`0o644`).
pub const NAMED_FILE_MODE: Mode = Mode::RUSR
    .union(Mode::WUSR)
    .union(Mode::RGRP)
    .union(Mode::ROTH);

// =============================================================================
// Misc
// =============================================================================

/// Size of the fixed-length prefix framing a serialized buffer descriptor.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Upper bound on a serialized buffer descriptor.
///
/// Descriptors hold a handful of integers and the dims; anything larger is
/// treated as a malformed message.
pub const MAX_DESCRIPTOR_LEN: usize = 4096;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_plain() {
        assert!(!TEMP_FILE_PREFIX.contains('/'));
        assert!(FRAME_PREFIX_LEN < MAX_DESCRIPTOR_LEN);
    }

    #[test]
    fn test_named_file_mode_bits() {
        assert_eq!(NAMED_FILE_MODE.bits() as u32, 0o644);
    }
}
