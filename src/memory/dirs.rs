//! Backing directory selection.
//!
//! Anonymous regions prefer a memory-backed filesystem (tmpfs) so that the
//! unlinked backing file never touches a disk. When no such directory exists,
//! or it lacks room for the request, the generic temporary directory is used.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::defaults;

/// Operating system family, as far as directory selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux (has `/dev/shm`).
    Linux,
    /// macOS.
    MacOs,
    /// Other BSDs.
    Bsd,
    /// Anything else.
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") || cfg!(target_os = "android") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(any(
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )) {
            Platform::Bsd
        } else {
            Platform::Other
        }
    }
}

/// Ordered list of memory-backed directories worth trying on `platform`.
///
/// Empty on platforms without a conventional tmpfs mount.
pub fn preferred_fast_directories(platform: Platform) -> Vec<PathBuf> {
    match platform {
        Platform::Linux => vec![PathBuf::from(defaults::LINUX_FAST_DIR)],
        Platform::MacOs | Platform::Bsd | Platform::Other => Vec::new(),
    }
}

/// Bytes available to unprivileged users in the filesystem holding `dir`.
pub fn available_space(dir: &Path) -> rustix::io::Result<u64> {
    let st = rustix::fs::statvfs(dir)?;
    Ok(st.f_bavail.saturating_mul(st.f_frsize))
}

/// Pick the first of `candidates` with at least `size` free bytes.
///
/// Candidates that cannot be queried (missing, permission denied) are skipped.
/// Returns `fallback` when none qualifies.
pub fn choose_dir(candidates: &[PathBuf], fallback: &Path, size: usize) -> PathBuf {
    for dir in candidates {
        match available_space(dir) {
            Ok(avail) if avail >= size as u64 => {
                debug!(dir = %dir.display(), avail, size, "using fast backing directory");
                return dir.clone();
            }
            Ok(avail) => {
                debug!(dir = %dir.display(), avail, size, "fast directory too small");
            }
            Err(err) => {
                debug!(dir = %dir.display(), %err, "fast directory unavailable");
            }
        }
    }

    debug!(dir = %fallback.display(), size, "falling back to temp directory");
    fallback.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_prefers_dev_shm() {
        let dirs = preferred_fast_directories(Platform::Linux);
        assert_eq!(dirs, vec![PathBuf::from("/dev/shm")]);
    }

    #[test]
    fn test_other_platforms_have_no_fast_dirs() {
        assert!(preferred_fast_directories(Platform::MacOs).is_empty());
        assert!(preferred_fast_directories(Platform::Bsd).is_empty());
        assert!(preferred_fast_directories(Platform::Other).is_empty());
    }

    #[test]
    fn test_choose_dir_uses_candidate_with_space() {
        let candidate = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();

        let chosen = choose_dir(
            &[candidate.path().to_path_buf()],
            fallback.path(),
            0,
        );
        assert_eq!(chosen, candidate.path());
    }

    #[test]
    fn test_choose_dir_falls_back_when_too_small() {
        let candidate = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();

        let chosen = choose_dir(
            &[candidate.path().to_path_buf()],
            fallback.path(),
            usize::MAX,
        );
        assert_eq!(chosen, fallback.path());
    }

    #[test]
    fn test_choose_dir_skips_missing_candidates() {
        let fallback = tempfile::tempdir().unwrap();
        let missing = fallback.path().join("does-not-exist");

        let chosen = choose_dir(&[missing], fallback.path(), 1);
        assert_eq!(chosen, fallback.path());
    }

    #[test]
    fn test_available_space_reports_something() {
        let dir = tempfile::tempdir().unwrap();
        assert!(available_space(dir.path()).is_ok());
    }
}
