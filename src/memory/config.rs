//! Storage configuration for anonymous regions.

use std::path::PathBuf;

use super::defaults;
use super::dirs::{self, Platform};

/// Where and how anonymous backing files are created.
///
/// The default tries the platform's fast directories (see
/// [`preferred_fast_directories`](super::preferred_fast_directories)) and
/// falls back to [`std::env::temp_dir`].
///
/// # Example
///
/// ```rust
/// use shmtensor::memory::StorageConfig;
///
/// let config = StorageConfig::default()
///     .without_fast_dirs()
///     .temp_dir(std::env::temp_dir());
/// assert!(config.fast_dirs_list().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    fast_dirs: Vec<PathBuf>,
    temp_dir: Option<PathBuf>,
    prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            fast_dirs: dirs::preferred_fast_directories(Platform::current()),
            temp_dir: None,
            prefix: defaults::TEMP_FILE_PREFIX.to_string(),
        }
    }
}

impl StorageConfig {
    /// Default configuration, with the fallback directory taken from
    /// `SHMTENSOR_TMPDIR` when that variable is set and non-empty.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(defaults::TMPDIR_ENV) {
            Some(dir) if !dir.is_empty() => config.temp_dir(dir),
            _ => config,
        }
    }

    /// Replace the list of fast directories.
    pub fn fast_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.fast_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Never use a fast directory.
    pub fn without_fast_dirs(mut self) -> Self {
        self.fast_dirs.clear();
        self
    }

    /// Override the fallback temporary directory.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Override the backing file name prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Fast directories tried in order.
    pub fn fast_dirs_list(&self) -> &[PathBuf] {
        &self.fast_dirs
    }

    /// Fallback directory used when no fast directory qualifies.
    pub fn fallback_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Name prefix for a backing file created by this process.
    pub fn file_prefix(&self) -> String {
        format!("{}-{}-", self.prefix, std::process::id())
    }

    /// Directory that should hold a backing file of `size` bytes.
    pub fn choose_dir(&self, size: usize) -> PathBuf {
        dirs::choose_dir(&self.fast_dirs, &self.fallback_dir(), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_platform() {
        let config = StorageConfig::default();
        assert_eq!(
            config.fast_dirs_list(),
            dirs::preferred_fast_directories(Platform::current()).as_slice()
        );
        assert_eq!(config.fallback_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_builder_overrides() {
        let config = StorageConfig::default()
            .fast_dirs(["/nonexistent/fast"])
            .temp_dir("/var/tmp")
            .prefix("test");

        assert_eq!(config.fast_dirs_list(), &[PathBuf::from("/nonexistent/fast")]);
        assert_eq!(config.fallback_dir(), PathBuf::from("/var/tmp"));
        assert!(config.file_prefix().starts_with("test-"));
        assert!(config.file_prefix().contains(&std::process::id().to_string()));
    }

    #[test]
    fn test_choose_dir_without_fast_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::default()
            .without_fast_dirs()
            .temp_dir(dir.path());

        assert_eq!(config.choose_dir(4096), dir.path());
    }
}
