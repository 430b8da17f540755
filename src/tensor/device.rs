//! Device placement and memory layout.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Where a buffer lives.
///
/// Only [`Device::Cpu`] can back a memory-mapped buffer; the other variants
/// exist so callers can pass through whatever device their tensors carry and
/// get a clear configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// Host memory.
    #[default]
    Cpu,
    /// CUDA device with the given ordinal.
    Cuda(usize),
    /// Apple Metal.
    Mps,
    /// Shape-only placeholder device with no storage.
    Meta,
}

impl Device {
    /// Returns true for host memory.
    pub fn is_cpu(self) -> bool {
        self == Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(index) => write!(f, "cuda:{index}"),
            Device::Mps => f.write_str("mps"),
            Device::Meta => f.write_str("meta"),
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    /// Parses `"cpu"`, `"cuda"`, `"cuda:N"`, `"mps"` and `"meta"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidDevice(s.to_string());
        let (kind, index) = match s.split_once(':') {
            Some((kind, index)) => (kind, Some(index)),
            None => (s, None),
        };

        match (kind.trim().to_ascii_lowercase().as_str(), index) {
            ("cpu", None) => Ok(Device::Cpu),
            ("cuda", None) => Ok(Device::Cuda(0)),
            ("cuda", Some(index)) => index.trim().parse().map(Device::Cuda).map_err(|_| invalid()),
            ("mps", None) => Ok(Device::Mps),
            ("meta", None) => Ok(Device::Meta),
            _ => Err(invalid()),
        }
    }
}

/// Memory layout of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// Dense, contiguous, row-major.
    #[default]
    Strided,
    /// Sparse coordinate format.
    SparseCoo,
    /// Sparse compressed rows.
    SparseCsr,
}

impl Layout {
    /// Returns true for dense layouts.
    pub fn is_dense(self) -> bool {
        self == Layout::Strided
    }
}
