//! Constructors for [`TypedBuffer`]s backed by shared memory.
//!
//! Every constructor validates its options in the same order (device, dtype,
//! layout, pinning) before touching the filesystem, so a rejected request
//! never leaves a file behind.

use super::{Backing, DType, Device, Layout, Shape, TensorSource, TypedBuffer};
use crate::error::{Error, Result};
use crate::memory::{AnonymousRegion, MappedFileRegion, ResizePolicy, StorageConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options shared by the buffer constructors.
///
/// `device` and `layout` default to CPU and dense strided; the only values
/// accepted are those defaults. They are carried so that options coming from
/// elsewhere fail loudly instead of being silently ignored.
///
/// # Example
///
/// ```rust
/// use shmtensor::tensor::{self, BufferOptions, DType};
///
/// let dir = tempfile::tempdir()?;
/// let options = BufferOptions::default().path(dir.path().join("weights.bin"));
///
/// let buffer = tensor::ones([2, 2], DType::F16, &options)?;
/// assert_eq!(buffer.filename(), Some(dir.path().join("weights.bin").as_path()));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferOptions {
    /// Requested device. `None` means CPU.
    pub device: Option<Device>,
    /// Named file to map instead of an anonymous region.
    pub path: Option<PathBuf>,
    /// Requested layout. `None` means dense strided.
    pub layout: Option<Layout>,
    /// Request page-locked host memory.
    pub pin_memory: bool,
    /// Where anonymous regions are placed.
    pub storage: StorageConfig,
}

impl BufferOptions {
    /// Set the device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Back the buffer with the named file at `path`.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the layout.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Request pinned memory.
    pub fn pin_memory(mut self, pin: bool) -> Self {
        self.pin_memory = pin;
        self
    }

    /// Use `storage` for anonymous regions.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    fn validate(&self, dtype: DType) -> Result<()> {
        let device = self.device.unwrap_or_default();
        if !device.is_cpu() {
            return Err(Error::UnsupportedDevice(device));
        }
        if !dtype.is_supported() {
            return Err(Error::UnsupportedDType(dtype));
        }
        let layout = self.layout.unwrap_or_default();
        if !layout.is_dense() {
            return Err(Error::UnsupportedLayout(layout));
        }
        if self.pin_memory {
            return Err(Error::PinnedMemory);
        }
        Ok(())
    }
}

/// Create a buffer without initializing its contents.
///
/// Anonymous buffers start zeroed (fresh file pages), but callers must not
/// rely on that; a named file keeps whatever bytes it already held.
///
/// # Errors
///
/// Configuration errors for non-CPU devices, complex dtypes, sparse layouts
/// or pinned memory. [`Error::FileConflict`] if the named file is longer than
/// the buffer. I/O errors from creating or mapping the storage.
pub fn empty(shape: impl Into<Shape>, dtype: DType, options: &BufferOptions) -> Result<TypedBuffer> {
    let shape = shape.into();
    options.validate(dtype)?;
    let size = shape.byte_size(dtype)?;

    let backing = match &options.path {
        None => Backing::Anonymous(AnonymousRegion::with_config(size, &options.storage)?),
        Some(path) => Backing::File(MappedFileRegion::open_or_create(
            path,
            size,
            ResizePolicy::GrowOnly,
        )?),
    };

    debug!(%shape, %dtype, size, path = ?options.path, "created buffer");
    TypedBuffer::from_backing(shape, dtype, backing)
}

/// Create a buffer with every element set to zero.
pub fn zeros(shape: impl Into<Shape>, dtype: DType, options: &BufferOptions) -> Result<TypedBuffer> {
    let mut buffer = empty(shape, dtype, options)?;
    buffer.fill_zero();
    Ok(buffer)
}

/// Create a buffer with every element set to one (`true` for bool).
pub fn ones(shape: impl Into<Shape>, dtype: DType, options: &BufferOptions) -> Result<TypedBuffer> {
    let mut buffer = empty(shape, dtype, options)?;
    buffer.fill_one();
    Ok(buffer)
}

/// [`empty`] with the shape and dtype of `source`.
pub fn empty_like<S: TensorSource + ?Sized>(
    source: &S,
    options: &BufferOptions,
) -> Result<TypedBuffer> {
    empty(source.shape().clone(), source.dtype(), options)
}

/// [`zeros`] with the shape and dtype of `source`.
pub fn zeros_like<S: TensorSource + ?Sized>(
    source: &S,
    options: &BufferOptions,
) -> Result<TypedBuffer> {
    zeros(source.shape().clone(), source.dtype(), options)
}

/// [`ones`] with the shape and dtype of `source`.
pub fn ones_like<S: TensorSource + ?Sized>(
    source: &S,
    options: &BufferOptions,
) -> Result<TypedBuffer> {
    ones(source.shape().clone(), source.dtype(), options)
}

/// Copy `source` into new shared storage.
///
/// Without `path` the copy lives in an anonymous region. With `path` it is
/// written to that file; `allow_overwrite` lets an existing file of another
/// size be resized to fit.
///
/// # Errors
///
/// Returns [`Error::FileConflict`] if `path` is given, `allow_overwrite` is
/// false, and `source` is already backed by a named file. Returns a
/// configuration error if `source` is not on the CPU or has a complex dtype.
pub fn from_tensor<S: TensorSource + ?Sized>(
    source: &S,
    path: Option<&Path>,
    allow_overwrite: bool,
) -> Result<TypedBuffer> {
    if let (Some(path), Some(existing), false) = (path, source.filename(), allow_overwrite) {
        return Err(Error::FileConflict {
            path: path.to_path_buf(),
            reason: format!(
                "source is already backed by {}; pass allow_overwrite to copy it",
                existing.display()
            ),
        });
    }

    let dtype = source.dtype();
    let options = BufferOptions {
        device: Some(source.device()),
        ..BufferOptions::default()
    };
    options.validate(dtype)?;

    let mut buffer = match path {
        None => empty_like(source, &options)?,
        Some(path) => {
            let shape = source.shape().clone();
            let size = shape.byte_size(dtype)?;
            let policy = if allow_overwrite {
                ResizePolicy::Exact
            } else {
                ResizePolicy::GrowOnly
            };
            let region = MappedFileRegion::open_or_create(path, size, policy)?;
            TypedBuffer::from_backing(shape, dtype, Backing::File(region))?
        }
    };

    buffer.copy_from(source)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tensor::HostTensor;
    use std::fs;

    #[test]
    fn test_zeros_anonymous() {
        let buffer = zeros([4], DType::F32, &BufferOptions::default()).unwrap();
        assert_eq!(buffer.shape().dims(), &[4]);
        assert_eq!(buffer.dtype(), DType::F32);
        assert_eq!(buffer.nbytes(), 16);
        assert!(buffer.is_anonymous());
        assert_eq!(buffer.to_vec::<f32>().unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_ones_every_dtype() {
        for dtype in DType::ALL.into_iter().filter(|d| d.is_supported()) {
            let buffer = ones([3], dtype, &BufferOptions::default()).unwrap();
            let one = dtype.one_bytes();
            assert_eq!(buffer.nbytes(), 3 * one.len());
            assert!(buffer.as_bytes().chunks(one.len()).all(|chunk| chunk == one));
        }
    }

    #[test]
    fn test_empty_has_requested_size() {
        let buffer = empty([2, 3, 4], DType::I64, &BufferOptions::default()).unwrap();
        assert_eq!(buffer.numel(), 24);
        assert_eq!(buffer.nbytes(), 24 * 8);
    }

    #[test]
    fn test_zero_element_buffer() {
        let buffer = ones([0, 5], DType::F64, &BufferOptions::default()).unwrap();
        assert_eq!(buffer.nbytes(), 0);
        assert!(buffer.to_vec::<f64>().unwrap().is_empty());
    }

    #[test]
    fn test_scalar_buffer() {
        let buffer = ones(Shape::scalar(), DType::I32, &BufferOptions::default()).unwrap();
        assert_eq!(buffer.get::<i32>(&[]).unwrap(), 1);
    }

    #[test]
    fn test_rejects_non_cpu_device() {
        let options = BufferOptions::default().device(Device::Cuda(0));
        let err = empty([4], DType::F32, &options).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDevice(Device::Cuda(0))));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_rejects_complex_dtype() {
        for dtype in [DType::Complex64, DType::Complex128] {
            let err = zeros([4], dtype, &BufferOptions::default()).unwrap_err();
            assert!(matches!(err, Error::UnsupportedDType(_)));
        }
    }

    #[test]
    fn test_rejects_sparse_layout_and_pinning() {
        let sparse = BufferOptions::default().layout(Layout::SparseCsr);
        assert!(matches!(
            empty([4], DType::F32, &sparse),
            Err(Error::UnsupportedLayout(Layout::SparseCsr))
        ));

        let pinned = BufferOptions::default().pin_memory(true);
        assert!(matches!(
            empty([4], DType::F32, &pinned),
            Err(Error::PinnedMemory)
        ));
    }

    #[test]
    fn test_validation_order() {
        let options = BufferOptions::default()
            .device(Device::Mps)
            .layout(Layout::SparseCoo)
            .pin_memory(true);
        assert!(matches!(
            empty([1], DType::Complex64, &options),
            Err(Error::UnsupportedDevice(Device::Mps))
        ));

        let options = BufferOptions::default().layout(Layout::SparseCoo).pin_memory(true);
        assert!(matches!(
            empty([1], DType::Complex64, &options),
            Err(Error::UnsupportedDType(DType::Complex64))
        ));
    }

    #[test]
    fn test_rejected_request_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.bin");
        let options = BufferOptions::default().path(&path).pin_memory(true);

        assert!(zeros([4], DType::U8, &options).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_named_file_holds_raw_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ones.bin");
        let options = BufferOptions::default().path(&path);

        let buffer = ones([3], DType::I16, &options).unwrap();
        assert_eq!(buffer.filename(), Some(path.as_path()));
        assert!(!buffer.is_anonymous());
        drop(buffer);

        let expected: Vec<u8> = [1i16, 1, 1].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(fs::read(&path).unwrap(), expected);
    }

    #[test]
    fn test_named_file_reopened_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let options = BufferOptions::default().path(dir.path().join("persist.bin"));

        {
            let mut buffer = zeros([2], DType::U32, &options).unwrap();
            buffer.set(&[1], 42u32).unwrap();
        }

        let buffer = empty([2], DType::U32, &options).unwrap();
        assert_eq!(buffer.to_vec::<u32>().unwrap(), vec![0, 42]);
    }

    #[test]
    fn test_named_file_too_long_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.bin");
        fs::write(&path, [0u8; 64]).unwrap();

        let options = BufferOptions::default().path(&path);
        let err = empty([4], DType::F32, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_like_constructors() {
        let host = HostTensor::from_vec([2, 2], vec![5u8, 6, 7, 8]).unwrap();
        let options = BufferOptions::default();

        let zeros = zeros_like(&host, &options).unwrap();
        assert_eq!(zeros.shape(), host.shape());
        assert_eq!(zeros.to_vec::<u8>().unwrap(), vec![0; 4]);

        let ones = ones_like(&host, &options).unwrap();
        assert_eq!(ones.to_vec::<u8>().unwrap(), vec![1; 4]);

        let empty = empty_like(&ones, &options).unwrap();
        assert_eq!(empty.dtype(), DType::U8);
        assert_eq!(empty.nbytes(), 4);
    }

    #[test]
    fn test_from_tensor_anonymous_copy() {
        let host = HostTensor::from_vec([3], vec![1.5f64, -2.0, 3.25]).unwrap();
        let mut copy = from_tensor(&host, None, false).unwrap();
        assert!(copy.is_anonymous());
        assert_eq!(copy.to_vec::<f64>().unwrap(), vec![1.5, -2.0, 3.25]);

        copy.set(&[0], 0.0f64).unwrap();
        assert_eq!(host.to_vec::<f64>().unwrap()[0], 1.5);
    }

    #[test]
    fn test_from_tensor_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.bin");
        let host = HostTensor::from_vec([2], vec![true, false]).unwrap();

        let copy = from_tensor(&host, Some(path.as_path()), false).unwrap();
        assert_eq!(copy.filename(), Some(path.as_path()));
        drop(copy);
        assert_eq!(fs::read(&path).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_from_tensor_conflict_when_already_file_backed() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("x.bin");
        let source = ones([4], DType::F32, &BufferOptions::default().path(&source_path)).unwrap();

        let target = dir.path().join("y.bin");
        let err = from_tensor(&source, Some(target.as_path()), false).unwrap_err();
        assert!(matches!(err, Error::FileConflict { .. }));
        assert!(!target.exists());

        let copy = from_tensor(&source, Some(target.as_path()), true).unwrap();
        assert_eq!(copy.to_vec::<f32>().unwrap(), vec![1.0; 4]);
    }

    #[test]
    fn test_from_tensor_file_backed_without_path() {
        let dir = tempfile::tempdir().unwrap();
        let options = BufferOptions::default().path(dir.path().join("src.bin"));
        let source = ones([2], DType::U16, &options).unwrap();

        let copy = from_tensor(&source, None, false).unwrap();
        assert!(copy.is_anonymous());
        assert_eq!(copy.to_vec::<u16>().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_from_tensor_overwrite_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resize.bin");
        fs::write(&path, [9u8; 100]).unwrap();

        let host = HostTensor::from_vec([2], vec![3u8, 4]).unwrap();
        assert!(from_tensor(&host, Some(path.as_path()), false).is_err());

        let copy = from_tensor(&host, Some(path.as_path()), true).unwrap();
        drop(copy);
        assert_eq!(fs::read(&path).unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_from_tensor_rejects_non_cpu_source() {
        let host = HostTensor::from_vec([1], vec![0u8])
            .unwrap()
            .with_device(Device::Meta);
        assert!(matches!(
            from_tensor(&host, None, false),
            Err(Error::UnsupportedDevice(Device::Meta))
        ));
    }
}
