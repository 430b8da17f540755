//! Typed, shaped views over mapped regions.

use super::{DType, Device, Element, Shape};
use crate::error::{Error, Result};
use crate::memory::{AnonymousRegion, MappedFileRegion, MemoryRegion, MemoryType, RegionHandle};
use std::path::Path;

/// Read access to an existing tensor, as consumed by the `*_like` and
/// [`from_tensor`](super::from_tensor) constructors.
///
/// The bytes must be the dense row-major element array in native endianness.
pub trait TensorSource {
    /// Logical dimensions.
    fn shape(&self) -> &Shape;

    /// Element type.
    fn dtype(&self) -> DType;

    /// Device the data lives on.
    fn device(&self) -> Device {
        Device::Cpu
    }

    /// Raw element bytes.
    fn as_bytes(&self) -> &[u8];

    /// Named file backing this tensor, if any.
    fn filename(&self) -> Option<&Path> {
        None
    }
}

/// Storage a [`TypedBuffer`] is viewed over.
#[derive(Debug)]
pub enum Backing {
    /// Unlinked temporary file, owned exclusively by the buffer.
    Anonymous(AnonymousRegion),
    /// Named file mapped shared.
    File(MappedFileRegion),
}

impl Backing {
    fn region(&self) -> &dyn MemoryRegion {
        match self {
            Backing::Anonymous(region) => region,
            Backing::File(region) => region,
        }
    }

    fn region_mut(&mut self) -> &mut dyn MemoryRegion {
        match self {
            Backing::Anonymous(region) => region,
            Backing::File(region) => region,
        }
    }

    /// Size of the backing storage in bytes.
    pub fn len(&self) -> usize {
        self.region().len()
    }

    /// Returns true if the backing storage holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of storage.
    pub fn memory_type(&self) -> MemoryType {
        self.region().memory_type()
    }
}

/// A shaped, typed buffer over a shared memory mapping.
///
/// No bytes are owned directly: the buffer reinterprets its backing region as
/// `shape.numel()` elements of `dtype`, row-major. Dropping the buffer
/// releases the mapping (and, for anonymous backing, the descriptor).
///
/// # Example
///
/// ```rust
/// use shmtensor::tensor::{self, BufferOptions, DType};
///
/// let mut buffer = tensor::zeros([4], DType::F32, &BufferOptions::default())?;
/// assert_eq!(buffer.nbytes(), 16);
///
/// buffer.set(&[2], 5.0f32)?;
/// assert_eq!(buffer.to_vec::<f32>()?, vec![0.0, 0.0, 5.0, 0.0]);
/// # Ok::<(), shmtensor::Error>(())
/// ```
#[derive(Debug)]
pub struct TypedBuffer {
    shape: Shape,
    dtype: DType,
    backing: Backing,
}

impl TypedBuffer {
    /// Wrap a backing region, checking that it holds exactly
    /// `shape.numel()` elements of `dtype`.
    pub fn from_backing(shape: Shape, dtype: DType, backing: Backing) -> Result<Self> {
        if dtype.is_complex() {
            return Err(Error::UnsupportedDType(dtype));
        }
        let needed = shape.byte_size(dtype)?;
        if needed != backing.len() {
            return Err(Error::InvalidHandle(format!(
                "{shape} x {dtype} needs {needed} bytes, backing holds {}",
                backing.len()
            )));
        }
        Ok(Self {
            shape,
            dtype,
            backing,
        })
    }

    /// Logical dimensions.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Always [`Device::Cpu`].
    pub fn device(&self) -> Device {
        Device::Cpu
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Number of bytes in the backing region.
    pub fn nbytes(&self) -> usize {
        self.backing.len()
    }

    /// The backing storage.
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Path of the backing file for file-backed buffers.
    pub fn filename(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(region) => Some(region.path()),
            Backing::Anonymous(_) => None,
        }
    }

    /// Whether the buffer lives in an anonymous region.
    pub fn is_anonymous(&self) -> bool {
        matches!(self.backing, Backing::Anonymous(_))
    }

    /// Raw element bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.backing.region().as_bytes()
    }

    /// Mutable raw element bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.backing.region_mut().as_mut_bytes()
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        Ok(())
    }

    /// Elements as a flat row-major slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DTypeMismatch`] if `T` does not match the buffer's dtype.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.check_dtype::<T>()?;
        T::from_bytes(self.as_bytes())
    }

    /// Elements as a flat mutable row-major slice.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        self.check_dtype::<T>()?;
        T::from_bytes_mut(self.as_mut_bytes())
    }

    /// Copy the elements out.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        Ok(self.as_slice::<T>()?.to_vec())
    }

    /// Read the element at a multi-dimensional index.
    pub fn get<T: Element>(&self, index: &[usize]) -> Result<T> {
        let offset = self.shape.offset_of(index)?;
        Ok(self.as_slice::<T>()?[offset])
    }

    /// Write the element at a multi-dimensional index.
    pub fn set<T: Element>(&mut self, index: &[usize], value: T) -> Result<()> {
        let offset = self.shape.offset_of(index)?;
        self.as_mut_slice::<T>()?[offset] = value;
        Ok(())
    }

    /// Set every element to zero.
    pub fn fill_zero(&mut self) {
        // all-zero bits is zero (and false) for every supported dtype
        self.as_mut_bytes().fill(0);
    }

    /// Set every element to one.
    pub fn fill_one(&mut self) {
        let one = self.dtype.one_bytes();
        for chunk in self.as_mut_bytes().chunks_exact_mut(one.len()) {
            chunk.copy_from_slice(&one);
        }
    }

    /// Overwrite every element with the values of `source`.
    ///
    /// # Errors
    ///
    /// Returns a usage error if shape or dtype differ, or a configuration
    /// error if `source` is not on the CPU.
    pub fn copy_from<S: TensorSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        if !source.device().is_cpu() {
            return Err(Error::UnsupportedDevice(source.device()));
        }
        if source.dtype() != self.dtype {
            return Err(Error::DTypeMismatch {
                expected: self.dtype,
                actual: source.dtype(),
            });
        }
        if source.shape() != &self.shape {
            return Err(Error::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                actual: source.shape().dims().to_vec(),
            });
        }

        let src = source.as_bytes();
        let dst = self.as_mut_bytes();
        if src.as_ptr() != dst.as_ptr() {
            dst.copy_from_slice(src);
        }
        Ok(())
    }

    /// Flush a file-backed buffer to disk. No-op for anonymous buffers.
    pub fn sync(&self) -> Result<()> {
        match &self.backing {
            Backing::File(region) => region.sync(),
            Backing::Anonymous(_) => Ok(()),
        }
    }

    /// Duplicate the backing descriptor so another process can map this
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoDescriptor`] for anonymous regions without a local
    /// descriptor, and [`Error::InvalidHandle`] for file-backed buffers, which
    /// are shared by path instead.
    pub fn share(&self) -> Result<SharedBuffer> {
        match &self.backing {
            Backing::Anonymous(region) => Ok(SharedBuffer {
                shape: self.shape.clone(),
                dtype: self.dtype,
                handle: region.serialize()?,
            }),
            Backing::File(region) => Err(Error::InvalidHandle(format!(
                "file-backed buffer at {} is shared by path, not by descriptor",
                region.path().display()
            ))),
        }
    }

    /// Map a buffer shared with [`share`](Self::share).
    pub fn from_shared(shared: SharedBuffer) -> Result<Self> {
        let region = AnonymousRegion::deserialize(shared.handle)?;
        Self::from_backing(shared.shape, shared.dtype, Backing::Anonymous(region))
    }
}

impl TensorSource for TypedBuffer {
    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn as_bytes(&self) -> &[u8] {
        TypedBuffer::as_bytes(self)
    }

    fn filename(&self) -> Option<&Path> {
        TypedBuffer::filename(self)
    }
}

/// A [`TypedBuffer`] in transit: shape, dtype and a duplicated descriptor.
#[derive(Debug)]
pub struct SharedBuffer {
    pub(crate) shape: Shape,
    pub(crate) dtype: DType,
    pub(crate) handle: RegionHandle,
}

impl SharedBuffer {
    /// Assemble from parts received from elsewhere.
    pub fn new(shape: Shape, dtype: DType, handle: RegionHandle) -> Self {
        Self {
            shape,
            dtype,
            handle,
        }
    }

    /// Logical dimensions.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The serialized region.
    pub fn handle(&self) -> &RegionHandle {
        &self.handle
    }
}

/// An owned in-memory tensor on the heap.
///
/// The simplest [`TensorSource`]: useful for materializing existing data into
/// shared storage with [`from_tensor`](super::from_tensor).
#[derive(Debug, Clone, PartialEq)]
pub struct HostTensor {
    shape: Shape,
    dtype: DType,
    device: Device,
    data: Vec<u8>,
}

impl HostTensor {
    /// Build from a flat row-major vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `values.len()` differs from
    /// `shape.numel()`.
    pub fn from_vec<T: Element>(shape: impl Into<Shape>, values: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        if values.len() != shape.numel() {
            return Err(Error::ShapeMismatch {
                expected: shape.dims().to_vec(),
                actual: vec![values.len()],
            });
        }
        Ok(Self {
            shape,
            dtype: T::DTYPE,
            device: Device::Cpu,
            data: T::to_bytes(&values).to_vec(),
        })
    }

    /// Label the tensor as living on `device`.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Copy the elements out.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        T::read_vec(&self.data)
    }
}

impl TensorSource for HostTensor {
    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn device(&self) -> Device {
        self.device
    }

    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
