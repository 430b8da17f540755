//! Tensor shapes and row-major index arithmetic.

use super::DType;
use crate::error::{Error, Result};

/// Stores the logical dimensions of a buffer.
///
/// A rank-0 shape (no dims) describes a scalar and holds one element. Any
/// zero dim makes the shape empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Constructs a new shape from the provided dimensions.
    pub fn new<D: Into<Vec<usize>>>(dims: D) -> Self {
        Shape { dims: dims.into() }
    }

    /// Shape of a scalar.
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    /// Borrow the raw dimension slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the rank (number of axes) of the shape.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements implied by the shape.
    ///
    /// Saturates at `usize::MAX`; use [`byte_size`](Self::byte_size) when the
    /// result feeds an allocation.
    pub fn numel(&self) -> usize {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .unwrap_or(usize::MAX)
    }

    /// Bytes needed for this shape at `dtype`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeOverflow`] if the product overflows `usize`.
    pub fn byte_size(&self, dtype: DType) -> Result<usize> {
        self.dims
            .iter()
            .try_fold(dtype.size_in_bytes(), |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::SizeOverflow {
                shape: self.dims.clone(),
                dtype,
            })
    }

    /// Row-major strides, in elements.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        for axis in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1].saturating_mul(self.dims[axis + 1]);
        }
        strides
    }

    /// Flat element offset of a multi-dimensional index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the index has the wrong rank or any
    /// coordinate is out of bounds.
    pub fn offset_of(&self, index: &[usize]) -> Result<usize> {
        let in_bounds = index.len() == self.dims.len()
            && index.iter().zip(&self.dims).all(|(&i, &d)| i < d);
        if !in_bounds {
            return Err(Error::ShapeMismatch {
                expected: self.dims.clone(),
                actual: index.to_vec(),
            });
        }

        Ok(index
            .iter()
            .zip(self.strides())
            .map(|(&i, stride)| i * stride)
            .sum())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}
