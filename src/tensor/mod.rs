//! Typed, shaped buffers over shared memory.
//!
//! # Architecture
//!
//! - [`DType`], [`Shape`], [`Device`], [`Layout`]: tensor metadata
//! - [`Element`]: Rust scalar types matching a dtype
//! - [`TypedBuffer`]: a shaped view over an anonymous or named-file region
//! - [`empty`], [`zeros`], [`ones`], [`from_tensor`]: constructors
//! - [`send_buffer`] / [`recv_buffer`]: hand a buffer to another process
//!
//! # Example
//!
//! ```rust
//! use shmtensor::tensor::{self, BufferOptions, DType, HostTensor};
//!
//! let host = HostTensor::from_vec([2, 2], vec![1.0f32, 2.0, 3.0, 4.0])?;
//! let shared = tensor::from_tensor(&host, None, false)?;
//! assert_eq!(shared.get::<f32>(&[1, 0])?, 3.0);
//!
//! let ones = tensor::ones_like(&shared, &BufferOptions::default())?;
//! assert_eq!(ones.to_vec::<f32>()?, vec![1.0; 4]);
//! # Ok::<(), shmtensor::Error>(())
//! ```

mod buffer;
mod device;
mod dtype;
mod element;
mod factory;
mod shape;
mod share;

pub use buffer::{Backing, HostTensor, SharedBuffer, TensorSource, TypedBuffer};
pub use device::{Device, Layout};
pub use dtype::DType;
pub use element::Element;
pub use factory::{
    BufferOptions, empty, empty_like, from_tensor, ones, ones_like, zeros, zeros_like,
};
pub use shape::Shape;
pub use share::{BufferDescriptor, frame_descriptor, recv_buffer, send_buffer, unframe_descriptor};
