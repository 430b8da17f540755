//! Sending typed buffers to other processes.
//!
//! A buffer crosses a Unix socket as one `SCM_RIGHTS` message: the duplicated
//! region descriptor in the ancillary data, and a length-prefixed,
//! rkyv-serialized [`BufferDescriptor`] as the payload.
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ len: u32 LE  │ BufferDescriptor (rkyv)      │   + fd via SCM_RIGHTS
//! └──────────────┴──────────────────────────────┘
//! ```

use super::{DType, Shape, SharedBuffer, TypedBuffer};
use crate::error::{Error, Result};
use crate::memory::defaults::{FRAME_PREFIX_LEN, MAX_DESCRIPTOR_LEN};
use crate::memory::{RegionHandle, ipc};
use std::os::unix::net::UnixStream;
use tracing::debug;

/// Everything except the descriptor needed to rebuild a shared buffer.
#[derive(Clone, Debug, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
pub struct BufferDescriptor {
    /// Region size in bytes.
    pub size: u64,
    /// Element type.
    pub dtype: DType,
    /// Logical dimensions.
    pub dims: Vec<u64>,
}

impl BufferDescriptor {
    /// Describe a shared buffer.
    pub fn of(shared: &SharedBuffer) -> Self {
        Self {
            size: shared.handle().size() as u64,
            dtype: shared.dtype(),
            dims: shared.shape().dims().iter().map(|&d| d as u64).collect(),
        }
    }

    fn shape(&self) -> Result<Shape> {
        let dims = self
            .dims
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidHandle("dimension out of range".into()))?;
        Ok(Shape::new(dims))
    }
}

/// Frame a descriptor for sending.
///
/// Returns a buffer with length prefix followed by the serialized descriptor.
///
/// # Errors
///
/// Returns [`Error::InvalidHandle`] if the serialized descriptor exceeds
/// [`MAX_DESCRIPTOR_LEN`]; the receiver would not read it in one message.
pub fn frame_descriptor(desc: &BufferDescriptor) -> Result<Vec<u8>> {
    let serialized = rkyv::to_bytes::<rkyv::rancor::Error>(desc)
        .map_err(|e| Error::InvalidHandle(format!("descriptor serialization failed: {e}")))?;
    if serialized.len() > MAX_DESCRIPTOR_LEN {
        return Err(Error::InvalidHandle(format!(
            "descriptor of rank {} needs {} bytes, limit is {MAX_DESCRIPTOR_LEN}",
            desc.dims.len(),
            serialized.len()
        )));
    }
    let len = serialized.len() as u32;

    let mut framed = Vec::with_capacity(FRAME_PREFIX_LEN + serialized.len());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend_from_slice(&serialized);
    Ok(framed)
}

/// Unframe a descriptor received in one message.
pub fn unframe_descriptor(buf: &[u8]) -> Result<BufferDescriptor> {
    if buf.len() < FRAME_PREFIX_LEN {
        return Err(Error::InvalidHandle("truncated descriptor frame".into()));
    }

    let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if buf.len() != FRAME_PREFIX_LEN + len {
        return Err(Error::InvalidHandle(format!(
            "descriptor frame announces {len} bytes, carries {}",
            buf.len() - FRAME_PREFIX_LEN
        )));
    }

    // Copy to aligned buffer for rkyv
    let mut aligned = rkyv::util::AlignedVec::<8>::new();
    aligned.extend_from_slice(&buf[FRAME_PREFIX_LEN..]);

    rkyv::from_bytes::<BufferDescriptor, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::InvalidHandle(format!("descriptor validation failed: {e}")))
}

/// Send an anonymous buffer over `socket`.
///
/// The receiver maps the same storage; nothing is copied.
///
/// # Errors
///
/// Fails for file-backed buffers (share those by path) and for regions
/// without a local descriptor.
pub fn send_buffer(socket: &UnixStream, buffer: &TypedBuffer) -> Result<()> {
    let shared = buffer.share()?;
    let payload = frame_descriptor(&BufferDescriptor::of(&shared))?;
    ipc::send_fd(socket, shared.handle().fd(), &payload)?;
    debug!(shape = %buffer.shape(), dtype = %buffer.dtype(), "sent buffer");
    Ok(())
}

/// Receive a buffer sent with [`send_buffer`].
pub fn recv_buffer(socket: &UnixStream) -> Result<TypedBuffer> {
    let mut payload = vec![0u8; FRAME_PREFIX_LEN + MAX_DESCRIPTOR_LEN];
    let (len, fd) = ipc::recv_fd(socket, &mut payload)?;
    let desc = unframe_descriptor(&payload[..len])?;

    let size = usize::try_from(desc.size)
        .map_err(|_| Error::InvalidHandle("region size out of range".into()))?;
    let shared = SharedBuffer::new(desc.shape()?, desc.dtype, RegionHandle::new(size, fd));
    let buffer = TypedBuffer::from_shared(shared)?;

    debug!(shape = %buffer.shape(), dtype = %buffer.dtype(), "received buffer");
    Ok(buffer)
}
