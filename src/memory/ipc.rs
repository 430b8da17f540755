//! Passing region descriptors between processes.
//!
//! Regions travel as a duplicated file descriptor in an `SCM_RIGHTS`
//! ancillary message over a Unix domain socket, with a small payload carrying
//! the size (or a richer descriptor for typed buffers). The receiver maps the
//! descriptor and ends up with the same physical pages as the sender.

use super::{AnonymousRegion, RegionHandle};
use crate::error::{Error, Result};
use rustix::fd::{AsFd, OwnedFd};
use rustix::net::{
    RecvAncillaryBuffer, RecvAncillaryMessage, RecvFlags, SendAncillaryBuffer,
    SendAncillaryMessage, SendFlags, recvmsg, sendmsg,
};
use std::io::{IoSlice, IoSliceMut};
use std::mem::MaybeUninit;
use std::os::unix::net::UnixStream;
use tracing::trace;

/// Send one file descriptor with a payload over a Unix socket.
///
/// The payload must not be empty: `SCM_RIGHTS` needs at least one data byte.
pub fn send_fd<Fd: AsFd>(socket: &UnixStream, fd: Fd, payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Err(Error::InvalidHandle("payload cannot be empty".into()));
    }

    let fds = [fd.as_fd()];
    let mut ancillary_space: [MaybeUninit<u8>; 64] = [const { MaybeUninit::uninit() }; 64];
    let mut ancillary = SendAncillaryBuffer::new(&mut ancillary_space);
    if !ancillary.push(SendAncillaryMessage::ScmRights(&fds)) {
        return Err(Error::InvalidHandle(
            "failed to add fd to ancillary buffer".into(),
        ));
    }

    let iov = [IoSlice::new(payload)];
    let sent = sendmsg(socket, &iov, &mut ancillary, SendFlags::empty())?;
    if sent != payload.len() {
        return Err(Error::InvalidHandle(format!(
            "short send: {sent} of {} bytes",
            payload.len()
        )));
    }

    trace!(len = payload.len(), "sent descriptor");
    Ok(())
}

/// Receive one file descriptor and its payload from a Unix socket.
///
/// Returns the number of payload bytes written to `payload_buf`.
pub fn recv_fd(socket: &UnixStream, payload_buf: &mut [u8]) -> Result<(usize, OwnedFd)> {
    if payload_buf.is_empty() {
        return Err(Error::InvalidHandle("payload buffer cannot be empty".into()));
    }

    let mut ancillary_space: [MaybeUninit<u8>; 64] = [const { MaybeUninit::uninit() }; 64];
    let mut ancillary = RecvAncillaryBuffer::new(&mut ancillary_space);

    let mut iov = [IoSliceMut::new(payload_buf)];
    let result = recvmsg(socket, &mut iov, &mut ancillary, RecvFlags::empty())?;

    let mut fds: Vec<OwnedFd> = Vec::new();
    for msg in ancillary.drain() {
        if let RecvAncillaryMessage::ScmRights(rights) = msg {
            fds.extend(rights);
        }
    }

    let mut fds = fds.into_iter();
    match (fds.next(), fds.next()) {
        (Some(fd), None) => {
            trace!(len = result.bytes, "received descriptor");
            Ok((result.bytes, fd))
        }
        (None, _) => Err(Error::InvalidHandle("message carried no descriptor".into())),
        (Some(_), Some(_)) => Err(Error::InvalidHandle(
            "message carried more than one descriptor".into(),
        )),
    }
}

/// Send a serialized region.
pub fn send_handle(socket: &UnixStream, handle: &RegionHandle) -> Result<()> {
    let size = (handle.size() as u64).to_le_bytes();
    send_fd(socket, handle.fd(), &size)
}

/// Receive a serialized region.
pub fn recv_handle(socket: &UnixStream) -> Result<RegionHandle> {
    let mut size_buf = [0u8; 8];
    let (bytes_read, fd) = recv_fd(socket, &mut size_buf)?;

    if bytes_read != size_buf.len() {
        return Err(Error::InvalidHandle(format!(
            "expected {} bytes for size, got {}",
            size_buf.len(),
            bytes_read
        )));
    }

    let size = usize::try_from(u64::from_le_bytes(size_buf))
        .map_err(|_| Error::InvalidHandle("region size out of range".into()))?;
    Ok(RegionHandle::new(size, fd))
}

/// Serialize `region` and send it over `socket`.
///
/// # Errors
///
/// Returns [`Error::NoDescriptor`] if the region has no local descriptor.
pub fn send_region(socket: &UnixStream, region: &AnonymousRegion) -> Result<()> {
    let handle = region.serialize()?;
    send_handle(socket, &handle)
}

/// Receive a region sent with [`send_region`] and map it.
pub fn recv_region(socket: &UnixStream) -> Result<AnonymousRegion> {
    AnonymousRegion::deserialize(recv_handle(socket)?)
}
