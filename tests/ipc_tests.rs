//! Descriptor passing between threads over Unix sockets.
//!
//! Each test hands a region or buffer across a socket pair the same way a
//! worker process would receive it, then checks both ends see one storage.

use shmtensor::memory::{AnonymousRegion, MemoryRegion, StorageConfig, ipc};
use shmtensor::tensor::{self, BufferOptions, DType, TypedBuffer};
use std::os::unix::net::UnixStream;
use std::thread;

// ============================================================================
// Region Transport
// ============================================================================

/// A worker thread fills a region it received; the sender sees the writes.
#[test]
fn test_region_written_by_receiver() {
    let (parent, child) = UnixStream::pair().unwrap();
    let region = AnonymousRegion::new(4096).unwrap();

    ipc::send_region(&parent, &region).unwrap();

    let worker = thread::spawn(move || {
        let mut received = ipc::recv_region(&child).expect("should receive region");
        assert_eq!(received.len(), 4096);
        received.as_mut_bytes().fill(0xAB);
    });
    worker.join().unwrap();

    assert!(region.as_bytes().iter().all(|&b| b == 0xAB));
}

/// The sender may drop its region before the receiver maps it.
#[test]
fn test_region_outlives_sender() {
    let (parent, child) = UnixStream::pair().unwrap();

    {
        let mut region = AnonymousRegion::new(16).unwrap();
        region.as_mut_bytes().copy_from_slice(b"0123456789abcdef");
        ipc::send_region(&parent, &region).unwrap();
    }

    let received = ipc::recv_region(&child).unwrap();
    assert_eq!(received.as_bytes(), b"0123456789abcdef");
    assert!(received.has_descriptor());
}

/// Many regions can be queued on one socket and received in order.
#[test]
fn test_many_regions_in_order() {
    let (parent, child) = UnixStream::pair().unwrap();
    let count = 32;

    let regions: Vec<_> = (0..count)
        .map(|i| {
            let mut region = AnonymousRegion::new(64).unwrap();
            region.as_mut_bytes()[0] = i as u8;
            ipc::send_region(&parent, &region).unwrap();
            region
        })
        .collect();

    for i in 0..count {
        let received = ipc::recv_region(&child).unwrap();
        assert_eq!(received.as_bytes()[0], i as u8);
    }
    assert_eq!(regions.len(), count);
}

// ============================================================================
// Buffer Transport
// ============================================================================

/// A typed buffer round-trips shape, dtype and storage.
#[test]
fn test_buffer_round_trip_across_threads() {
    let (parent, child) = UnixStream::pair().unwrap();
    let buffer = tensor::zeros([4, 8], DType::I32, &BufferOptions::default()).unwrap();

    let worker = thread::spawn(move || {
        let mut received = tensor::recv_buffer(&child).expect("should receive buffer");
        assert_eq!(received.shape().dims(), &[4, 8]);
        assert_eq!(received.dtype(), DType::I32);
        for (i, value) in received.as_mut_slice::<i32>().unwrap().iter_mut().enumerate() {
            *value = i as i32 * 10;
        }
    });

    tensor::send_buffer(&parent, &buffer).unwrap();
    worker.join().unwrap();

    let values = buffer.to_vec::<i32>().unwrap();
    assert_eq!(values.len(), 32);
    assert_eq!(values[31], 310);
    assert_eq!(buffer.get::<i32>(&[1, 0]).unwrap(), 80);
}

/// Buffers built with a custom storage config still travel by descriptor.
#[test]
fn test_buffer_from_fallback_dir() {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::default()
        .without_fast_dirs()
        .temp_dir(dir.path());
    let options = BufferOptions::default().storage(storage);

    let (parent, child) = UnixStream::pair().unwrap();
    let buffer = tensor::ones([16], DType::U8, &options).unwrap();
    tensor::send_buffer(&parent, &buffer).unwrap();
    drop(buffer);

    let received = tensor::recv_buffer(&child).unwrap();
    assert_eq!(received.to_vec::<u8>().unwrap(), vec![1; 16]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// A buffer received from a socket can be shared again.
#[test]
fn test_received_buffer_can_be_resent() {
    let (a, b) = UnixStream::pair().unwrap();
    let (c, d) = UnixStream::pair().unwrap();

    let original = tensor::ones([3], DType::F64, &BufferOptions::default()).unwrap();
    tensor::send_buffer(&a, &original).unwrap();

    let middle: TypedBuffer = tensor::recv_buffer(&b).unwrap();
    tensor::send_buffer(&c, &middle).unwrap();

    let mut last = tensor::recv_buffer(&d).unwrap();
    last.set(&[2], 7.5f64).unwrap();
    assert_eq!(original.get::<f64>(&[2]).unwrap(), 7.5);
}
