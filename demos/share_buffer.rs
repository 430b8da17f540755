//! Sharing a tensor buffer with a worker
//!
//! This demo allocates a float32 buffer in anonymous shared memory, hands its
//! descriptor to a worker thread over a Unix socket pair, and reads back what
//! the worker wrote. The worker could just as well be another process: the
//! socket carries a duplicated file descriptor, not the data.
//!
//! It then persists a copy to a named file and re-opens it.
//!
//! Run with: cargo run --example share_buffer

use shmtensor::prelude::*;
use std::os::unix::net::UnixStream;
use std::thread;

fn main() -> Result<()> {
    // Initialize tracing to see directory choice and mapping events
    tracing_subscriber::fmt()
        .with_env_filter("shmtensor=debug")
        .init();

    println!("=== Shared Buffer Demo ===\n");

    let options = BufferOptions {
        storage: StorageConfig::from_env(),
        ..BufferOptions::default()
    };

    // 1. Allocate and share
    let buffer = tensor::zeros([4, 4], DType::F32, &options)?;
    println!(
        "1. Allocated {} x {} ({} bytes)",
        buffer.shape(),
        buffer.dtype(),
        buffer.nbytes()
    );

    let (parent, child) = UnixStream::pair()?;
    let worker = thread::spawn(move || -> Result<()> {
        let mut received = tensor::recv_buffer(&child)?;
        for (i, value) in received.as_mut_slice::<f32>()?.iter_mut().enumerate() {
            *value = i as f32 * 0.5;
        }
        Ok(())
    });

    tensor::send_buffer(&parent, &buffer)?;
    worker
        .join()
        .map_err(|_| Error::InvalidHandle("worker panicked".into()))??;

    println!("2. Worker filled the buffer:");
    for row in buffer.as_slice::<f32>()?.chunks(4) {
        println!("   {row:?}");
    }

    // 3. Persist a copy
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demo.bin");
    let saved = tensor::from_tensor(&buffer, Some(path.as_path()), false)?;
    saved.sync()?;
    drop(saved);

    let reopened = tensor::empty([4, 4], DType::F32, &BufferOptions::default().path(&path))?;
    println!(
        "\n3. Re-opened {}: element [3, 3] = {}",
        path.display(),
        reopened.get::<f32>(&[3, 3])?
    );

    // 4. Duplicating a file-backed buffer onto a path needs allow_overwrite
    match tensor::from_tensor(&reopened, Some(path.as_path()), false) {
        Err(err) => println!("4. Refused as expected: {err}"),
        Ok(_) => println!("4. Unexpectedly succeeded"),
    }

    Ok(())
}
