//! Buffer allocation and sharing benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use shmtensor::memory::{AnonymousRegion, StorageConfig};
use shmtensor::tensor::{self, BufferOptions, DType, HostTensor};
use std::os::unix::net::UnixStream;

fn bench_region_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_create");

    for size in [4 * 1024, 64 * 1024, 1024 * 1024, 16 * 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let region = AnonymousRegion::new(size).expect("region");
                std::hint::black_box(region.directory().is_some());
            });
        });
    }

    group.finish();
}

fn bench_fallback_dir(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_create_fallback");
    let storage = StorageConfig::default().without_fast_dirs();
    let size = 1024 * 1024;

    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("1MiB_temp_dir", |b| {
        b.iter(|| {
            let region = AnonymousRegion::with_config(size, &storage).expect("region");
            std::hint::black_box(region);
        });
    });

    group.finish();
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_fill");
    let options = BufferOptions::default();

    for numel in [1024, 256 * 1024, 4 * 1024 * 1024] {
        group.throughput(Throughput::Bytes((numel * 4) as u64));
        group.bench_with_input(BenchmarkId::new("zeros_f32", numel), &numel, |b, &numel| {
            b.iter(|| tensor::zeros([numel], DType::F32, &options).expect("zeros"));
        });
        group.bench_with_input(BenchmarkId::new("ones_f32", numel), &numel, |b, &numel| {
            b.iter(|| tensor::ones([numel], DType::F32, &options).expect("ones"));
        });
    }

    group.finish();
}

fn bench_from_tensor(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_tensor");

    for numel in [1024, 1024 * 1024] {
        let host = HostTensor::from_vec([numel], vec![0.5f32; numel]).expect("host tensor");
        group.throughput(Throughput::Bytes((numel * 4) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(numel), &host, |b, host| {
            b.iter(|| tensor::from_tensor(host, None, false).expect("copy"));
        });
    }

    group.finish();
}

fn bench_send_recv(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_recv_buffer");

    let (sender, receiver) = UnixStream::pair().expect("socket pair");
    let buffer = tensor::zeros([1024, 1024], DType::F32, &BufferOptions::default()).expect("zeros");

    group.throughput(Throughput::Elements(1));
    group.bench_function("4MiB_f32", |b| {
        b.iter(|| {
            tensor::send_buffer(&sender, &buffer).expect("send");
            let received = tensor::recv_buffer(&receiver).expect("recv");
            std::hint::black_box(received.nbytes());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_region_create,
    bench_fallback_dir,
    bench_fill,
    bench_from_tensor,
    bench_send_recv
);
criterion_main!(benches);
