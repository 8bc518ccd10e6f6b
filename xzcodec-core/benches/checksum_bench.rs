//! Performance benchmarks for the integrity-check implementations:
//! CRC-32, CRC-64, and SHA-256 across a range of data sizes.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use xzcodec_core::checksum::{Crc32, Crc64, Sha256};
use std::hint::black_box;

mod test_data {
    pub fn text_like(size: usize) -> Vec<u8> {
        let text = b"The quick brown fox jumps over the lazy dog. ";
        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            let remaining = size - data.len();
            let chunk_size = remaining.min(text.len());
            data.extend_from_slice(&text[..chunk_size]);
        }
        data
    }
}

mod data_sizes {
    pub const TINY: usize = 16;
    pub const SMALL: usize = 256;
    pub const MEDIUM: usize = 4 * 1024;
    pub const LARGE: usize = 64 * 1024;
    pub const XLARGE: usize = 1024 * 1024;
}

fn sizes() -> [(&'static str, usize); 5] {
    [
        ("16B", data_sizes::TINY),
        ("256B", data_sizes::SMALL),
        ("4KB", data_sizes::MEDIUM),
        ("64KB", data_sizes::LARGE),
        ("1MB", data_sizes::XLARGE),
    ]
}

fn bench_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");
    for (name, size) in sizes() {
        let data = test_data::text_like(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(Crc32::compute(black_box(data))));
        });
    }
    group.finish();
}

fn bench_crc64(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc64");
    for (name, size) in sizes() {
        let data = test_data::text_like(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(Crc64::compute(black_box(data))));
        });
    }
    group.finish();
}

fn bench_sha256(c: &mut Criterion) {
    let mut group = c.benchmark_group("sha256");
    for (name, size) in sizes() {
        let data = test_data::text_like(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(Sha256::compute(black_box(data))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_crc32, bench_crc64, bench_sha256);
criterion_main!(benches);
