//! Criterion micro-benchmarks for the produce encoding path.
//!
//! These benchmarks measure:
//! - Batch wire encoding with and without compression
//! - Key hashing throughput
//!
//! Run with: `cargo bench --bench encode_bench`

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gregor::compression::{load_produce_compressor, CompressionCodec};
use gregor::producer::{murmur2, RecordBatch};
use gregor::types::Record;

fn build_batch(records: usize, value_len: usize) -> RecordBatch {
    let value = vec![b'v'; value_len];
    let mut batch = RecordBatch::new(
        Record::new("bench")
            .with_key("key-0")
            .with_value(value.clone())
            .with_timestamp_ms(0),
    );
    for i in 1..records {
        batch.push(
            Record::new("bench")
                .with_key(format!("key-{i}").into_bytes())
                .with_value(value.clone())
                .with_timestamp_ms(i as i64),
        );
    }
    batch
}

fn bench_batch_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_encode");

    for records in [10usize, 100, 1_000] {
        let batch = build_batch(records, 100);
        group.throughput(Throughput::Bytes(batch.wire_length() as u64));

        group.bench_with_input(BenchmarkId::new("plain", records), &records, |b, _| {
            b.iter(|| {
                let mut wire = BytesMut::with_capacity(batch.wire_length() as usize);
                batch.append_to(black_box(&mut wire), None).unwrap();
                wire
            });
        });

        let compressor = load_produce_compressor(&[CompressionCodec::gzip()], 7).unwrap();
        group.bench_with_input(BenchmarkId::new("gzip", records), &records, |b, _| {
            b.iter(|| {
                let mut wire = BytesMut::with_capacity(batch.wire_length() as usize);
                batch
                    .append_to(black_box(&mut wire), Some(&compressor))
                    .unwrap();
                wire
            });
        });
    }

    group.finish();
}

fn bench_murmur2(c: &mut Criterion) {
    let mut group = c.benchmark_group("murmur2");

    for len in [8usize, 64, 1_024] {
        let key = vec![0xA5u8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &key, |b, key| {
            b.iter(|| murmur2(black_box(key)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_batch_encode, bench_murmur2);
criterion_main!(benches);
