//! Benchmarks for the record path between the acquisition worker and consumers
//!
//! Covers:
//! - Frame decoding of a typical device line
//! - Push/pop through the bounded buffer, below and at capacity
//! - Batch draining of a full buffer
//!
//! Platform: Cross-platform (no hardware required)

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use vibrawatch::{BoundedTelemetryBuffer, FrameDecoder, TelemetryRecord};

const SAMPLE_LINE: &str =
    r#"{"rms":0.0213,"max":0.1042,"crest":4.89,"freq":58.5,"samples":256,"timestamp":1234567}"#;

fn sample_record(decoder: &FrameDecoder) -> TelemetryRecord {
    decoder.decode(SAMPLE_LINE).into_record().expect("sample line decodes")
}

fn bench_decode(c: &mut Criterion) {
    let decoder = FrameDecoder::new();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(SAMPLE_LINE.len() as u64));
    group.bench_function("json_frame", |b| b.iter(|| black_box(decoder.decode(black_box(SAMPLE_LINE)))));
    group.bench_function("banner_line", |b| {
        b.iter(|| black_box(decoder.decode(black_box("Sensor ready, sampling at 1 kHz"))))
    });
    group.finish();
}

fn bench_push_pop(c: &mut Criterion) {
    let decoder = FrameDecoder::new();
    let mut group = c.benchmark_group("buffer_push_pop");
    group.throughput(Throughput::Elements(1));

    for capacity in [16usize, 1_000] {
        let buffer = BoundedTelemetryBuffer::new(capacity);
        group.bench_with_input(BenchmarkId::new("below_capacity", capacity), &capacity, |b, _| {
            b.iter_batched(
                || sample_record(&decoder),
                |record| {
                    buffer.push(record);
                    black_box(buffer.try_pop())
                },
                BatchSize::SmallInput,
            )
        });

        let full = BoundedTelemetryBuffer::new(capacity);
        for _ in 0..capacity {
            full.push(sample_record(&decoder));
        }
        group.bench_with_input(BenchmarkId::new("overflowing", capacity), &capacity, |b, _| {
            b.iter_batched(
                || sample_record(&decoder),
                |record| black_box(full.push(record)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_pop_batch(c: &mut Criterion) {
    let decoder = FrameDecoder::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to build runtime");

    let mut group = c.benchmark_group("buffer_pop_batch");
    group.throughput(Throughput::Elements(100));
    group.bench_function("drain_100", |b| {
        b.iter_batched(
            || {
                let buffer = BoundedTelemetryBuffer::new(100);
                for _ in 0..100 {
                    buffer.push(sample_record(&decoder));
                }
                buffer
            },
            |buffer| {
                let batch = runtime.block_on(buffer.pop_batch(100, Duration::from_millis(10)));
                black_box(batch)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_decode, bench_push_pop, bench_pop_batch);
criterion_main!(benches);
