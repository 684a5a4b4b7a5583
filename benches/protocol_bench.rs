#![allow(missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;
use wirecode::{BufferKind, ProtocolKind, WireObject, Wirecode};

#[derive(WireObject, Debug, Default, Clone)]
struct BenchItem {
    id: i64,
    name: String,
    payload: Vec<f64>,
}

#[derive(WireObject, Debug, Default, Clone)]
struct BenchRecord {
    header: BenchItem,
    samples: Vec<i32>,
    labels: Vec<String>,
    index: BTreeMap<String, i64>,
}

fn generate_data(count: usize) -> BenchRecord {
    BenchRecord {
        header: BenchItem {
            id: 7,
            name: "bench".to_string(),
            payload: vec![1.5; 128],
        },
        samples: (0..count as i32).collect(),
        labels: (0..count / 10).map(|i| format!("label-{i}")).collect(),
        index: (0..count / 10).map(|i| (format!("k{i}"), i as i64)).collect(),
    }
}

const COMBINATIONS: [(ProtocolKind, BufferKind, &str); 4] = [
    (ProtocolKind::Native, BufferKind::Checked, "native_checked"),
    (ProtocolKind::Native, BufferKind::Fast, "native_fast"),
    (ProtocolKind::Compat, BufferKind::Checked, "compat_checked"),
    (ProtocolKind::Compat, BufferKind::Fast, "compat_fast"),
];

// --- BENCHMARKS ---

fn bench_encode(c: &mut Criterion) {
    let data = generate_data(50_000);
    let size = Wirecode::encode(&data).expect("Failed to encode").len();
    println!("Encoded size: {size} bytes");

    let mut group = c.benchmark_group("Encode");
    group.throughput(Throughput::Bytes(size as u64));
    for (protocol, buffer, label) in COMBINATIONS {
        let builder = Wirecode::builder()
            .protocol(protocol)
            .buffer(buffer)
            .initial_capacity(size);
        group.bench_function(label, |b| {
            b.iter(|| builder.encode(black_box(&data)).expect("Failed to encode"));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let data = generate_data(50_000);

    let mut group = c.benchmark_group("Decode");
    for (protocol, buffer, label) in COMBINATIONS {
        let builder = Wirecode::builder().protocol(protocol).buffer(buffer);
        let bytes = builder.encode(&data).expect("Failed to encode");
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(label, |b| {
            b.iter(|| {
                let _res: BenchRecord = builder.decode(black_box(bytes.as_slice())).expect("Failed to decode");
            });
        });
    }
    group.finish();
}

fn bench_inspect(c: &mut Criterion) {
    let bytes = Wirecode::encode(&generate_data(50_000)).expect("Failed to encode");

    c.bench_function("inspect_native", |b| {
        b.iter(|| Wirecode::inspect(black_box(bytes.as_slice())).expect("Failed to inspect"));
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_inspect);
criterion_main!(benches);
