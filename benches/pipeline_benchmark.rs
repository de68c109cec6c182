use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lastresort::chunks::{reconstruct, split_into_chunks, QrChunk};
use lastresort::pipeline::{combine, split};
use lastresort::sss::{combine_shares, split_secret};

fn bench_split_secret(c: &mut Criterion) {
    c.bench_function("split_secret", |b| {
        let secret = b"this is a very secret message";
        let threshold = 5;
        let shares = 10;
        b.iter(|| split_secret(black_box(secret), black_box(threshold), black_box(shares)))
    });
}

fn bench_combine_shares(c: &mut Criterion) {
    c.bench_function("combine_shares", |b| {
        let secret = b"this is a very secret message";
        let threshold = 5;
        let shares = 10;
        let shares_map = split_secret(secret, threshold, shares).unwrap();
        b.iter(|| combine_shares(black_box(&shares_map)))
    });
}

fn bench_pipeline_split(c: &mut Criterion) {
    c.bench_function("pipeline_split", |b| {
        let secret = "abandon ability able about above absent absorb abstract absurd abuse access accident";
        b.iter(|| split(black_box(secret), black_box(5), black_box(3)))
    });
}

fn bench_pipeline_combine(c: &mut Criterion) {
    c.bench_function("pipeline_combine", |b| {
        let secret = "abandon ability able about above absent absorb abstract absurd abuse access accident";
        let shares = split(secret, 5, 3).unwrap();
        b.iter(|| combine(black_box(&shares[..3])))
    });
}

fn bench_chunk_round_trip(c: &mut Criterion) {
    c.bench_function("chunk_round_trip", |b| {
        let share = "E".repeat(2500);
        b.iter(|| {
            let payloads: Vec<String> = split_into_chunks(black_box(&share), 1000)
                .unwrap()
                .iter()
                .map(QrChunk::payload)
                .collect();
            reconstruct(&payloads)
        })
    });
}

criterion_group!(
    benches,
    bench_split_secret,
    bench_combine_shares,
    bench_pipeline_split,
    bench_pipeline_combine,
    bench_chunk_round_trip
);
criterion_main!(benches);
