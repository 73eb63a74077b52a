use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use lexann::{EncoderConfig, Encoding, LexLshParams, QueryAssembler, VectorEncoder};

const DIMENSIONS: usize = 300;

/// Deterministic GloVe-shaped vector: small magnitudes, mixed signs.
fn glove_like(seed: u64) -> String {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..DIMENSIONS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            #[allow(clippy::cast_precision_loss)]
            let unit = (state % 20_000) as f32 / 10_000.0 - 1.0;
            format!("{:.6}", unit * 0.4)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_encoder(c: &mut Criterion, name: &str, config: EncoderConfig) {
    let encoder = config.build().unwrap();
    let vector = glove_like(7);

    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Elements(DIMENSIONS as u64));
    group.bench_function("encode_300d", |b| {
        b.iter(|| black_box(encoder.encode(black_box(&vector)).unwrap()));
    });

    let assembler = QueryAssembler::new(0.01, 0.0).unwrap();
    group.bench_function("assemble_300d", |b| {
        b.iter(|| {
            black_box(
                assembler
                    .assemble_vector("vector", encoder.as_ref(), black_box(&vector))
                    .unwrap(),
            )
        });
    });
    group.finish();
}

fn bench_fake_words(c: &mut Criterion) {
    bench_encoder(c, "fw", EncoderConfig::defaults(Encoding::FakeWords));
}

fn bench_lexlsh(c: &mut Criterion) {
    bench_encoder(c, "lexlsh_default", EncoderConfig::defaults(Encoding::LexLsh));
    bench_encoder(
        c,
        "lexlsh_wide",
        EncoderConfig::LexLsh(LexLshParams {
            decimals: 2,
            ngrams: 3,
            hash_count: 5,
            bucket_count: 1000,
            hash_set_size: 3,
        }),
    );
}

criterion_group!(encoders, bench_fake_words, bench_lexlsh);
criterion_main!(encoders);
