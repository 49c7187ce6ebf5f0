//! Benchmarks for the three signing phases.
//!
//! Run with: `cargo bench --bench signing_session`

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pdf_deferred_sign::{
    ByteRangeEngine, DigestAlgorithm, SignatureContainerBuilder, SignerIdentity, SigningConfig,
    SigningSession,
};

/// Minimal PDF padded with a comment stream to `size` bytes.
fn synthetic_pdf(size: usize) -> Vec<u8> {
    let mut pdf = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_vec();
    while pdf.len() < size {
        pdf.extend_from_slice(b"% padding line for benchmark input\n");
    }
    pdf.extend_from_slice(b"%%EOF\n");
    pdf
}

fn config(algorithm: DigestAlgorithm) -> SigningConfig {
    SigningConfig::new()
        .with_field_name("Sig1")
        .with_digest_algorithm(algorithm)
        .with_reserved_size(8192)
}

fn bench_prepare(c: &mut Criterion) {
    let engine = ByteRangeEngine::new();
    let mut group = c.benchmark_group("prepare");

    for size in [16 * 1024, 256 * 1024, 4 * 1024 * 1024] {
        let document = synthetic_pdf(size);
        group.throughput(Throughput::Bytes(document.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, document| {
            b.iter(|| {
                let mut session = SigningSession::new(config(DigestAlgorithm::Sha256));
                session.prepare(&engine, black_box(document)).map(|d| d.as_bytes().len())
            })
        });
    }

    group.finish();
}

fn bench_container(c: &mut Criterion) {
    let identity = SignerIdentity::generate_self_signed("Bench Signer", 2048)
        .expect("Failed to generate identity");
    let engine = ByteRangeEngine::new();
    let document = synthetic_pdf(64 * 1024);
    let mut group = c.benchmark_group("container");

    for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Sha384, DigestAlgorithm::Sha512] {
        let mut session = SigningSession::new(config(algorithm));
        let digest = session
            .prepare(&engine, &document)
            .expect("Failed to prepare document")
            .clone();
        let builder = SignatureContainerBuilder::new(algorithm);

        group.bench_function(algorithm.name(), |b| {
            b.iter(|| builder.build(black_box(&digest), &identity).map(|c| c.len()))
        });
    }

    group.finish();
}

fn bench_full_session(c: &mut Criterion) {
    let identity = SignerIdentity::generate_self_signed("Bench Signer", 2048)
        .expect("Failed to generate identity");
    let engine = ByteRangeEngine::new();
    let document = synthetic_pdf(256 * 1024);

    c.bench_function("prepare_sign_finalize", |b| {
        b.iter(|| -> pdf_deferred_sign::Result<usize> {
            let mut session = SigningSession::new(config(DigestAlgorithm::Sha256));
            session.prepare(&engine, black_box(&document))?;
            session.sign(identity.clone())?;
            session.finalize(&engine).map(|signed| signed.len())
        })
    });
}

criterion_group!(benches, bench_prepare, bench_container, bench_full_session);
criterion_main!(benches);
