use cmsenvelope::{
    BytesDataSource, ChunkCipher, Cipher, CipherOptions, KeyPair, SymmetricAlgorithm, VecDataSink,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const RECIPIENT_ID: &[u8] = b"bench-recipient";

fn create_test_data(size_kb: usize) -> Vec<u8> {
    vec![0u8; size_kb * 1024]
}

// Whole-buffer encryption, envelope construction included
fn bench_message_encryption(c: &mut Criterion) {
    let keys = KeyPair::generate();
    let mut group = c.benchmark_group("message_encryption");

    for algorithm in [SymmetricAlgorithm::Aes256Gcm, SymmetricAlgorithm::Aes256Cbc] {
        for size_kb in [1, 64, 1024] {
            let data = create_test_data(size_kb);
            group.throughput(Throughput::Bytes((size_kb * 1024) as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", algorithm), size_kb),
                &data,
                |b, data| {
                    b.iter(|| {
                        let mut cipher =
                            Cipher::with_options(CipherOptions::default().algorithm(algorithm));
                        cipher
                            .add_key_recipient(RECIPIENT_ID, keys.public_key())
                            .unwrap();
                        black_box(cipher.encrypt(data, true).unwrap())
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_chunk_encryption(c: &mut Criterion) {
    let keys = KeyPair::generate();
    let data = create_test_data(4096);
    let mut group = c.benchmark_group("chunk_encryption");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk_kb in [16, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk_kb), &chunk_kb, |b, &chunk_kb| {
            b.iter(|| {
                let mut cipher = ChunkCipher::with_options(
                    CipherOptions::default().preferred_chunk_size(chunk_kb * 1024),
                );
                cipher
                    .add_key_recipient(RECIPIENT_ID, keys.public_key())
                    .unwrap();
                let mut sink = VecDataSink::new();
                cipher
                    .encrypt(&mut BytesDataSource::new(data.clone(), 64 * 1024), &mut sink, true)
                    .unwrap();
                black_box(sink.into_inner())
            })
        });
    }
    group.finish();
}

// Password recipients are dominated by PBKDF2
fn bench_password_decryption(c: &mut Criterion) {
    let mut cipher = Cipher::new();
    cipher.add_password_recipient(b"bench password").unwrap();
    let encrypted = cipher.encrypt(&create_test_data(1), true).unwrap();

    c.bench_function("password_decryption", |b| {
        b.iter(|| {
            let mut reader = Cipher::new();
            black_box(
                reader
                    .decrypt_with_password(&encrypted, b"bench password")
                    .unwrap(),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_message_encryption,
    bench_chunk_encryption,
    bench_password_decryption
);
criterion_main!(benches);
