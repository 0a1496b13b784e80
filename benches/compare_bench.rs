//! Performance benchmarks for credential comparison.
//!
//! Every keypad accept runs exactly one comparison, so this mostly guards
//! against regressions in the `{SSHA}` decode path.
//!
//! ```sh
//! cargo bench --bench compare_bench
//! cargo bench --bench compare_bench -- ssha
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use latchkey_core::CredentialRecord;
use latchkey_credentials::{compare, encode_ssha};
use std::hint::black_box;

fn bench_ssha(c: &mut Criterion) {
    let mut group = c.benchmark_group("ssha");
    group.throughput(Throughput::Elements(1));

    let salts: [(&str, &[u8]); 3] = [
        ("no_salt", b""),
        ("salt_4", b"salt"),
        ("salt_16", b"0123456789abcdef"),
    ];

    for (name, salt) in salts {
        let record = encode_ssha("12345678", salt);
        group.bench_with_input(BenchmarkId::new("match", name), &record, |b, record| {
            b.iter(|| black_box(compare(black_box(record), black_box("12345678"))));
        });
        group.bench_with_input(BenchmarkId::new("mismatch", name), &record, |b, record| {
            b.iter(|| black_box(compare(black_box(record), black_box("87654321"))));
        });
    }

    group.finish();
}

fn bench_plain(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain");
    group.throughput(Throughput::Elements(1));

    let record = CredentialRecord::new("12345678");
    let cases = [
        ("match", "12345678"),
        ("first_byte_differs", "02345678"),
        ("last_byte_differs", "12345670"),
        ("length_differs", "1234"),
    ];

    for (name, supplied) in cases {
        group.bench_function(name, |b| {
            b.iter(|| black_box(compare(black_box(&record), black_box(supplied))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ssha, bench_plain);
criterion_main!(benches);
