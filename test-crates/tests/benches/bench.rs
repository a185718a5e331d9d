use criterion::BenchmarkId;
use criterion::Throughput;
use criterion::{criterion_group, criterion_main, Criterion};
use corundum_wasmer_host::prelude::*;
use rand::prelude::*;
use tempfile::TempDir;
use test::wasms::TestWasm;

/// compile and instantiate a guest
pub fn guest_runtime(c: &mut Criterion) {
    let mut group = c.benchmark_group("guest_runtime");

    for wasm in [TestWasm::Identity, TestWasm::Faulty] {
        group.bench_function(BenchmarkId::new("guest_runtime", wasm.name()), |b| {
            b.iter(|| {
                let _drop = wasm.runtime();
            })
        });
    }

    group.finish();
}

/// load a guest from disk
pub fn guest_runtime_from_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("guest_runtime_from_file");

    let tmpdir = TempDir::new().unwrap();
    let path = tmpdir.path().join(TestWasm::Identity.name());
    std::fs::write(&path, TestWasm::Identity.bytes()).unwrap();
    group.bench_function("identity", |b| {
        b.iter(|| {
            GuestRuntime::from_file(&path, GuestConfig::default()).unwrap();
        })
    });

    group.finish();
}

/// submit an input of n bytes to the identity guest
pub fn submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");

    for (name, runtime) in [
        ("metered", TestWasm::Identity.runtime()),
        ("unmetered", TestWasm::Identity.unmetered_runtime()),
    ] {
        for n in [0_usize, 1, 1_000, 1_000_000] {
            group.throughput(Throughput::Bytes(n as u64));
            group.sample_size(10);

            let input = ".".repeat(n);
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
                b.iter(|| {
                    runtime.submit(&input).unwrap();
                });
            });
        }
    }

    group.finish();
}

/// submit random multibyte text so decoding has to validate more than ascii
pub fn submit_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_random");

    let runtime = TestWasm::Identity.unmetered_runtime();
    let mut rng = thread_rng();

    for chars in [1_usize, 1_000, 100_000] {
        let input: String = (0..chars).map(|_| rng.gen::<char>()).collect();
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.sample_size(10);

        group.bench_with_input(BenchmarkId::new("random", chars), &input, |b, input| {
            b.iter(|| {
                runtime.submit(input).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    guest_runtime,
    guest_runtime_from_file,
    submit,
    submit_random,
);

criterion_main!(benches);
