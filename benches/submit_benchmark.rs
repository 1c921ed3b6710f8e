/*!
 * Submission Benchmarks
 *
 * Producer-side cost of `submit`: buffer reuse, fresh allocations and
 * contended producers
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fast_dump::{DumpConfig, FastDump, HostBackend, MemorySink, SamplingGate, StaticBudget};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn pipeline(backend: &Arc<HostBackend>, config: DumpConfig) -> FastDump {
    FastDump::builder()
        .with_backend(backend.clone())
        .with_budget(Arc::new(StaticBudget::new(256 * 1024 * 1024, 0)))
        .with_sink(Arc::new(MemorySink::new()))
        .with_config(config.with_write_targets(false, false))
        .build()
        .unwrap()
}

fn bench_submit_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_reuse");

    for size in [4 * 1024, 256 * 1024, 4 * 1024 * 1024] {
        let backend = Arc::new(HostBackend::new());
        let dump = pipeline(&backend, DumpConfig::default());
        let res = backend.create_buffer(vec![0xAB; size]);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                dump.submit(black_box(res), "bench", 0, 0);
                dump.wait_idle();
            });
        });
    }

    group.finish();
}

fn bench_submit_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_contended");
    group.measurement_time(Duration::from_secs(5));

    for producers in [1, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                let backend = Arc::new(HostBackend::new());
                let dump = Arc::new(pipeline(
                    &backend,
                    DumpConfig::default().with_allow_data_loss(false),
                ));
                let resources: Vec<_> = (0..producers)
                    .map(|_| backend.create_buffer(vec![0; 64 * 1024]))
                    .collect();

                b.iter(|| {
                    thread::scope(|s| {
                        for &res in &resources {
                            let dump = &dump;
                            s.spawn(move || {
                                for _ in 0..16 {
                                    dump.submit(res, "contended", 0, 0);
                                }
                            });
                        }
                    });
                    dump.wait_idle();
                });
            },
        );
    }

    group.finish();
}

fn bench_sampling_gate(c: &mut Criterion) {
    let gate = SamplingGate::new(Duration::from_millis(100), Duration::from_millis(50));

    c.bench_function("sampling_gate_decide", |b| {
        b.iter(|| black_box(gate.should_capture()));
    });
}

criterion_group!(
    benches,
    bench_submit_reuse,
    bench_submit_contended,
    bench_sampling_gate
);
criterion_main!(benches);
