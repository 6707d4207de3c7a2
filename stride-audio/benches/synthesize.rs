use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pprof::criterion::{Output, PProfProfiler};
use std::time::Duration;

use stride_audio::{DEFAULT_SAMPLE_RATE, synthesize};

/// Synthesis runs between presentations, so a comparison tone at the top
/// of the clamped range must stay well under one response window.
pub fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");

    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    for ms in [25u32, 100, 175, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(ms), &ms, |b, &ms| {
            b.iter(|| {
                let buf = synthesize(
                    black_box(ms as f32 / 1000.0),
                    1000.0,
                    0.8,
                    DEFAULT_SAMPLE_RATE,
                    5.0,
                );
                black_box(buf);
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
        .confidence_level(0.95)
        .noise_threshold(0.02);
    targets = bench_synthesize
}

criterion_main!(benches);
