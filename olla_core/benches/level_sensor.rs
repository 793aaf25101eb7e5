use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use olla_core::{LevelCfg, LevelSensor};

// Bouncy float switch: mostly `level`, with a flip every few samples.
fn synth_trace(n: usize, level: bool, seed: u32) -> Vec<f32> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    (0..n)
        .map(|_| {
            let bounce = next() % 7 == 0;
            if level ^ bounce { 1.0 } else { 0.0 }
        })
        .collect()
}

pub fn bench_update(c: &mut Criterion) {
    let cfg = LevelCfg::default();
    let trace = synth_trace(10_000, true, 0x5eed);

    c.bench_function("level_update_and_classify_10k", |b| {
        b.iter_batched(
            || LevelSensor::new(cfg, 0),
            |mut s| {
                let mut full = 0u32;
                for (i, &v) in trace.iter().enumerate() {
                    let t = (i as u64 + 1) * cfg.interval_ms;
                    if s.update(t, v) && s.is_full() {
                        full += 1;
                    }
                    black_box(s.is_empty());
                }
                black_box(full)
            },
            BatchSize::SmallInput,
        )
    });
}

pub fn bench_means(c: &mut Criterion) {
    let cfg = LevelCfg::default();
    let mut s = LevelSensor::new(cfg, 0);
    for (i, v) in synth_trace(cfg.capacity(), false, 7).into_iter().enumerate() {
        s.update((i as u64 + 1) * cfg.interval_ms, v);
    }
    c.bench_function("level_empty_mean_200", |b| b.iter(|| black_box(s.empty_mean())));
    c.bench_function("level_full_mean_20", |b| b.iter(|| black_box(s.full_mean())));
}

criterion_group!(benches, bench_update, bench_means);
criterion_main!(benches);
