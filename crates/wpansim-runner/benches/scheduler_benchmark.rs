//! Performance benchmarks for the event scheduler and a full sweep step.
//!
//! ## Running the benchmarks
//!
//! ```bash
//! cargo bench -p wpansim-runner
//! ```
//!
//! ## Benchmarks included
//!
//! - `schedule_and_drain_N` - schedule N events at pseudo-random times and run them
//! - `cancel_half_N` - schedule N events, cancel every other one, then run
//! - `sweep_distance_N_trials` - one distance of a two-link sweep

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wpansim_common::{EventScheduler, RunLimit, SimTime};
use wpansim_runner::{SimulationConfig, SweepController};

fn event_time(i: u64) -> SimTime {
    // Spread events over 10 ms with plenty of equal timestamps.
    SimTime::from_micros((i * 7919) % 10_000)
}

fn bench_schedule_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");

    for event_count in [1_000u64, 10_000, 100_000] {
        group.throughput(Throughput::Elements(event_count));

        group.bench_with_input(
            BenchmarkId::new("schedule_and_drain", event_count),
            &event_count,
            |b, &count| {
                b.iter(|| {
                    let mut scheduler = EventScheduler::new();
                    for i in 0..count {
                        scheduler
                            .schedule(event_time(i), i, None)
                            .expect("future time");
                    }
                    let mut sum = 0u64;
                    let summary = scheduler
                        .run(RunLimit::UntilEmpty, |_, event| -> Result<(), ()> {
                            sum = sum.wrapping_add(event.action);
                            Ok(())
                        })
                        .expect("handler never fails");
                    black_box((sum, summary.executed))
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("cancel_half", event_count),
            &event_count,
            |b, &count| {
                b.iter(|| {
                    let mut scheduler = EventScheduler::new();
                    let handles: Vec<_> = (0..count)
                        .map(|i| {
                            scheduler
                                .schedule(event_time(i), i, None)
                                .expect("future time")
                        })
                        .collect();
                    for handle in handles.iter().step_by(2) {
                        scheduler.cancel(*handle);
                    }
                    let summary = scheduler
                        .run(RunLimit::UntilEmpty, |_, _| -> Result<(), ()> { Ok(()) })
                        .expect("handler never fails");
                    black_box(summary.executed)
                });
            },
        );
    }

    group.finish();
}

fn bench_sweep_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    group.sample_size(20);

    for trials in [100u32, 1_000] {
        group.throughput(Throughput::Elements(u64::from(trials) * 2));

        group.bench_with_input(
            BenchmarkId::new("sweep_distance_trials", trials),
            &trials,
            |b, &trials| {
                let mut config = SimulationConfig::default();
                config.sweep.max_packets_per_distance = trials;
                b.iter(|| {
                    let mut controller =
                        SweepController::new(&config).expect("default config is valid");
                    let sample = controller.run_distance(50.0).expect("sweep step failed");
                    black_box(sample)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_schedule_and_drain, bench_sweep_distance);
criterion_main!(benches);
