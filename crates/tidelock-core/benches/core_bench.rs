//! Benchmarks for the simulation hot paths
//!
//! Run with: cargo bench -p tidelock-core --bench core_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex64;
use tidelock_core::fft::{Radix2Fft, Window};
use tidelock_core::prelude::*;
use tidelock_core::spectrum::{effective_sample_rate, SpectralEstimator};

// ============================================================================
// FFT Benchmarks
// ============================================================================

fn bench_fft(c: &mut Criterion) {
    let mut group = c.benchmark_group("radix2_fft");

    for size in [512usize, 1024, 4096].iter() {
        let fft = Radix2Fft::new(*size).unwrap();
        let input: Vec<Complex64> = (0..*size)
            .map(|i| Complex64::new((i as f64 * 0.1).sin(), 0.0))
            .collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("forward", size), size, |b, _| {
            b.iter(|| {
                let mut buffer = input.clone();
                fft.forward(black_box(&mut buffer));
                buffer
            })
        });
    }

    group.finish();
}

// ============================================================================
// Simulation Benchmarks
// ============================================================================

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");

    let mut sim = SimulationCore::default();
    sim.set_simulation_speed(100.0).unwrap();
    group.throughput(Throughput::Elements(100));
    group.bench_function("frame_100_steps", |b| {
        b.iter(|| {
            if sim.advance_frame().is_err() {
                sim.reset();
            }
        })
    });

    group.finish();
}

// ============================================================================
// Analysis Benchmarks
// ============================================================================

fn bench_tidal_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");

    // A full tidal buffer's worth of synthetic crossings
    let periods: Vec<f64> = (0..65_536).map(|i| 1.228 + 0.01 * (i as f64 * 0.02).sin()).collect();
    let deviations: Vec<f64> = periods.iter().map(|p| (p - 1.228) / 2.457).collect();
    let estimator = SpectralEstimator::new(1024, Window::Hann).unwrap();

    group.bench_function("tidal_full_buffer", |b| {
        b.iter(|| {
            let fs = effective_sample_rate(black_box(&periods)).unwrap_or(1.0);
            estimator.analyze(black_box(&deviations), fs)
        })
    });

    let mut sim = SimulationCore::default();
    for _ in 0..600 {
        let _ = sim.step_once();
    }
    let range = sim.default_pendulum_range();
    group.bench_function("pendulum_view", |b| b.iter(|| sim.pendulum_spectrum(black_box(range))));

    group.finish();
}

criterion_group!(
    name = fft_benches;
    config = Criterion::default();
    targets = bench_fft
);

criterion_group!(
    name = sim_benches;
    config = Criterion::default();
    targets = bench_frame, bench_tidal_analysis
);

criterion_main!(fft_benches, sim_benches);
