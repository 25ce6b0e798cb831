//! Convert an abstract complexity into measured CPU time.
//!
//! Each unit of complexity performs [ITERATIONS_PER_UNIT] rounds of `sqrt(i) * tan(i)`
//! accumulated modulo [MODULUS]. Work is performed on the calling thread and the elapsed
//! wall-clock time is returned, so results carry the jitter of the host (frequency scaling,
//! contention, cache state) rather than a canned constant.

use std::{hint::black_box, time::Instant};

/// Iterations of the inner loop performed per unit of complexity.
///
/// Calibrated so that the complexities used by [crate::Suite] (0.5 to 5.0) take between
/// roughly one and ten milliseconds on contemporary hardware.
pub const ITERATIONS_PER_UNIT: u64 = 60_000;

/// Upper bound on the complexity accepted by a single call.
pub const MAX_COMPLEXITY: f64 = 64.0;

/// Modulus applied to the accumulator to keep it finite.
pub const MODULUS: f64 = 123_456.0;

/// Something that can turn a complexity into elapsed milliseconds.
pub trait Workload: Send + Sync {
    /// Perform (or account for) `complexity` units of work and return the time taken in
    /// milliseconds.
    fn run(&self, complexity: f64) -> f64;
}

/// Burns real CPU cycles, scaled by `iterations_per_unit`.
#[derive(Clone, Copy, Debug)]
pub struct Calibrated {
    pub iterations_per_unit: u64,
}

impl Default for Calibrated {
    fn default() -> Self {
        Self {
            iterations_per_unit: ITERATIONS_PER_UNIT,
        }
    }
}

impl Workload for Calibrated {
    fn run(&self, complexity: f64) -> f64 {
        burn(iterations(complexity, self.iterations_per_unit))
    }
}

/// Reports `ms` per unit of complexity without doing any work.
///
/// Useful for making latency computations exact in tests and benchmarks.
#[derive(Clone, Copy, Debug)]
pub struct Fixed(pub f64);

impl Workload for Fixed {
    fn run(&self, complexity: f64) -> f64 {
        self.0 * clamp(complexity)
    }
}

/// Perform `complexity` units of calibrated work and return the elapsed milliseconds.
///
/// Negative or non-finite complexities perform no work; complexities above
/// [MAX_COMPLEXITY] are clamped.
pub fn estimate_workload_ms(complexity: f64) -> f64 {
    Calibrated::default().run(complexity)
}

fn clamp(complexity: f64) -> f64 {
    if !complexity.is_finite() || complexity <= 0.0 {
        return 0.0;
    }
    complexity.min(MAX_COMPLEXITY)
}

fn iterations(complexity: f64, per_unit: u64) -> u64 {
    (clamp(complexity) * per_unit as f64) as u64
}

fn burn(iterations: u64) -> f64 {
    let start = Instant::now();
    let mut acc = 0.0f64;
    for i in 0..iterations {
        let x = black_box(i as f64);
        acc = (acc + x.sqrt() * x.tan()) % MODULUS;
    }
    black_box(acc);
    start.elapsed().as_secs_f64() * 1_000.0
}
