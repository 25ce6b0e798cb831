//! Run many independent simulations in parallel.

use crate::{
    network::{simulate_with, Link, SimulationResult},
    workload::{Calibrated, Workload},
    Suite,
};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

/// Simulate `suite` once per link on the global [rayon] pool.
///
/// Results are returned in the same order as `links`.
pub fn sample(suite: Suite, links: &[Link]) -> Vec<SimulationResult> {
    sample_with(suite, links, &Calibrated::default())
}

/// Simulate `suite` once per link using the provided [Workload].
pub fn sample_with<W: Workload>(
    suite: Suite,
    links: &[Link],
    workload: &W,
) -> Vec<SimulationResult> {
    links
        .par_iter()
        .map(|link| simulate_with(suite, link, workload))
        .collect()
}
