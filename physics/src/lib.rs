//! Model the CPU and network cost of classical, hybrid, and post-quantum TLS 1.3 handshakes.
//!
//! # Overview
//!
//! A handshake is modeled as a pipeline:
//!
//! ```txt
//! Suite -> SuiteParams -> CryptoCostRecord -> SimulationResult
//!          (byte sizes,   (CPU time per      (segments, IW10,
//!           complexity)    phase, payloads)   RTTs, latency)
//! ```
//!
//! [suite] holds the published key, ciphertext, and signature sizes of each primitive and
//! how each [Suite] combines them. [workload] converts an abstract complexity into real CPU
//! time by burning cycles on transcendental math (it never sleeps, so the result reflects
//! system load and hardware variance). [cost] aggregates both into a [CryptoCostRecord] and
//! [network] derives TCP segmentation, RFC 6928 initial congestion window (IW10) overflow,
//! the number of round trips, and the end-to-end latency.
//!
//! No real cryptography is performed and byte counts are a deliberately simplified model of
//! a TLS flight, not a reproduction of any particular stack.
//!
//! # Concurrency
//!
//! Every entry point is synchronous and free of shared mutable state. Calls may be made from
//! any number of threads at once (see [sample] for a parallel helper).
//!
//! # Example
//!
//! ```rust
//! use pqlab_physics::{simulate, Suite, DEFAULT_BANDWIDTH_MBPS};
//!
//! let result = simulate(Suite::Pure, 30.0, DEFAULT_BANDWIDTH_MBPS).unwrap();
//! assert!(result.exceeds_iw10);
//! assert_eq!(result.required_rtts, 2);
//! ```

use thiserror::Error;

pub mod cost;
pub mod network;
pub mod sample;
pub mod suite;
pub mod workload;

pub use cost::{compute_cost, compute_cost_with, CryptoCostRecord};
pub use network::{
    evaluate, simulate, simulate_with, Link, SimulationResult, DEFAULT_BANDWIDTH_MBPS,
    IW10_LIMIT, MSS, MTU,
};
pub use sample::{sample, sample_with};
pub use suite::{PrimitiveSpec, Suite, SuiteParams};
pub use workload::{estimate_workload_ms, Calibrated, Fixed, Workload};

/// Errors that can occur when simulating a handshake.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid parameter: {name}={value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("unknown suite: {0}")]
    UnknownSuite(String),
}
