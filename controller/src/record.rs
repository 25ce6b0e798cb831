//! Flat handshake records persisted for external consumers.

use pqlab_physics::{network::round_to, SimulationResult};
use serde::{Deserialize, Serialize};

/// Reference payload used to normalize byte counts into an overhead factor.
///
/// This is a fixed normalization constant shared with the consumers of the report, not a
/// value derived from any suite.
pub const OVERHEAD_BASELINE: f64 = 432.0;

/// Where a record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    /// A handshake performed by the real TLS client.
    RealDocker,
    /// A prediction from the physics engine.
    PhysicsEngine,
    /// A real handshake that could not be performed.
    RealDockerFailed,
}

/// A single measured or simulated handshake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandshakeRecord {
    pub timestamp: String,
    pub algorithm: String,
    pub supported: bool,
    pub negotiated_details: String,
    pub handshake_latency_ms: f64,
    pub phase1_key_share_bytes: usize,
    pub phase2_total_bytes: usize,
    pub phase2_fragmented: bool,
    pub phase2_overhead_factor: f64,
    pub phase3_throughput_req_s: u64,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_output_snippet: Option<String>,
}

/// Current time as an RFC 3339 string.
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Unrounded ratio of `bytes` to [OVERHEAD_BASELINE].
pub fn overhead(bytes: usize) -> f64 {
    bytes as f64 / OVERHEAD_BASELINE
}

/// Requests per second sustainable at the given overhead factor (`0` if the factor is not
/// positive).
pub fn throughput_req_s(overhead: f64) -> u64 {
    if overhead > 0.0 {
        (1_000.0 / overhead).floor() as u64
    } else {
        0
    }
}

impl HandshakeRecord {
    /// Convert a physics prediction into a record.
    ///
    /// The overhead factor is derived from the server flight.
    pub fn from_simulation(group: &str, result: &SimulationResult) -> Self {
        let overhead = overhead(result.metrics.server_payload_size);
        Self {
            timestamp: now(),
            algorithm: group.to_string(),
            supported: true,
            negotiated_details: format!("simulated: {group}"),
            handshake_latency_ms: round_to(result.total_latency_ms, 2),
            phase1_key_share_bytes: result.metrics.key_share_size,
            phase2_total_bytes: result.metrics.client_payload_size,
            phase2_fragmented: result.fragmentation_risk,
            phase2_overhead_factor: round_to(overhead, 2),
            phase3_throughput_req_s: throughput_req_s(overhead),
            source: Source::PhysicsEngine,
            raw_output_snippet: None,
        }
    }

    /// A placeholder for a real handshake that could not be performed.
    pub fn failed(group: &str) -> Self {
        Self {
            timestamp: now(),
            algorithm: group.to_string(),
            supported: false,
            negotiated_details: "error: docker connection failed".to_string(),
            handshake_latency_ms: 0.0,
            phase1_key_share_bytes: 0,
            phase2_total_bytes: 0,
            phase2_fragmented: false,
            phase2_overhead_factor: 0.0,
            phase3_throughput_req_s: 0,
            source: Source::RealDockerFailed,
            raw_output_snippet: None,
        }
    }
}
