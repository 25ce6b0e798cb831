//! Aggregate CPU time and payload sizes for a single handshake.

use crate::{
    suite::{CLIENT_HELLO_HEADER, SERVER_FLIGHT_HEADER},
    workload::{Calibrated, Workload},
    Suite,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// CPU time per phase and the bytes each side puts on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CryptoCostRecord {
    pub keygen_time_ms: f64,
    pub encaps_time_ms: f64,
    pub verify_time_ms: f64,
    /// ClientHello bytes (header plus client key share).
    pub client_payload_size: usize,
    /// Server flight bytes (header, key share, certificate chain, and signature).
    pub server_payload_size: usize,
    /// Client key share bytes.
    pub key_share_size: usize,
}

impl CryptoCostRecord {
    /// Total CPU time spent across keygen, encapsulation, and verification.
    pub fn cpu_time_ms(&self) -> f64 {
        self.keygen_time_ms + self.encaps_time_ms + self.verify_time_ms
    }
}

/// Compute the cost of a handshake using the calibrated CPU workload.
pub fn compute_cost(suite: Suite) -> CryptoCostRecord {
    compute_cost_with(suite, &Calibrated::default())
}

/// Compute the cost of a handshake using the provided [Workload].
///
/// Keygen, encapsulation, and verification are measured independently.
pub fn compute_cost_with<W: Workload + ?Sized>(suite: Suite, workload: &W) -> CryptoCostRecord {
    let params = suite.params();
    let keygen_time_ms = workload.run(params.keygen_complexity);
    let encaps_time_ms = workload.run(params.encaps_complexity);
    let verify_time_ms = workload.run(params.verify_complexity);

    let client_payload_size = CLIENT_HELLO_HEADER + params.client_key_share;
    let server_payload_size =
        SERVER_FLIGHT_HEADER + params.server_key_share + params.cert_chain + params.signature;
    trace!(
        %suite,
        keygen_time_ms,
        encaps_time_ms,
        verify_time_ms,
        client_payload_size,
        server_payload_size,
        "computed handshake cost"
    );

    CryptoCostRecord {
        keygen_time_ms,
        encaps_time_ms,
        verify_time_ms,
        client_payload_size,
        server_payload_size,
        key_share_size: params.client_key_share,
    }
}
