//! Derive segmentation, congestion window, and round-trip consequences of a handshake.
//!
//! # Model
//!
//! Both flights are cut into [MSS]-sized segments. If the server flight is larger than the
//! RFC 6928 initial congestion window ([IW10_LIMIT]), the server must wait for an
//! acknowledgement before sending the rest, costing one extra round trip. End-to-end latency
//! is then:
//!
//! ```txt
//! rtt (TCP setup) + required_rtts * rtt (TLS) + cpu + transmission
//! ```

use crate::{
    cost::{compute_cost_with, CryptoCostRecord},
    workload::{Calibrated, Workload},
    Error, Suite,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum transmission unit of the modeled link.
pub const MTU: usize = 1500;

/// Maximum segment size (MTU minus IPv4 and TCP headers).
pub const MSS: usize = 1460;

/// Segments in the initial congestion window (RFC 6928).
pub const IW10_SEGMENTS: usize = 10;

/// Bytes a sender may transmit before its first acknowledgement.
pub const IW10_LIMIT: usize = IW10_SEGMENTS * MSS;

/// Link bandwidth used when none is provided.
pub const DEFAULT_BANDWIDTH_MBPS: f64 = 100.0;

/// A validated network path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    rtt_ms: f64,
    bandwidth_mbps: f64,
}

impl Link {
    /// Create a link, rejecting negative round-trip times and non-positive bandwidths.
    pub fn new(rtt_ms: f64, bandwidth_mbps: f64) -> Result<Self, Error> {
        if !rtt_ms.is_finite() || rtt_ms < 0.0 {
            return Err(Error::InvalidParameter {
                name: "link_rtt_ms",
                value: rtt_ms,
            });
        }
        if !bandwidth_mbps.is_finite() || bandwidth_mbps <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "bandwidth_mbps",
                value: bandwidth_mbps,
            });
        }
        Ok(Self {
            rtt_ms,
            bandwidth_mbps,
        })
    }

    /// Create a link with [DEFAULT_BANDWIDTH_MBPS].
    pub fn with_rtt(rtt_ms: f64) -> Result<Self, Error> {
        Self::new(rtt_ms, DEFAULT_BANDWIDTH_MBPS)
    }

    pub fn rtt_ms(&self) -> f64 {
        self.rtt_ms
    }

    pub fn bandwidth_mbps(&self) -> f64 {
        self.bandwidth_mbps
    }
}

/// Outcome of a simulated handshake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub suite: Suite,
    pub metrics: CryptoCostRecord,
    pub mtu: usize,
    pub mss: usize,
    pub client_segments: usize,
    pub server_segments: usize,
    pub server_flight_bytes: usize,
    pub iw10_limit: usize,
    pub exceeds_iw10: bool,
    /// Round trips spent on the TLS exchange (1, or 2 when the server flight exceeds IW10).
    pub required_rtts: u32,
    pub transmission_time_ms: f64,
    pub total_latency_ms: f64,
    /// Whether the ClientHello spans more than one segment.
    pub fragmentation_risk: bool,
    /// Server flight bytes per ClientHello byte, rounded to one decimal.
    pub amplification_factor: f64,
}

/// Number of [MSS]-sized segments needed to carry `bytes`.
pub fn segments(bytes: usize) -> usize {
    bytes.div_ceil(MSS)
}

/// Whether a flight of `bytes` overflows the initial congestion window.
pub fn exceeds_iw10(bytes: usize) -> bool {
    bytes > IW10_LIMIT
}

/// Time to serialize `bytes` onto a link of `bandwidth_mbps`.
pub fn transmission_time_ms(bytes: usize, bandwidth_mbps: f64) -> f64 {
    (bytes as f64 * 8.0) / (bandwidth_mbps * 1_000_000.0) * 1_000.0
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Simulate a handshake using the calibrated CPU workload.
///
/// Fails with [Error::InvalidParameter] if `link_rtt_ms` is negative or `bandwidth_mbps` is
/// not positive.
pub fn simulate(
    suite: Suite,
    link_rtt_ms: f64,
    bandwidth_mbps: f64,
) -> Result<SimulationResult, Error> {
    let link = Link::new(link_rtt_ms, bandwidth_mbps)?;
    Ok(simulate_with(suite, &link, &Calibrated::default()))
}

/// Simulate a handshake over `link` using the provided [Workload].
pub fn simulate_with<W: Workload + ?Sized>(
    suite: Suite,
    link: &Link,
    workload: &W,
) -> SimulationResult {
    let metrics = compute_cost_with(suite, workload);
    model(suite, metrics, link)
}

/// Apply the network model to an existing cost record.
///
/// Fails with [Error::InvalidParameter] if either flight is empty (it would have no segments
/// and no amplification factor) or if the CPU time is negative or not finite.
pub fn evaluate(
    suite: Suite,
    metrics: CryptoCostRecord,
    link: &Link,
) -> Result<SimulationResult, Error> {
    if metrics.client_payload_size == 0 {
        return Err(Error::InvalidParameter {
            name: "client_payload_size",
            value: 0.0,
        });
    }
    if metrics.server_payload_size == 0 {
        return Err(Error::InvalidParameter {
            name: "server_payload_size",
            value: 0.0,
        });
    }
    let cpu_time_ms = metrics.cpu_time_ms();
    if !cpu_time_ms.is_finite() || cpu_time_ms < 0.0 {
        return Err(Error::InvalidParameter {
            name: "cpu_time_ms",
            value: cpu_time_ms,
        });
    }
    Ok(model(suite, metrics, link))
}

fn model(suite: Suite, metrics: CryptoCostRecord, link: &Link) -> SimulationResult {
    // Segmentation
    let client_segments = segments(metrics.client_payload_size);
    let server_segments = segments(metrics.server_payload_size);

    // Congestion window (a server flight beyond IW10 stalls for one extra round trip)
    let exceeds_iw10 = exceeds_iw10(metrics.server_payload_size);
    let required_rtts = if exceeds_iw10 { 2 } else { 1 };

    // Latency
    let transmission_time_ms = transmission_time_ms(
        metrics.client_payload_size + metrics.server_payload_size,
        link.bandwidth_mbps,
    );
    let total_latency_ms = link.rtt_ms
        + (required_rtts as f64 * link.rtt_ms)
        + metrics.cpu_time_ms()
        + transmission_time_ms;

    let amplification_factor = round_to(
        metrics.server_payload_size as f64 / metrics.client_payload_size as f64,
        1,
    );
    debug!(
        %suite,
        client_segments,
        server_segments,
        exceeds_iw10,
        required_rtts,
        total_latency_ms,
        "simulated handshake"
    );

    SimulationResult {
        suite,
        server_flight_bytes: metrics.server_payload_size,
        metrics,
        mtu: MTU,
        mss: MSS,
        client_segments,
        server_segments,
        iw10_limit: IW10_LIMIT,
        exceeds_iw10,
        required_rtts,
        transmission_time_ms,
        total_latency_ms,
        fragmentation_risk: client_segments > 1,
        amplification_factor,
    }
}
