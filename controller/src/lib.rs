//! Schedule, measure, and persist real and simulated post-quantum TLS handshakes.
//!
//! The lab cycles through a catalogue of key-exchange groups ([scenario]) and, depending on
//! the mode selected in a shared configuration file ([config]), either drives a real TLS
//! client against a live server ([real]) or asks the physics engine for a prediction
//! ([pqlab_physics]). Every measurement becomes a flat [record::HandshakeRecord] appended to
//! a JSON report ([store]) that external front ends read. [summary] compares the two sources
//! from the command line.

use thiserror::Error;

pub mod config;
pub mod lab;
pub mod real;
pub mod record;
pub mod scenario;
pub mod store;
pub mod summary;

/// Returns the version of the crate.
pub const fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Errors that can occur while running the lab.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("physics error: {0}")]
    Physics(#[from] pqlab_physics::Error),
    #[error("handshake timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("client container unavailable: {0}")]
    ContainerUnavailable(String),
    #[error("client could not connect to the server (group: {0})")]
    ConnectFailed(String),
    #[error("unknown mode: {0}")]
    UnknownMode(String),
    #[error("invalid rtt range: {0}..{1}")]
    InvalidRttRange(f64, f64),
}
