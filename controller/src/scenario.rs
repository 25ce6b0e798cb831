//! Key-exchange groups exercised by the lab.

use pqlab_physics::Suite;
use rand::{seq::SliceRandom, Rng};

/// A named key-exchange group and the suite that models it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scenario {
    /// Group name as reported in persisted records.
    pub group: &'static str,
    pub suite: Suite,
}

/// All scenarios, one per suite.
pub const SCENARIOS: [Scenario; 3] = [
    Scenario {
        group: "X25519",
        suite: Suite::Classic,
    },
    Scenario {
        group: "x25519_kyber768",
        suite: Suite::Hybrid,
    },
    Scenario {
        group: "kyber768",
        suite: Suite::Pure,
    },
];

/// Map a legacy group name to the name understood by the TLS client.
///
/// Unknown names are passed through unchanged.
pub fn technical_group(group: &str) -> &str {
    match group {
        "kyber768" => "mlkem768",
        "x25519_kyber768" => "X25519MLKEM768",
        "X25519" => "X25519",
        other => other,
    }
}

/// Pick a random, non-empty subset of [SCENARIOS] in random order.
pub fn choose<R: Rng>(rng: &mut R) -> Vec<Scenario> {
    let count = rng.gen_range(1..=SCENARIOS.len());
    SCENARIOS.choose_multiple(rng, count).copied().collect()
}
