//! Published primitive sizes and the suites that combine them.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Byte sizes of a single cryptographic primitive.
///
/// A field is `0` when the primitive produces no such artifact (e.g. a KEM has no signature).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimitiveSpec {
    pub public_key_bytes: usize,
    pub ciphertext_bytes: usize,
    pub signature_bytes: usize,
}

/// X25519 key share, paired with an Ed25519-sized signature.
pub const X25519: PrimitiveSpec = PrimitiveSpec {
    public_key_bytes: 32,
    ciphertext_bytes: 0,
    signature_bytes: 64,
};

/// ML-KEM-768 (FIPS 203).
pub const ML_KEM_768: PrimitiveSpec = PrimitiveSpec {
    public_key_bytes: 1184,
    ciphertext_bytes: 1088,
    signature_bytes: 0,
};

/// ML-DSA-65 (round 3 Dilithium3 signature length).
pub const ML_DSA_65: PrimitiveSpec = PrimitiveSpec {
    public_key_bytes: 1952,
    ciphertext_bytes: 0,
    signature_bytes: 3293,
};

/// Metadata bytes carried by each certificate besides its key and signature.
pub const CERT_OVERHEAD: usize = 800;

/// Number of certificates in a chain (leaf, intermediate, root).
pub const CERT_CHAIN_DEPTH: usize = 3;

/// Approximate size of a classical (ECDSA/RSA) certificate chain.
pub const CLASSICAL_CERT_CHAIN: usize = 2500;

/// Fixed ClientHello bytes excluding the key share.
pub const CLIENT_HELLO_HEADER: usize = 200;

/// Fixed server flight bytes excluding key share, certificates, and signature.
pub const SERVER_FLIGHT_HEADER: usize = 250;

/// The cryptographic configuration of a handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Suite {
    /// X25519 key exchange with classical certificates.
    Classic,
    /// X25519 + ML-KEM-768 key exchange with classical certificates.
    Hybrid,
    /// ML-KEM-768 key exchange with an ML-DSA-65 certificate chain.
    Pure,
}

/// Workload complexities and byte sizes that drive the cost of a [Suite].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuiteParams {
    pub keygen_complexity: f64,
    pub encaps_complexity: f64,
    pub verify_complexity: f64,
    pub client_key_share: usize,
    pub server_key_share: usize,
    pub signature: usize,
    pub cert_chain: usize,
}

impl Suite {
    /// All suites, from classical to post-quantum.
    pub const ALL: [Suite; 3] = [Suite::Classic, Suite::Hybrid, Suite::Pure];

    /// Upper-case tag used in serialized output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Suite::Classic => "CLASSIC",
            Suite::Hybrid => "HYBRID",
            Suite::Pure => "PURE",
        }
    }

    /// Look up the parameters of this suite.
    ///
    /// HYBRID verification keeps the classical complexity: only the key exchange gains the
    /// post-quantum component, certificates stay classical.
    pub const fn params(&self) -> SuiteParams {
        match self {
            Suite::Classic => SuiteParams {
                keygen_complexity: 0.5,
                encaps_complexity: 0.5,
                verify_complexity: 1.0,
                client_key_share: X25519.public_key_bytes,
                server_key_share: X25519.public_key_bytes,
                signature: X25519.signature_bytes,
                cert_chain: CLASSICAL_CERT_CHAIN,
            },
            Suite::Hybrid => SuiteParams {
                keygen_complexity: 0.5 + 2.0,
                encaps_complexity: 0.5 + 2.0,
                verify_complexity: 1.0,
                client_key_share: X25519.public_key_bytes + ML_KEM_768.public_key_bytes,
                server_key_share: X25519.public_key_bytes + ML_KEM_768.ciphertext_bytes,
                signature: X25519.signature_bytes,
                cert_chain: CLASSICAL_CERT_CHAIN,
            },
            Suite::Pure => SuiteParams {
                keygen_complexity: 2.0,
                encaps_complexity: 2.0,
                verify_complexity: 5.0,
                client_key_share: ML_KEM_768.public_key_bytes,
                server_key_share: ML_KEM_768.ciphertext_bytes,
                signature: ML_DSA_65.signature_bytes,
                cert_chain: CERT_CHAIN_DEPTH
                    * (ML_DSA_65.public_key_bytes + ML_DSA_65.signature_bytes + CERT_OVERHEAD),
            },
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Suite {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CLASSIC" => Ok(Suite::Classic),
            "HYBRID" => Ok(Suite::Hybrid),
            "PURE" => Ok(Suite::Pure),
            _ => Err(Error::UnknownSuite(s.to_string())),
        }
    }
}
