//! Drive real TLS 1.3 handshakes through an external client.
//!
//! The client (an OQS-enabled `openssl s_client`) runs inside a container and connects to a
//! server container. Its textual output is analyzed to determine whether the handshake
//! succeeded and which group was negotiated. Invocation failures (the process could not be
//! spawned, timed out, or exited with a failure) are retried up to [MAX_ATTEMPTS] times.

use crate::{
    record::{now, overhead, throughput_req_s, HandshakeRecord, Source},
    scenario::technical_group,
    Error,
};
use pqlab_physics::{
    network::round_to,
    suite::{CLIENT_HELLO_HEADER, ML_KEM_768, X25519},
    MSS,
};
use std::{process::Stdio, time::Duration};
use tokio::{
    io::AsyncWriteExt,
    process::Command,
    time::{sleep, timeout, Instant},
};
use tracing::{debug, info, warn};

/// Maximum number of client invocations per measurement.
pub const MAX_ATTEMPTS: usize = 3;

/// Interval between invocations.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum duration of a single invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Number of output characters kept in a record.
pub const SNIPPET_LEN: usize = 500;

/// Estimated ClientHello size when the group carries an ML-DSA certificate request.
pub const ML_DSA_CLIENT_ESTIMATE: usize = 2500;

/// Where and how to run the TLS client.
#[derive(Clone, Debug)]
pub struct Target {
    /// Container runtime binary.
    pub docker: String,
    /// Container hosting the TLS client.
    pub container: String,
    /// `host:port` of the TLS server, as seen from the client container.
    pub server: String,
    /// TLS client binary inside the container.
    pub openssl: String,
    pub timeout: Duration,
    pub retry_interval: Duration,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            docker: "docker".to_string(),
            container: "pqc_client".to_string(),
            server: "pqc_server:4433".to_string(),
            openssl: "openssl".to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_interval: RETRY_INTERVAL,
        }
    }
}

/// Captured output of a client invocation.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    /// Whether the client process exited successfully.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Perform a real handshake for `group` and convert it into a record.
///
/// Latency covers every attempt, measured from before the first one.
pub async fn measure(target: &Target, group: &str) -> Result<HandshakeRecord, Error> {
    let technical = technical_group(group);
    info!(group, technical, "measuring real handshake");

    let start = Instant::now();
    let mut last = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match invoke(target, technical).await {
            Ok(transcript) if transcript.success => {
                last = Some(transcript);
                break;
            }
            Ok(transcript) => {
                warn!(group, attempt, "client exited with failure");
                last = Some(transcript);
            }
            Err(err) if attempt == MAX_ATTEMPTS => return Err(err),
            Err(err) => {
                warn!(group, attempt, error = ?err, "failed to invoke client");
            }
        }
        if attempt < MAX_ATTEMPTS {
            sleep(target.retry_interval).await;
        }
    }
    let transcript = last.ok_or_else(|| Error::ConnectFailed(group.to_string()))?;
    let latency_ms = start.elapsed().as_secs_f64() * 1_000.0;

    analyze(group, &transcript, latency_ms)
}

/// Run the client once.
async fn invoke(target: &Target, group: &str) -> Result<Transcript, Error> {
    let mut child = Command::new(&target.docker)
        .arg("exec")
        .arg(&target.container)
        .arg(&target.openssl)
        .arg("s_client")
        .arg("-connect")
        .arg(&target.server)
        .arg("-groups")
        .arg(group)
        .arg("-tls1_3")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Ask the client to quit as soon as the handshake completes
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(b"Q").await {
            debug!(error = ?err, "client closed stdin early");
        }
    }

    let output = timeout(target.timeout, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout(target.timeout))??;
    Ok(Transcript {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Convert a client transcript into a record.
///
/// Fails if the client container is missing or the client could not reach the server.
pub fn analyze(
    group: &str,
    transcript: &Transcript,
    latency_ms: f64,
) -> Result<HandshakeRecord, Error> {
    let full = format!("{}\n[STDERR]\n{}", transcript.stdout, transcript.stderr);
    if !transcript.success && transcript.stderr.contains("Container") {
        let reason = transcript.stderr.lines().next().unwrap_or_default().trim();
        return Err(Error::ContainerUnavailable(reason.to_string()));
    }

    let negotiated = negotiated_group(&transcript.stdout).unwrap_or("Failed");
    let supported = transcript.stdout.contains("Cipher is TLS_AES");
    if !supported && full.contains("connect:errno") {
        return Err(Error::ConnectFailed(group.to_string()));
    }
    debug!(group, negotiated, supported, latency_ms, "analyzed handshake");

    let client_payload = estimate_client_payload(group);
    let overhead = overhead(client_payload);
    Ok(HandshakeRecord {
        timestamp: now(),
        algorithm: group.to_string(),
        supported,
        negotiated_details: format!("negotiated (docker): {negotiated}"),
        handshake_latency_ms: round_to(latency_ms, 2),
        phase1_key_share_bytes: client_payload.saturating_sub(CLIENT_HELLO_HEADER),
        phase2_total_bytes: client_payload,
        phase2_fragmented: client_payload > MSS,
        phase2_overhead_factor: round_to(overhead, 2),
        phase3_throughput_req_s: throughput_req_s(overhead),
        source: Source::RealDocker,
        raw_output_snippet: Some(full.chars().take(SNIPPET_LEN).collect()),
    })
}

/// Extract the group reported on the `Server Temp Key:` line.
pub fn negotiated_group(stdout: &str) -> Option<&str> {
    const MARKER: &str = "Server Temp Key: ";
    let start = stdout.find(MARKER)? + MARKER.len();
    let rest = &stdout[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}

/// Estimate the ClientHello size of a group from its name.
pub fn estimate_client_payload(group: &str) -> usize {
    let group = group.to_lowercase();
    if group.contains("x25519_kyber768") {
        CLIENT_HELLO_HEADER + X25519.public_key_bytes + ML_KEM_768.public_key_bytes
    } else if group.contains("kyber768") || group.contains("mlkem768") {
        CLIENT_HELLO_HEADER + ML_KEM_768.public_key_bytes
    } else if group.contains("dilithium") || group.contains("mldsa") {
        ML_DSA_CLIENT_ESTIMATE
    } else {
        CLIENT_HELLO_HEADER + X25519.public_key_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const SUCCESS_STDOUT: &str = "CONNECTED(00000003)\n\
        ---\n\
        Server Temp Key: X25519MLKEM768, 1216 bits\n\
        ---\n\
        New, TLSv1.3, Cipher is TLS_AES_256_GCM_SHA384\n";

    #[test_case("x25519_kyber768", 1416; "hybrid")]
    #[test_case("kyber768", 1384; "pure")]
    #[test_case("MLKEM768", 1384; "pure technical name")]
    #[test_case("mldsa65", 2500; "signature")]
    #[test_case("X25519", 232; "classic")]
    fn test_estimate_client_payload(group: &str, expected: usize) {
        assert_eq!(estimate_client_payload(group), expected);
    }

    #[test]
    fn test_negotiated_group() {
        assert_eq!(negotiated_group(SUCCESS_STDOUT), Some("X25519MLKEM768"));
        assert_eq!(negotiated_group("Server Temp Key: mlkem768\n"), Some("mlkem768"));
        assert_eq!(negotiated_group("no key here"), None);
        assert_eq!(negotiated_group("Server Temp Key: \n"), None);
    }

    #[test]
    fn test_analyze_success() {
        let transcript = Transcript {
            success: true,
            stdout: SUCCESS_STDOUT.to_string(),
            stderr: String::new(),
        };
        let record = analyze("x25519_kyber768", &transcript, 41.237).unwrap();
        assert!(record.supported);
        assert_eq!(record.source, Source::RealDocker);
        assert_eq!(record.negotiated_details, "negotiated (docker): X25519MLKEM768");
        assert_eq!(record.handshake_latency_ms, 41.24);
        assert_eq!(record.phase1_key_share_bytes, 1216);
        assert_eq!(record.phase2_total_bytes, 1416);
        assert!(!record.phase2_fragmented);
        assert_eq!(record.phase2_overhead_factor, 3.28);
        assert_eq!(record.phase3_throughput_req_s, 305);
        let snippet = record.raw_output_snippet.unwrap();
        assert!(snippet.starts_with("CONNECTED"));
        assert!(snippet.contains("[STDERR]"));
    }

    #[test]
    fn test_analyze_unsupported() {
        let transcript = Transcript {
            success: true,
            stdout: "CONNECTED(00000003)\nno peer certificate available\n".to_string(),
            stderr: "handshake failure\n".to_string(),
        };
        let record = analyze("kyber768", &transcript, 12.0).unwrap();
        assert!(!record.supported);
        assert_eq!(record.negotiated_details, "negotiated (docker): Failed");
    }

    #[test]
    fn test_analyze_missing_container() {
        let transcript = Transcript {
            success: false,
            stdout: String::new(),
            stderr: "Error response from daemon: Container pqc_client is not running\n".to_string(),
        };
        let err = analyze("X25519", &transcript, 5.0).unwrap_err();
        assert!(matches!(err, Error::ContainerUnavailable(reason) if reason.contains("pqc_client")));
    }

    #[test]
    fn test_analyze_connect_failure() {
        let transcript = Transcript {
            success: false,
            stdout: String::new(),
            stderr: "4037E1F1:error:8000006F:system library:BIO_connect:Connection refused\nconnect:errno=111\n"
                .to_string(),
        };
        let err = analyze("X25519", &transcript, 5.0).unwrap_err();
        assert!(matches!(err, Error::ConnectFailed(group) if group == "X25519"));
    }

    #[test]
    fn test_snippet_truncated() {
        let transcript = Transcript {
            success: true,
            stdout: "é".repeat(2 * SNIPPET_LEN),
            stderr: String::new(),
        };
        let record = analyze("X25519", &transcript, 1.0).unwrap();
        assert_eq!(
            record.raw_output_snippet.unwrap().chars().count(),
            SNIPPET_LEN
        );
    }

    #[tokio::test]
    async fn test_measure_spawn_failure() {
        let target = Target {
            docker: "/nonexistent/pqlab-docker".to_string(),
            retry_interval: Duration::ZERO,
            ..Default::default()
        };
        let err = measure(&target, "X25519").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_measure_runs_client() {
        // `echo` stands in for the container runtime and prints the client invocation
        let target = Target {
            docker: "echo".to_string(),
            retry_interval: Duration::ZERO,
            ..Default::default()
        };
        let record = measure(&target, "kyber768").await.unwrap();
        assert!(!record.supported);
        assert_eq!(record.source, Source::RealDocker);
        let snippet = record.raw_output_snippet.unwrap();
        assert!(snippet.contains("-groups mlkem768"));
        assert!(snippet.contains("-connect pqc_server:4433"));
    }
}
