//! Aggregate persisted records into per-algorithm statistics.

use crate::record::{HandshakeRecord, Source};
use colored::Colorize;
use std::collections::BTreeMap;

/// Statistics for one `(algorithm, source)` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub algorithm: String,
    pub source: Source,
    pub count: usize,
    /// Fraction of records with a successful handshake.
    pub success_rate: f64,
    pub mean_latency_ms: f64,
    pub median_latency_ms: f64,
    pub std_dev_latency_ms: f64,
    pub mean_client_bytes: f64,
    /// Fraction of records whose ClientHello spans more than one segment.
    pub fragmentation_rate: f64,
}

/// Arithmetic mean (`0` for an empty slice).
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Median, sorting `data` in place (`0` for an empty slice).
pub fn median(data: &mut [f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.sort_by(|a, b| a.total_cmp(b));
    let mid = data.len() / 2;
    if data.len() % 2 == 0 {
        (data[mid - 1] + data[mid]) / 2.0
    } else {
        data[mid]
    }
}

/// Sample standard deviation (`None` with fewer than two observations).
pub fn std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let avg = mean(data);
    let variance =
        data.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Group records by algorithm and source.
///
/// Latency statistics only consider successful handshakes, since failed records carry no
/// latency.
pub fn summarize(records: &[HandshakeRecord]) -> Vec<Summary> {
    let mut groups: BTreeMap<(String, Source), Vec<&HandshakeRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.algorithm.clone(), record.source))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((algorithm, source), group)| {
            let count = group.len();
            let successful: Vec<&HandshakeRecord> =
                group.iter().copied().filter(|r| r.supported).collect();
            let mut latencies: Vec<f64> =
                successful.iter().map(|r| r.handshake_latency_ms).collect();
            let bytes: Vec<f64> = group.iter().map(|r| r.phase2_total_bytes as f64).collect();
            let fragmented = group.iter().filter(|r| r.phase2_fragmented).count();
            Summary {
                algorithm,
                source,
                count,
                success_rate: successful.len() as f64 / count as f64,
                mean_latency_ms: mean(&latencies),
                std_dev_latency_ms: std_dev(&latencies).unwrap_or(0.0),
                median_latency_ms: median(&mut latencies),
                mean_client_bytes: mean(&bytes),
                fragmentation_rate: fragmented as f64 / count as f64,
            }
        })
        .collect()
}

/// Print summaries to stdout.
pub fn print(summaries: &[Summary]) {
    println!("{}", "\nhandshake summary:\n".bold().blue());
    if summaries.is_empty() {
        println!("{}", "    no records".yellow());
        return;
    }
    for summary in summaries {
        let source = format!("{:?}", summary.source);
        println!(
            "{}",
            format!("{} [{}] (n={})", summary.algorithm, source, summary.count).green()
        );
        let stat_line = format!(
            "    latency mean: {:.2}ms (stdv: {:.2}ms) | median: {:.2}ms",
            summary.mean_latency_ms, summary.std_dev_latency_ms, summary.median_latency_ms
        );
        println!("{}", stat_line.cyan());
        let stat_line = format!(
            "    success: {:.1}% | client bytes: {:.0} | fragmented: {:.1}%",
            summary.success_rate * 100.0,
            summary.mean_client_bytes,
            summary.fragmentation_rate * 100.0
        );
        println!("{}", stat_line.magenta());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(algorithm: &str, source: Source, latency: f64, supported: bool) -> HandshakeRecord {
        let mut record = HandshakeRecord::failed(algorithm);
        record.source = source;
        record.supported = supported;
        record.handshake_latency_ms = latency;
        record.phase2_total_bytes = 1416;
        record.phase2_fragmented = false;
        record
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), 0.0);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[1.0]), None);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138089935299395).abs() < 1e-12);
    }

    #[test]
    fn test_summarize() {
        let records = vec![
            record("kyber768", Source::PhysicsEngine, 70.0, true),
            record("kyber768", Source::PhysicsEngine, 90.0, true),
            record("kyber768", Source::RealDocker, 12.0, true),
            record("kyber768", Source::RealDocker, 0.0, false),
            record("X25519", Source::PhysicsEngine, 60.0, true),
        ];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 3);

        // Ordered by algorithm, then source
        assert_eq!(summaries[0].algorithm, "X25519");
        let real = &summaries[1];
        assert_eq!(real.algorithm, "kyber768");
        assert_eq!(real.source, Source::RealDocker);
        assert_eq!(real.count, 2);
        assert_eq!(real.success_rate, 0.5);
        assert_eq!(real.mean_latency_ms, 12.0);
        assert_eq!(real.std_dev_latency_ms, 0.0);

        let physics = &summaries[2];
        assert_eq!(physics.algorithm, "kyber768");
        assert_eq!(physics.source, Source::PhysicsEngine);
        assert_eq!(physics.count, 2);
        assert_eq!(physics.mean_latency_ms, 80.0);
        assert_eq!(physics.median_latency_ms, 80.0);
        assert_eq!(physics.success_rate, 1.0);
        assert_eq!(physics.mean_client_bytes, 1416.0);
        assert_eq!(real.fragmentation_rate, 0.0);
    }
}
