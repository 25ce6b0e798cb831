//! pqlab CLI

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use pqlab_controller::{
    config::Config,
    crate_version,
    lab::Lab,
    real::Target,
    store::read_records,
    summary::{self, mean, median, std_dev},
    Error,
};
use pqlab_physics::{sample, simulate, Link, Suite};
use rand::Rng;
use std::{path::PathBuf, process::ExitCode, time::Duration};
use tracing::{error, info};

/// Flag for verbose output
const VERBOSE_FLAG: &str = "verbose";

const RUN_CMD: &str = "run";
const SIMULATE_CMD: &str = "simulate";
const SUMMARY_CMD: &str = "summary";

/// Default location of the persisted report
const DEFAULT_REPORT: &str = "captures/real_scan_results.json";

/// Entrypoint for the pqlab CLI
#[tokio::main]
async fn main() -> ExitCode {
    // Define application
    let matches = Command::new("pqlab")
        .version(crate_version())
        .about("Compare real and simulated post-quantum TLS 1.3 handshakes.")
        .arg(
            Arg::new(VERBOSE_FLAG)
                .short('v')
                .long(VERBOSE_FLAG)
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new(RUN_CMD)
                .about("Continuously measure handshakes in the mode selected by the lab config file.")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .default_value("lab_config.json")
                        .help("Path to the JSON mode/pause file")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .default_value(DEFAULT_REPORT)
                        .help("Path to the JSON report")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("debug-dump")
                        .long("debug-dump")
                        .default_value("captures/debug_data_dump.json")
                        .help("Path to the debug copy of the newest records")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .default_value("5")
                        .help("Seconds between cycles")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("pause-interval")
                        .long("pause-interval")
                        .default_value("2")
                        .help("Seconds between polls of the lab config file while paused")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("settle-interval")
                        .long("settle-interval")
                        .default_value("1")
                        .help("Seconds to wait after a mode change")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("max-records")
                        .long("max-records")
                        .default_value("2000")
                        .help("Maximum records kept in the report (must be >= 1)")
                        .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..)),
                )
                .arg(
                    Arg::new("min-rtt")
                        .long("min-rtt")
                        .default_value("20")
                        .help("Lower bound of simulated round-trip times (ms)")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("max-rtt")
                        .long("max-rtt")
                        .default_value("40")
                        .help("Upper bound of simulated round-trip times (ms)")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("bandwidth")
                        .long("bandwidth")
                        .default_value("100")
                        .help("Bandwidth of simulated links (Mbps)")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("docker")
                        .long("docker")
                        .default_value("docker")
                        .help("Container runtime used to reach the TLS client")
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .default_value("8")
                        .help("Seconds before a real handshake attempt is abandoned")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("container")
                        .long("container")
                        .default_value("pqc_client")
                        .help("Container running the TLS client")
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("server")
                        .long("server")
                        .default_value("pqc_server:4433")
                        .help("TLS server address as seen from the client container")
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("openssl")
                        .long("openssl")
                        .default_value("openssl")
                        .help("TLS client binary inside the container")
                        .value_parser(value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new(SIMULATE_CMD)
                .about("Simulate handshakes for a single suite and print the result.")
                .arg(
                    Arg::new("suite")
                        .long("suite")
                        .required(true)
                        .help("CLASSIC, HYBRID, or PURE")
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("rtt")
                        .long("rtt")
                        .default_value("30")
                        .help("Link round-trip time (ms)")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("bandwidth")
                        .long("bandwidth")
                        .default_value("100")
                        .help("Link bandwidth (Mbps)")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("samples")
                        .long("samples")
                        .default_value("1")
                        .help("Number of simulations to run in parallel (must be >= 1)")
                        .value_parser(clap::builder::RangedU64ValueParser::<usize>::new().range(1..)),
                )
                .arg(
                    Arg::new("jitter")
                        .long("jitter")
                        .default_value("0")
                        .help("Uniform jitter applied to the round-trip time of each sample (ms)")
                        .value_parser(value_parser!(f64)),
                ),
        )
        .subcommand(
            Command::new(SUMMARY_CMD)
                .about("Print per-algorithm statistics of a persisted report.")
                .arg(
                    Arg::new("report")
                        .long("report")
                        .default_value(DEFAULT_REPORT)
                        .help("Path to the JSON report")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .get_matches();

    // Create logger
    let level = if matches.get_flag(VERBOSE_FLAG) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Parse subcommands
    let result = match matches.subcommand() {
        Some((RUN_CMD, matches)) => run(matches).await,
        Some((SIMULATE_CMD, matches)) => simulate_cmd(matches),
        Some((SUMMARY_CMD, matches)) => summary_cmd(matches).await,
        Some((cmd, _)) => {
            error!(cmd, "invalid subcommand");
            return ExitCode::FAILURE;
        }
        None => {
            error!("no subcommand provided");
            return ExitCode::FAILURE;
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "command failed");
            ExitCode::FAILURE
        }
    }
}

/// Start the lab loop.
async fn run(matches: &ArgMatches) -> Result<(), Error> {
    let defaults = Config::default();
    let config = Config {
        lab_config: arg::<PathBuf>(matches, "config"),
        report: arg::<PathBuf>(matches, "report"),
        debug_dump: arg::<PathBuf>(matches, "debug-dump"),
        cycle_interval: Duration::from_secs(arg::<u64>(matches, "interval")),
        pause_interval: Duration::from_secs(arg::<u64>(matches, "pause-interval")),
        settle_interval: Duration::from_secs(arg::<u64>(matches, "settle-interval")),
        max_records: arg::<usize>(matches, "max-records"),
        rtt_range: arg::<f64>(matches, "min-rtt")..arg::<f64>(matches, "max-rtt"),
        bandwidth_mbps: arg::<f64>(matches, "bandwidth"),
        target: Target {
            docker: arg::<String>(matches, "docker"),
            timeout: Duration::from_secs(arg::<u64>(matches, "timeout")),
            container: arg::<String>(matches, "container"),
            server: arg::<String>(matches, "server"),
            openssl: arg::<String>(matches, "openssl"),
            ..defaults.target.clone()
        },
        ..defaults
    };
    Lab::new(config)?.run().await
}

/// Simulate one suite, either once (printed as JSON) or many times (printed as statistics).
fn simulate_cmd(matches: &ArgMatches) -> Result<(), Error> {
    let suite: Suite = arg::<String>(matches, "suite").parse()?;
    let rtt = arg::<f64>(matches, "rtt");
    let bandwidth = arg::<f64>(matches, "bandwidth");
    let samples = arg::<usize>(matches, "samples");
    let jitter = arg::<f64>(matches, "jitter");

    if samples == 1 {
        let result = simulate(suite, rtt, bandwidth)?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let links = jittered_links(&mut rand::thread_rng(), samples, rtt, jitter, bandwidth)?;
    info!(%suite, samples, rtt, jitter, bandwidth, "sampling handshakes");
    let results = sample(suite, &links);

    let latencies: Vec<f64> = results.iter().map(|r| r.total_latency_ms).collect();
    let cpu: Vec<f64> = results.iter().map(|r| r.metrics.cpu_time_ms()).collect();
    let first = &results[0];
    println!("{}", format!("\nresults for {suite} (n={samples}):\n").bold().cyan());
    println!(
        "{}",
        format!(
            "    client: {} bytes ({} segments) | server: {} bytes ({} segments)",
            first.metrics.client_payload_size,
            first.client_segments,
            first.metrics.server_payload_size,
            first.server_segments
        )
        .yellow()
    );
    println!(
        "{}",
        format!(
            "    exceeds iw10: {} | required rtts: {} | amplification: {:.1}x",
            first.exceeds_iw10, first.required_rtts, first.amplification_factor
        )
        .yellow()
    );
    print_stats("cpu", &cpu);
    print_stats("latency", &latencies);
    Ok(())
}

/// Build `samples` links whose RTT is drawn uniformly from `rtt ± jitter` (floored at zero).
///
/// The jitter must be finite and small enough that the drawn range stays finite.
fn jittered_links<R: Rng>(
    rng: &mut R,
    samples: usize,
    rtt: f64,
    jitter: f64,
    bandwidth: f64,
) -> Result<Vec<Link>, Error> {
    // Validate the unjittered link before drawing samples
    Link::new(rtt, bandwidth)?;
    let jitter = jitter.abs();
    if !(2.0 * jitter).is_finite() || !(rtt + jitter).is_finite() {
        return Err(pqlab_physics::Error::InvalidParameter {
            name: "jitter",
            value: jitter,
        }
        .into());
    }
    (0..samples)
        .map(|_| {
            let offset = if jitter > 0.0 {
                rng.gen_range(-jitter..=jitter)
            } else {
                0.0
            };
            Ok(Link::new((rtt + offset).max(0.0), bandwidth)?)
        })
        .collect()
}

/// Print statistics of a persisted report.
async fn summary_cmd(matches: &ArgMatches) -> Result<(), Error> {
    let report = arg::<PathBuf>(matches, "report");
    let records = read_records(&report).await?;
    info!(path = ?report, records = records.len(), "loaded report");
    summary::print(&summary::summarize(&records));
    Ok(())
}

fn print_stats(label: &str, data: &[f64]) {
    let mut sorted = data.to_vec();
    let mean = mean(data);
    let median = median(&mut sorted);
    let stdv = std_dev(data).unwrap_or(0.0);
    let stat_line =
        format!("    [{label}] mean: {mean:.2}ms (stdv: {stdv:.2}ms) | median: {median:.2}ms");
    println!("{}", stat_line.magenta());
}

/// Fetch an argument that always has a value (required or defaulted).
fn arg<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, name: &str) -> T {
    matches
        .get_one::<T>(name)
        .cloned()
        .unwrap_or_else(|| panic!("argument {name} has a default"))
}
