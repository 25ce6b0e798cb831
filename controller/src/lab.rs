//! The scheduling loop.
//!
//! Each iteration ([Lab::step]) re-reads the mode/pause file, then (unless paused or the mode
//! just changed) measures a random subset of [crate::scenario::SCENARIOS] and appends the
//! results to the report. All state lives in [Lab] and is threaded through explicitly.

use crate::{
    config::{read_lab_config, Config, Mode},
    real,
    record::HandshakeRecord,
    scenario::{self, Scenario},
    store::Store,
    Error,
};
use pqlab_physics::{simulate, Suite};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Outcome of a single iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The mode changed and the in-memory state was reset.
    ModeChanged { from: Mode, to: Mode },
    /// The lab is paused.
    Paused,
    /// A round of measurements was persisted.
    Completed { executed: usize, total: usize },
}

/// State of the lab controller.
pub struct Lab {
    config: Config,
    store: Store,
    mode: Mode,
    last_mode: Mode,
    paused: bool,
    records: Vec<HandshakeRecord>,
    rng: StdRng,
}

impl Lab {
    /// Create a lab in [Mode::Physics], running (not paused).
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a lab with a caller-provided source of randomness.
    pub fn with_rng(config: Config, rng: StdRng) -> Result<Self, Error> {
        config.validate()?;
        let store = Store::new(
            config.report.clone(),
            config.debug_dump.clone(),
            config.max_records,
        );
        Ok(Self {
            config,
            store,
            mode: Mode::Physics,
            last_mode: Mode::Physics,
            paused: false,
            records: Vec::new(),
            rng,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Records held in memory since the last reload.
    pub fn records(&self) -> &[HandshakeRecord] {
        &self.records
    }

    /// Run a single iteration.
    pub async fn step(&mut self) -> Result<Step, Error> {
        if let Some(update) = read_lab_config(&self.config.lab_config).await {
            if let Some(mode) = update.mode {
                self.mode = mode;
            }
            if let Some(paused) = update.paused {
                self.paused = paused;
            }
        }

        // A new mode starts from a clean slate
        if self.mode != self.last_mode {
            let step = Step::ModeChanged {
                from: self.last_mode,
                to: self.mode,
            };
            info!(from = %self.last_mode, to = %self.mode, "mode changed, resetting state");
            self.records.clear();
            self.last_mode = self.mode;
            return Ok(step);
        }
        if self.paused {
            return Ok(Step::Paused);
        }

        self.records = self.store.load().await;
        let scenarios = scenario::choose(&mut self.rng);
        let executed = scenarios.len();
        for scenario in scenarios {
            let record = self.measure(scenario).await?;
            self.records.push(record);
        }
        self.store.save(&mut self.records).await?;

        let total = self.records.len();
        info!(mode = %self.mode, executed, total, "cycle completed");
        Ok(Step::Completed { executed, total })
    }

    /// Run forever, sleeping between iterations.
    pub async fn run(mut self) -> Result<(), Error> {
        info!(
            lab_config = ?self.config.lab_config,
            report = ?self.config.report,
            "starting lab controller"
        );
        loop {
            let delay = match self.step().await {
                Ok(Step::ModeChanged { .. }) => self.config.settle_interval,
                Ok(Step::Paused) => {
                    info!("lab paused");
                    self.config.pause_interval
                }
                Ok(Step::Completed { .. }) => self.config.cycle_interval,
                Err(err) => {
                    error!(error = ?err, "cycle failed");
                    self.config.cycle_interval
                }
            };
            sleep(delay).await;
        }
    }

    async fn measure(&mut self, scenario: Scenario) -> Result<HandshakeRecord, Error> {
        match self.mode {
            Mode::Real => match real::measure(&self.config.target, scenario.group).await {
                Ok(record) => Ok(record),
                Err(err) => {
                    warn!(group = scenario.group, error = ?err, "real handshake failed");
                    Ok(HandshakeRecord::failed(scenario.group))
                }
            },
            Mode::Physics => {
                let rtt = self.rng.gen_range(self.config.rtt_range.clone());
                self.simulate(scenario.group, scenario.suite, rtt)
            }
        }
    }

    fn simulate(&self, group: &str, suite: Suite, rtt: f64) -> Result<HandshakeRecord, Error> {
        info!(group, %suite, rtt, "simulating handshake");
        let result = simulate(suite, rtt, self.config.bandwidth_mbps)?;
        Ok(HandshakeRecord::from_simulation(group, &result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Source;
    use std::{path::PathBuf, time::Duration};

    fn temp_config() -> (PathBuf, Config) {
        let dir = std::env::temp_dir().join(format!("pqlab_lab_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = Config {
            lab_config: dir.join("lab_config.json"),
            report: dir.join("captures").join("report.json"),
            debug_dump: dir.join("captures").join("debug.json"),
            cycle_interval: Duration::ZERO,
            pause_interval: Duration::ZERO,
            settle_interval: Duration::ZERO,
            max_records: 10,
            target: real::Target {
                docker: "/nonexistent/pqlab-docker".to_string(),
                retry_interval: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        };
        (dir, config)
    }

    fn write_lab_config(config: &Config, content: &str) {
        std::fs::write(&config.lab_config, content).unwrap();
    }

    #[tokio::test]
    async fn test_physics_cycle() {
        let (dir, config) = temp_config();
        let mut lab = Lab::with_rng(config, StdRng::seed_from_u64(0)).unwrap();

        let Step::Completed { executed, total } = lab.step().await.unwrap() else {
            panic!("expected a completed cycle");
        };
        assert!((1..=3).contains(&executed));
        assert_eq!(total, executed);
        for record in lab.records() {
            assert_eq!(record.source, Source::PhysicsEngine);
            assert!(record.supported);
            // Base RTT plus at least one handshake round trip, each at least 20ms
            assert!(record.handshake_latency_ms >= 40.0);
        }

        // History is reloaded from disk on the next cycle
        let Step::Completed { total, .. } = lab.step().await.unwrap() else {
            panic!("expected a completed cycle");
        };
        assert!(total > executed);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_history_capped() {
        let (dir, config) = temp_config();
        let mut lab = Lab::with_rng(config, StdRng::seed_from_u64(1)).unwrap();
        for _ in 0..20 {
            lab.step().await.unwrap();
        }
        assert_eq!(lab.records().len(), 10);
        assert_eq!(lab.store.load().await.len(), 10);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_pause() {
        let (dir, config) = temp_config();
        write_lab_config(&config, r#"{"mode": "PHYSICS", "paused": true}"#);
        let mut lab = Lab::with_rng(config.clone(), StdRng::seed_from_u64(2)).unwrap();

        assert_eq!(lab.step().await.unwrap(), Step::Paused);
        assert!(lab.paused());
        assert!(!config.report.exists());

        write_lab_config(&config, r#"{"mode": "PHYSICS", "paused": false}"#);
        assert!(matches!(
            lab.step().await.unwrap(),
            Step::Completed { .. }
        ));
        assert!(config.report.exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_mode_change_resets() {
        let (dir, config) = temp_config();
        let mut lab = Lab::with_rng(config.clone(), StdRng::seed_from_u64(3)).unwrap();
        lab.step().await.unwrap();
        assert!(!lab.records().is_empty());

        write_lab_config(&config, r#"{"mode": "REAL"}"#);
        assert_eq!(
            lab.step().await.unwrap(),
            Step::ModeChanged {
                from: Mode::Physics,
                to: Mode::Real,
            }
        );
        assert_eq!(lab.mode(), Mode::Real);
        assert!(lab.records().is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_real_failures_recorded() {
        let (dir, config) = temp_config();
        write_lab_config(&config, r#"{"mode": "REAL", "paused": false}"#);
        let mut lab = Lab::with_rng(config, StdRng::seed_from_u64(4)).unwrap();

        assert!(matches!(lab.step().await.unwrap(), Step::ModeChanged { .. }));
        let Step::Completed { executed, .. } = lab.step().await.unwrap() else {
            panic!("expected a completed cycle");
        };
        assert_eq!(lab.records().len(), executed);
        for record in lab.records() {
            assert_eq!(record.source, Source::RealDockerFailed);
            assert!(!record.supported);
        }

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_invalid_config() {
        let config = Config {
            rtt_range: 10.0..10.0,
            ..Default::default()
        };
        assert!(matches!(
            Lab::with_rng(config, StdRng::seed_from_u64(0)),
            Err(Error::InvalidRttRange(_, _))
        ));
    }
}
