//! Campaign runner for deterministic simulation campaigns.
//!
//! Executes many seeds across configurable parameters, collecting pass/fail
//! results and identifying the first failing seed for replay.

use std::ops::Range;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::ClockConfig;
use crate::oracle::{ChannelOracle, InvariantViolation, OracleResult};
use crate::{SimulationConfig, SimulationResult, Simulator};

/// Campaign-level configuration controlling how many seeds to run and
/// what simulation parameters to use for each seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Range of seeds to execute, e.g., `0..100`.
    pub seed_range: Range<u64>,
    pub chatters: usize,
    pub rounds: u64,
    /// Distinct senders required to flag a text.
    pub need: usize,
    /// Copypasta window in milliseconds.
    pub within_ms: u64,
    /// Milliseconds of simulated time per round.
    pub tick_millis: i64,
    pub talk_percent: u8,
    pub echo_percent: u8,
    pub block_percent: u8,
    /// Clock freeze probability (percent, 0–100).
    pub freeze_percent: u8,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let sim = SimulationConfig::default();
        Self {
            seed_range: 0..100,
            chatters: sim.chatters,
            rounds: sim.rounds,
            need: sim.need,
            within_ms: sim.within_ms,
            tick_millis: sim.clock.tick_millis,
            talk_percent: sim.talk_percent,
            echo_percent: sim.echo_percent,
            block_percent: sim.block_percent,
            freeze_percent: sim.clock.freeze_percent,
        }
    }
}

impl CampaignConfig {
    /// Build a [`SimulationConfig`] for a specific seed.
    #[must_use]
    pub fn sim_config_for_seed(&self, seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed,
            chatters: self.chatters,
            rounds: self.rounds,
            need: self.need,
            within_ms: self.within_ms,
            talk_percent: self.talk_percent,
            echo_percent: self.echo_percent,
            block_percent: self.block_percent,
            clock: ClockConfig {
                tick_millis: self.tick_millis,
                freeze_percent: self.freeze_percent,
                ..ClockConfig::default()
            },
            ..SimulationConfig::default()
        }
    }

    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.chatters == 0 {
            bail!("chatters must be > 0");
        }
        if self.rounds == 0 {
            bail!("rounds must be > 0");
        }
        if self.need == 0 {
            bail!("need must be > 0");
        }
        if self.within_ms == 0 {
            bail!("within_ms must be > 0");
        }
        if self.tick_millis < 0 {
            bail!("tick_millis must not be negative");
        }
        Ok(())
    }
}

/// Failure details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub violations: Vec<String>,
}

/// Aggregate report produced by a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// First seed that failed (for prioritized replay).
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Total copypasta detections across all seeds.
    pub flagged: usize,
    /// Seeds that saw both a detection and a cooldown suppression.
    pub interesting_states_reached: usize,
}

impl CampaignReport {
    /// True if every seed passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Detailed trace produced by replaying a single seed.
#[derive(Debug, Clone)]
pub struct DetailedTrace {
    pub config: SimulationConfig,
    pub result: SimulationResult,
    pub oracle: OracleResult,
}

/// Run a full campaign across all seeds in the config.
///
/// # Errors
///
/// Returns an error if config validation fails.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        flagged: 0,
        interesting_states_reached: 0,
    };

    for seed in config.seed_range.clone() {
        let trace = replay_seed(seed, config)?;
        report.seeds_run += 1;
        report.flagged += trace.result.flagged;
        if trace.result.interesting_state_reached {
            report.interesting_states_reached += 1;
        }

        if trace.oracle.passed {
            report.seeds_passed += 1;
        } else {
            warn!(seed, violations = trace.oracle.violations.len(), "seed failed");
            report.first_failure.get_or_insert(seed);
            report.failures.push(SeedFailure {
                seed,
                violations: trace.oracle.violations.iter().map(format_violation).collect(),
            });
        }
    }

    info!(
        seeds = report.seeds_run,
        passed = report.seeds_passed,
        flagged = report.flagged,
        "campaign finished"
    );
    Ok(report)
}

/// Run a single seed and return Ok(()) on pass, Err(violations) on failure.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the simulation cannot be built from the
/// config. The inner `Result` distinguishes pass from invariant violations.
pub fn run_single_seed(
    seed: u64,
    config: &CampaignConfig,
) -> Result<std::result::Result<(), Vec<InvariantViolation>>> {
    let trace = replay_seed(seed, config)?;
    if trace.oracle.passed {
        Ok(Ok(()))
    } else {
        Ok(Err(trace.oracle.violations))
    }
}

/// Replay a single seed with full trace details for debugging.
///
/// # Errors
///
/// Returns an error when config validation or simulator setup fails.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<DetailedTrace> {
    config.validate()?;

    let sim_config = config.sim_config_for_seed(seed);
    let result = Simulator::new(sim_config.clone())?.run();
    let oracle = ChannelOracle::check_all(&sim_config, &result);

    Ok(DetailedTrace {
        config: sim_config,
        result,
        oracle,
    })
}

/// Format an invariant violation into a human-readable string.
#[must_use]
pub fn format_violation(v: &InvariantViolation) -> String {
    match v {
        InvariantViolation::VerdictMismatch {
            index,
            id,
            expected,
            actual,
        } => format!("VerdictMismatch: event {index} ({id}) was {actual:?}, expected {expected:?}"),
        InvariantViolation::HistoryMismatch {
            missing,
            extra,
            reordered,
        } => format!("HistoryMismatch: missing={missing:?} extra={extra:?} reordered={reordered}"),
        InvariantViolation::CooldownBreach {
            text,
            first_ms,
            second_ms,
        } => format!(
            "CooldownBreach: {text:?} flagged at {first_ms} and again at {second_ms}"
        ),
        InvariantViolation::FlagCountMismatch { reported, counted } => {
            format!("FlagCountMismatch: reported {reported} detections but trace has {counted}")
        }
    }
}
