//! `pasta sim`: deterministic simulation campaign commands.
//!
//! `pasta sim run`: execute a campaign across many seeds.
//! `pasta sim replay`: replay a single seed with its verdict trace.

use std::io::Write;
use std::process;

use anyhow::Result;
use clap::{Args, Subcommand};
use pasta_sim::TraceEventKind;
use pasta_sim::campaign::{CampaignConfig, format_violation, replay_seed, run_campaign};
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Top-level arguments for `pasta sim`.
#[derive(Args, Debug)]
pub struct SimArgs {
    #[command(subcommand)]
    pub command: SimCommand,
}

#[derive(Subcommand, Debug)]
pub enum SimCommand {
    #[command(
        about = "Run a simulation campaign across multiple seeds",
        long_about = "Drive a simulated channel with deterministic chatters for every seed in\n\
                      a range and check each verdict against a reference model. Reports\n\
                      pass/fail per seed and identifies the first failure for replay.",
        after_help = "EXAMPLES:\n    # Run 100 seeds with defaults\n    pasta sim run --seeds 100\n\n\
                      # Stricter detector\n    pasta sim run --need 5 --within-ms 500\n\n\
                      # Machine-readable output\n    pasta sim run --format json"
    )]
    Run(SimRunArgs),

    #[command(
        about = "Replay a single seed with its verdict trace",
        after_help = "EXAMPLES:\n    # Replay seed 42\n    pasta sim replay --seed 42\n\n\
                      # Machine-readable output\n    pasta sim replay --seed 42 --format json"
    )]
    Replay(SimReplayArgs),
}

/// Simulation parameters shared by `run` and `replay`.
#[derive(Args, Debug, Clone)]
pub struct SimParams {
    /// Number of simulated chatters.
    #[arg(long, default_value = "8")]
    pub chatters: usize,

    /// Number of simulation rounds per seed.
    #[arg(long, default_value = "200")]
    pub rounds: u64,

    /// Distinct senders required to flag a text.
    #[arg(long, default_value = "3")]
    pub need: usize,

    /// Copypasta window in milliseconds.
    #[arg(long, default_value = "2000")]
    pub within_ms: u64,

    /// Simulated milliseconds per round.
    #[arg(long, default_value = "250")]
    pub tick_ms: i64,
}

#[derive(Args, Debug)]
pub struct SimRunArgs {
    /// Number of seeds to run.
    #[arg(long, default_value = "100")]
    pub seeds: u64,

    /// Starting seed value.
    #[arg(long, default_value = "0")]
    pub seed_start: u64,

    #[command(flatten)]
    pub params: SimParams,
}

#[derive(Args, Debug)]
pub struct SimReplayArgs {
    /// Seed to replay.
    #[arg(long)]
    pub seed: u64,

    #[command(flatten)]
    pub params: SimParams,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    seeds_run: usize,
    seeds_passed: usize,
    seeds_failed: usize,
    first_failure: Option<u64>,
    flagged: usize,
    interesting_states_reached: usize,
    all_passed: bool,
    failures: Vec<FailureOutput>,
}

#[derive(Debug, Serialize)]
struct FailureOutput {
    seed: u64,
    violations: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VerdictLine {
    round: u64,
    id: String,
    sender: String,
    text: String,
    verdict: pasta_core::Ingested,
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    seed: u64,
    trace_events: usize,
    messages: usize,
    flagged: usize,
    suppressed: usize,
    history: usize,
    oracle_passed: bool,
    violations: Vec<String>,
    flags: Vec<VerdictLine>,
}

fn campaign_config(seed_start: u64, seeds: u64, params: &SimParams) -> CampaignConfig {
    CampaignConfig {
        seed_range: seed_start..seed_start.saturating_add(seeds),
        chatters: params.chatters,
        rounds: params.rounds,
        need: params.need,
        within_ms: params.within_ms,
        tick_millis: params.tick_ms,
        ..CampaignConfig::default()
    }
}

/// Execute `pasta sim run`.
pub fn run_sim_run(args: &SimRunArgs, output: OutputMode) -> Result<()> {
    let config = campaign_config(args.seed_start, args.seeds, &args.params);
    let report = run_campaign(&config)?;

    let out = RunOutput {
        seeds_run: report.seeds_run,
        seeds_passed: report.seeds_passed,
        seeds_failed: report.failures.len(),
        first_failure: report.first_failure,
        flagged: report.flagged,
        interesting_states_reached: report.interesting_states_reached,
        all_passed: report.all_passed(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureOutput {
                seed: f.seed,
                violations: f.violations.clone(),
            })
            .collect(),
    };

    let params = &args.params;
    render_mode(
        output,
        &out,
        |out, w| {
            writeln!(
                w,
                "campaign seeds_run={} chatters={} rounds={} need={} within_ms={}",
                out.seeds_run, params.chatters, params.rounds, params.need, params.within_ms
            )?;
            writeln!(
                w,
                "results passed={} failed={} flagged={} interesting_states={} all_passed={}",
                out.seeds_passed,
                out.seeds_failed,
                out.flagged,
                out.interesting_states_reached,
                out.all_passed
            )?;
            for failure in out.failures.iter().take(5) {
                writeln!(
                    w,
                    "failure seed={} violations={}",
                    failure.seed,
                    failure.violations.len()
                )?;
            }
            if let Some(seed) = out.first_failure {
                writeln!(w, "hint replay_seed={seed}")?;
            }
            Ok(())
        },
        |out, w| {
            pretty_section(w, "Simulation Campaign")?;
            pretty_kv(w, "Seeds", out.seeds_run.to_string())?;
            pretty_kv(w, "Chatters", params.chatters.to_string())?;
            pretty_kv(w, "Rounds", params.rounds.to_string())?;
            pretty_kv(
                w,
                "Detector",
                format!("{} senders within {} ms", params.need, params.within_ms),
            )?;
            pretty_kv(
                w,
                "Results",
                format!(
                    "{} passed / {} failed ({} flags, {} interesting)",
                    out.seeds_passed, out.seeds_failed, out.flagged, out.interesting_states_reached
                ),
            )?;

            match out.first_failure {
                None => pretty_kv(w, "Status", "all seeds passed")?,
                Some(seed) => {
                    pretty_kv(w, "Status", format!("{} failures", out.seeds_failed))?;
                    writeln!(w)?;
                    pretty_section(w, "Failure Samples")?;
                    for failure in out.failures.iter().take(5) {
                        writeln!(w, "seed {:<8} violations={}", failure.seed, failure.violations.len())?;
                        for violation in &failure.violations {
                            writeln!(w, "  - {violation}")?;
                        }
                    }
                    writeln!(w)?;
                    pretty_kv(
                        w,
                        "Replay",
                        format!(
                            "pasta sim replay --seed {seed} --chatters {} --rounds {}",
                            params.chatters, params.rounds
                        ),
                    )?;
                }
            }
            Ok(())
        },
    )?;

    if !report.all_passed() {
        process::exit(1);
    }
    Ok(())
}

/// Execute `pasta sim replay`.
pub fn run_sim_replay(args: &SimReplayArgs, output: OutputMode) -> Result<()> {
    let config = campaign_config(args.seed, 1, &args.params);
    let trace = replay_seed(args.seed, &config)?;

    let flags = trace
        .result
        .trace
        .iter()
        .filter_map(|event| match &event.kind {
            TraceEventKind::Message { message, verdict } if verdict.is_flagged() => {
                Some(VerdictLine {
                    round: event.round,
                    id: message.id.clone(),
                    sender: message.sender.clone(),
                    text: message.text.clone(),
                    verdict: *verdict,
                })
            }
            _ => None,
        })
        .collect();

    let out = ReplayOutput {
        seed: args.seed,
        trace_events: trace.result.trace.len(),
        messages: trace.result.verdicts().count(),
        flagged: trace.result.flagged,
        suppressed: trace.result.suppressed,
        history: trace.result.history.len(),
        oracle_passed: trace.oracle.passed,
        violations: trace.oracle.violations.iter().map(format_violation).collect(),
        flags,
    };

    render_mode(
        output,
        &out,
        |out, w| {
            writeln!(
                w,
                "replay seed={} trace_events={} messages={} flagged={} suppressed={} history={} oracle_passed={}",
                out.seed,
                out.trace_events,
                out.messages,
                out.flagged,
                out.suppressed,
                out.history,
                out.oracle_passed
            )?;
            for flag in &out.flags {
                writeln!(
                    w,
                    "flag round={} id={} sender={} text={:?}",
                    flag.round, flag.id, flag.sender, flag.text
                )?;
            }
            for violation in &out.violations {
                writeln!(w, "violation={violation}")?;
            }
            Ok(())
        },
        |out, w| {
            pretty_section(w, &format!("Replay Seed {}", out.seed))?;
            pretty_kv(w, "Trace events", out.trace_events.to_string())?;
            pretty_kv(w, "Messages", out.messages.to_string())?;
            pretty_kv(w, "Flagged", out.flagged.to_string())?;
            pretty_kv(w, "Suppressed", out.suppressed.to_string())?;
            pretty_kv(w, "History", out.history.to_string())?;
            pretty_kv(w, "Oracle", out.oracle_passed.to_string())?;

            if !out.violations.is_empty() {
                writeln!(w)?;
                pretty_section(w, "Invariant Violations")?;
                for violation in &out.violations {
                    writeln!(w, "- {violation}")?;
                }
            }

            writeln!(w)?;
            pretty_section(w, "Detections")?;
            for flag in &out.flags {
                writeln!(w, "round {:<6} {:<14} {}", flag.round, flag.sender, flag.text)?;
            }
            Ok(())
        },
    )?;

    if !trace.oracle.passed {
        process::exit(1);
    }
    Ok(())
}

/// Dispatch `pasta sim` subcommands.
pub fn run_sim(args: &SimArgs, output: OutputMode) -> Result<()> {
    match &args.command {
        SimCommand::Run(run_args) => run_sim_run(run_args, output),
        SimCommand::Replay(replay_args) => run_sim_replay(replay_args, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SimParams {
        SimParams {
            chatters: 4,
            rounds: 50,
            need: 2,
            within_ms: 1_000,
            tick_ms: 500,
        }
    }

    #[test]
    fn campaign_config_maps_params() {
        let config = campaign_config(10, 5, &params());
        assert_eq!(config.seed_range, 10..15);
        assert_eq!(config.chatters, 4);
        assert_eq!(config.need, 2);
        assert_eq!(config.tick_millis, 500);
    }

    #[test]
    fn campaign_config_saturates_seed_range() {
        let config = campaign_config(u64::MAX, 5, &params());
        assert_eq!(config.seed_range, u64::MAX..u64::MAX);
        assert!(config.validate().is_err());
    }
}
