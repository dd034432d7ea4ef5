//! Independent checks over a finished simulation.
//!
//! [`ReferenceModel`] recomputes every verdict from the trace alone using
//! plain maps and millisecond arithmetic, without touching the channel's
//! data structures. [`ChannelOracle`] compares its answers with what the
//! simulated channel reported.

use std::collections::HashMap;

use pasta_core::Ingested;
use pasta_core::expiry::{COOLDOWN, RETENTION};

use crate::{SimulationConfig, SimulationResult, TraceEventKind};

// ── Core result types ─────────────────────────────────────────────────────────

/// Oracle result for an invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    /// `true` iff no violations were found.
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    #[must_use]
    fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    #[must_use]
    fn fail(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: false,
            violations,
        }
    }

    #[must_use]
    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        if violations.is_empty() {
            Self::pass()
        } else {
            Self::fail(violations)
        }
    }

    /// Merge another result into this one (failures accumulate).
    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

/// Diagnostic information for a single failed invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The channel's verdict on a message differs from the model's.
    VerdictMismatch {
        /// Position of the event in the trace.
        index: usize,
        id: String,
        expected: Ingested,
        actual: Ingested,
    },

    /// The channel's final history differs from the messages still within
    /// retention.
    HistoryMismatch {
        /// Ids the model expects but the channel no longer holds.
        missing: Vec<String>,
        /// Ids the channel holds but the model considers gone.
        extra: Vec<String>,
        /// Whether the shared ids appear in a different order.
        reordered: bool,
    },

    /// A text was flagged twice within one cooldown.
    CooldownBreach {
        text: String,
        first_ms: i64,
        second_ms: i64,
    },

    /// The run's flag counter disagrees with the flagged verdicts.
    FlagCountMismatch { reported: usize, counted: usize },
}

// ── Reference model ───────────────────────────────────────────────────────────

fn millis(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Straightforward re-statement of a channel's semantics.
///
/// Assumes instants never go backwards, which the simulated clock
/// guarantees.
#[derive(Debug, Clone)]
pub struct ReferenceModel {
    need: usize,
    within_ms: i64,
    learning: bool,
    /// Latest expiry per (sender, text).
    latest: HashMap<(String, String), i64>,
    /// Cooldown expiry per text.
    cooldown: HashMap<String, i64>,
    /// Every message id with its arrival time, in arrival order.
    arrivals: Vec<(String, i64)>,
}

impl ReferenceModel {
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            need: config.need.max(1),
            within_ms: i64::try_from(config.within_ms).unwrap_or(i64::MAX),
            learning: true,
            latest: HashMap::new(),
            cooldown: HashMap::new(),
            arrivals: Vec::new(),
        }
    }

    fn cooling_down(&self, text: &str, now: i64) -> bool {
        self.cooldown.get(text).is_some_and(|&until| until > now)
    }

    fn start_cooldown(&mut self, text: &str, now: i64) {
        let until = now.saturating_add(millis(COOLDOWN));
        let entry = self.cooldown.entry(text.to_string()).or_insert(until);
        *entry = (*entry).max(until);
    }

    /// Apply one trace event; returns the verdict for message events.
    pub fn apply(&mut self, event: &TraceEventKind) -> Option<Ingested> {
        match event {
            TraceEventKind::Learning { enabled } => {
                self.learning = *enabled;
                None
            }
            TraceEventKind::Block { at, text } => {
                self.start_cooldown(text, at.timestamp_millis());
                None
            }
            TraceEventKind::Message { message, .. } => {
                let now = message.at.timestamp_millis();
                self.arrivals.push((message.id.clone(), now));
                if !self.learning {
                    return Some(Ingested::Ignored);
                }

                let until = now.saturating_add(self.within_ms);
                let entry = self
                    .latest
                    .entry((message.sender.clone(), message.text.clone()))
                    .or_insert(until);
                *entry = (*entry).max(until);

                let senders = self
                    .latest
                    .iter()
                    .filter(|(key, until)| key.1 == message.text && **until > now)
                    .count();

                if senders >= self.need && !self.cooling_down(&message.text, now) {
                    self.start_cooldown(&message.text, now);
                    Some(Ingested::Flagged)
                } else {
                    Some(Ingested::Recorded)
                }
            }
        }
    }

    /// Ids that should still be in history after the last message.
    #[must_use]
    pub fn expected_history(&self) -> Vec<String> {
        let Some(&(_, last)) = self.arrivals.last() else {
            return Vec::new();
        };
        let retention = millis(RETENTION);
        self.arrivals
            .iter()
            .filter(|(_, at)| at.saturating_add(retention) > last)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

// ── Oracle ────────────────────────────────────────────────────────────────────

/// Oracle for verifying channel invariants after simulation.
#[derive(Debug, Clone, Copy)]
pub struct ChannelOracle;

impl ChannelOracle {
    /// Replay the trace through the reference model and compare verdicts.
    #[must_use]
    pub fn check_verdicts(config: &SimulationConfig, result: &SimulationResult) -> OracleResult {
        let mut model = ReferenceModel::new(config);
        let violations = result
            .trace
            .iter()
            .enumerate()
            .filter_map(|(index, event)| {
                let expected = model.apply(&event.kind)?;
                match &event.kind {
                    TraceEventKind::Message { message, verdict } if *verdict != expected => {
                        Some(InvariantViolation::VerdictMismatch {
                            index,
                            id: message.id.clone(),
                            expected,
                            actual: *verdict,
                        })
                    }
                    _ => None,
                }
            })
            .collect();
        OracleResult::from_violations(violations)
    }

    /// Compare the final history with the messages still within retention.
    #[must_use]
    pub fn check_history(config: &SimulationConfig, result: &SimulationResult) -> OracleResult {
        let mut model = ReferenceModel::new(config);
        for event in &result.trace {
            model.apply(&event.kind);
        }
        let expected = model.expected_history();

        let missing: Vec<String> = expected
            .iter()
            .filter(|id| !result.history.contains(id))
            .cloned()
            .collect();
        let extra: Vec<String> = result
            .history
            .iter()
            .filter(|id| !expected.contains(id))
            .cloned()
            .collect();
        let reordered = missing.is_empty() && extra.is_empty() && expected != result.history;

        if missing.is_empty() && extra.is_empty() && !reordered {
            OracleResult::pass()
        } else {
            OracleResult::fail(vec![InvariantViolation::HistoryMismatch {
                missing,
                extra,
                reordered,
            }])
        }
    }

    /// No text may be flagged twice within one cooldown.
    #[must_use]
    pub fn check_cooldown(result: &SimulationResult) -> OracleResult {
        let mut last_flag: HashMap<&str, i64> = HashMap::new();
        let mut violations = Vec::new();
        for (message, verdict) in result.verdicts() {
            if !verdict.is_flagged() {
                continue;
            }
            let now = message.at.timestamp_millis();
            if let Some(&first_ms) = last_flag.get(message.text.as_str()) {
                if now.saturating_sub(first_ms) < millis(COOLDOWN) {
                    violations.push(InvariantViolation::CooldownBreach {
                        text: message.text.clone(),
                        first_ms,
                        second_ms: now,
                    });
                }
            }
            last_flag.insert(message.text.as_str(), now);
        }
        OracleResult::from_violations(violations)
    }

    /// The reported flag counter matches the flagged verdicts.
    #[must_use]
    pub fn check_flag_count(result: &SimulationResult) -> OracleResult {
        let counted = result.verdicts().filter(|(_, v)| v.is_flagged()).count();
        if counted == result.flagged {
            OracleResult::pass()
        } else {
            OracleResult::fail(vec![InvariantViolation::FlagCountMismatch {
                reported: result.flagged,
                counted,
            }])
        }
    }

    /// Run every check and merge the results.
    #[must_use]
    pub fn check_all(config: &SimulationConfig, result: &SimulationResult) -> OracleResult {
        Self::check_verdicts(config, result)
            .merge(Self::check_history(config, result))
            .merge(Self::check_cooldown(result))
            .merge(Self::check_flag_count(result))
    }
}
