//! pasta-sim library.
//!
//! Drives a single [`Channel`] with deterministic simulated chatters and
//! records every verdict so an oracle can recompute them independently.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod campaign;
pub mod chatter;
pub mod clock;
pub mod oracle;
pub mod rng;

use std::time::Duration;

use anyhow::{Result, bail};
use pasta_core::config::ChannelConfig;
use pasta_core::{Channel, Ingested, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chatter::{Chatter, Temper};
use crate::clock::{ClockConfig, SimulatedClock};
use crate::rng::DeterministicRng;

/// Parameters for one simulated channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Number of simulated chatters.
    pub chatters: usize,
    /// Number of simulation rounds.
    pub rounds: u64,
    /// Distinct senders required to flag a text.
    pub need: usize,
    /// Copypasta window in milliseconds.
    pub within_ms: u64,
    /// Number of distinct lines casual chatters choose from.
    pub vocabulary: usize,
    /// Chance per round that a given chatter speaks.
    pub talk_percent: u8,
    /// Share of chatters that echo the previous line.
    pub echo_percent: u8,
    /// Share of chatters that only repeat their catchphrase.
    pub parrot_percent: u8,
    /// Chance per round that a moderator blocks a vocabulary line.
    pub block_percent: u8,
    /// Chance per round that learning is switched on or off.
    pub learn_toggle_percent: u8,
    pub clock: ClockConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chatters: 8,
            rounds: 200,
            need: 3,
            within_ms: 2_000,
            vocabulary: 6,
            talk_percent: 30,
            echo_percent: 30,
            parrot_percent: 15,
            block_percent: 2,
            learn_toggle_percent: 1,
            clock: ClockConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Settings for the simulated channel.
    #[must_use]
    pub const fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            need: self.need,
            within: Duration::from_millis(self.within_ms),
            learn: true,
        }
    }
}

/// One step recorded during a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// A chatter's message and the channel's verdict on it.
    Message { message: Message, verdict: Ingested },
    /// A moderator blocked a line.
    Block {
        at: chrono::DateTime<chrono::Utc>,
        text: String,
    },
    /// Learning was switched.
    Learning { enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub round: u64,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    pub trace: Vec<TraceEvent>,
    /// Message ids held by the channel history at the end, oldest first.
    pub history: Vec<String>,
    pub flagged: usize,
    /// Messages that reached the detector while their text was cooling down.
    pub suppressed: usize,
    /// True when the run saw both a detection and a cooldown suppression.
    pub interesting_state_reached: bool,
}

impl SimulationResult {
    /// Verdicts in trace order.
    pub fn verdicts(&self) -> impl Iterator<Item = (&Message, Ingested)> {
        self.trace.iter().filter_map(|event| match &event.kind {
            TraceEventKind::Message { message, verdict } => Some((message, *verdict)),
            _ => None,
        })
    }
}

/// Deterministic driver for one simulated channel.
#[derive(Debug)]
pub struct Simulator {
    config: SimulationConfig,
    rng: DeterministicRng,
    clock: SimulatedClock,
    chatters: Vec<Chatter>,
    vocabulary: Vec<String>,
    channel: Channel,
    freeze_left: u64,
}

impl Simulator {
    /// Build a simulator from a validated config.
    ///
    /// # Errors
    ///
    /// Returns an error when the config has no chatters, no rounds, or an
    /// invalid detector threshold or window.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if config.chatters == 0 {
            bail!("chatters must be > 0");
        }
        if config.rounds == 0 {
            bail!("rounds must be > 0");
        }
        if config.need == 0 {
            bail!("need must be > 0");
        }
        if config.within_ms == 0 {
            bail!("within_ms must be > 0");
        }

        let rng = DeterministicRng::new(config.seed);
        let mut temper_rng = rng.fork(u64::MAX);
        let chatters = (0..config.chatters)
            .map(|id| {
                let temper = if temper_rng.percent(config.echo_percent) {
                    Temper::Echo
                } else if temper_rng.percent(config.parrot_percent) {
                    Temper::Parrot
                } else {
                    Temper::Casual
                };
                Chatter::new(id, temper, rng.fork(u64::try_from(id).unwrap_or(u64::MAX)))
            })
            .collect();
        let vocabulary = (0..config.vocabulary.max(1))
            .map(|i| format!("line {i}"))
            .collect();
        let channel = Channel::new("#sim", &config.channel());

        Ok(Self {
            clock: SimulatedClock::new(config.clock),
            rng,
            chatters,
            vocabulary,
            channel,
            freeze_left: 0,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn tick_clock(&mut self, round: u64) {
        if self.clock.is_frozen() {
            self.freeze_left = self.freeze_left.saturating_sub(1);
            if self.freeze_left == 0 {
                self.clock.unfreeze();
            }
        } else if self.rng.percent(self.config.clock.freeze_percent) {
            self.clock.freeze(round);
            self.freeze_left = self.config.clock.freeze_rounds;
        }
    }

    /// Run every round and collect the trace.
    pub fn run(&mut self) -> SimulationResult {
        info!(seed = self.config.seed, rounds = self.config.rounds, "simulation start");

        let mut trace = Vec::new();
        let mut last_said: Option<String> = None;
        let mut flagged = 0_usize;
        let mut suppressed = 0_usize;

        for round in 0..self.config.rounds {
            self.tick_clock(round);
            let at = self.clock.now(round);

            if self.rng.percent(self.config.learn_toggle_percent) {
                let enabled = !self.channel.is_learning();
                self.channel.set_learning(enabled);
                trace.push(TraceEvent {
                    round,
                    kind: TraceEventKind::Learning { enabled },
                });
            }

            if self.rng.percent(self.config.block_percent) {
                let text = self
                    .rng
                    .pick(&self.vocabulary)
                    .cloned()
                    .unwrap_or_default();
                self.channel.block(at, &text);
                trace.push(TraceEvent {
                    round,
                    kind: TraceEventKind::Block { at, text },
                });
            }

            for chatter in &mut self.chatters {
                if !chatter.speaks(self.config.talk_percent) {
                    continue;
                }
                let (id, text) = chatter.compose(&self.vocabulary, last_said.as_deref());
                let message = Message::new(at, id, chatter.name(), text);
                let verdict = self.channel.ingest(&message);

                match verdict {
                    Ingested::Flagged => flagged += 1,
                    Ingested::Recorded
                        if self.channel.detector().is_cooling_down(&message.text) =>
                    {
                        suppressed += 1;
                    }
                    _ => {}
                }

                last_said = Some(message.text.clone());
                trace.push(TraceEvent {
                    round,
                    kind: TraceEventKind::Message { message, verdict },
                });
            }
        }

        let history = self.channel.history().map(|r| r.id.clone()).collect();
        debug!(flagged, suppressed, events = trace.len(), "simulation done");

        SimulationResult {
            trace,
            history,
            flagged,
            suppressed,
            interesting_state_reached: flagged > 0 && suppressed > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configs_are_rejected() {
        for config in [
            SimulationConfig {
                chatters: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                rounds: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                need: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                within_ms: 0,
                ..SimulationConfig::default()
            },
        ] {
            assert!(Simulator::new(config).is_err());
        }
    }

    #[test]
    fn run_is_deterministic() {
        let config = SimulationConfig {
            seed: 99,
            ..SimulationConfig::default()
        };
        let a = Simulator::new(config.clone()).unwrap().run();
        let b = Simulator::new(config).unwrap().run();
        assert_eq!(a, b);
    }

    #[test]
    fn echo_heavy_chat_produces_detections() {
        let config = SimulationConfig {
            seed: 5,
            chatters: 12,
            echo_percent: 80,
            talk_percent: 50,
            ..SimulationConfig::default()
        };
        let result = Simulator::new(config).unwrap().run();
        assert!(result.flagged > 0);
        assert!(!result.history.is_empty());
    }

    #[test]
    fn trace_serializes_with_kind_tag() {
        let config = SimulationConfig {
            rounds: 10,
            talk_percent: 100,
            ..SimulationConfig::default()
        };
        let result = Simulator::new(config).unwrap().run();
        let json = serde_json::to_string(&result.trace[0]).unwrap();
        assert!(json.contains("\"kind\""));
        assert!(json.contains("\"round\":0"));
    }
}
