use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for the simulated channel clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Base timestamp in milliseconds since the Unix epoch.
    pub base_millis: i64,
    /// Milliseconds that pass per simulation round.
    pub tick_millis: i64,
    /// Chance per round that the clock stalls, repeating the last instant.
    pub freeze_percent: u8,
    /// Rounds a stall lasts.
    pub freeze_rounds: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            base_millis: 1_700_000_000_000,
            tick_millis: 250,
            freeze_percent: 5,
            freeze_rounds: 3,
        }
    }
}

/// Simulated wall clock with freeze controls.
///
/// A frozen clock keeps returning the instant at which it froze, which is
/// how the simulation produces bursts of messages sharing one timestamp.
/// Time never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedClock {
    config: ClockConfig,
    frozen_at: Option<i64>,
}

impl SimulatedClock {
    #[must_use]
    pub const fn new(config: ClockConfig) -> Self {
        Self {
            config,
            frozen_at: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> ClockConfig {
        self.config
    }

    /// Wall time in milliseconds for a simulation round.
    #[must_use]
    pub fn now_millis(&self, round: u64) -> i64 {
        if let Some(frozen) = self.frozen_at {
            return frozen;
        }
        let round = i64::try_from(round).unwrap_or(i64::MAX);
        self.config
            .base_millis
            .saturating_add(self.config.tick_millis.saturating_mul(round))
    }

    /// Wall time for a simulation round as an instant.
    #[must_use]
    pub fn now(&self, round: u64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_millis(round))
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn freeze(&mut self, round: u64) {
        self.frozen_at = Some(self.now_millis(round));
    }

    pub const fn unfreeze(&mut self) {
        self.frozen_at = None;
    }

    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_advance_time() {
        let clock = SimulatedClock::new(ClockConfig::default());
        assert_eq!(clock.now_millis(4) - clock.now_millis(0), 1_000);
    }

    #[test]
    fn frozen_clock_repeats_instant() {
        let mut clock = SimulatedClock::new(ClockConfig::default());
        clock.freeze(2);
        assert!(clock.is_frozen());
        assert_eq!(clock.now(2), clock.now(9));

        clock.unfreeze();
        assert!(!clock.is_frozen());
        assert!(clock.now(9) > clock.now(2));
        assert_eq!(clock.now_millis(9), 1_700_000_000_000 + 9 * 250);
    }
}
