//! Copypasta detection over a sliding time window.
//!
//! [`DuplicateWindow`] counts how many distinct senders posted the same text
//! within the last `within`, and flags the text once that count reaches
//! `need`. A flagged text enters a [`COOLDOWN`] during which it cannot
//! flag again.
//!
//! # Tally
//!
//! Each text maps to the set of voices that posted it, keyed by sender and
//! valued by that sender's latest expiry. The cooldown is stored as one
//! more voice, so an active cooldown also counts toward the distinct-sender
//! total. An occurrence that expires removes its voice only if the tally
//! still holds that occurrence's expiry; a newer post by the same sender
//! has already refreshed the entry and must survive the sweep of the older
//! one.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::error::NotCopypasta;
use crate::expiry::{COOLDOWN, expiry_after, is_expired};

/// Key under which a text's tally stores an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Voice {
    Sender(String),
    /// Reserved marker for an active cooldown. Never equal to any sender.
    Cooldown,
}

#[derive(Debug)]
struct Occurrence {
    text: String,
    voice: Voice,
}

#[derive(Debug, Default)]
struct Tally {
    /// Occurrences keyed by expiry, soonest first. The sequence number
    /// keeps occurrences with identical expiries apart.
    occurrences: BTreeMap<(DateTime<Utc>, u64), Occurrence>,
    voices: HashMap<String, HashMap<Voice, DateTime<Utc>>>,
    next_seq: u64,
}

impl Tally {
    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        while let Some(entry) = self.occurrences.first_entry() {
            if !is_expired(entry.key().0, now) {
                break;
            }
            let ((expiry, _), occurrence) = entry.remove_entry();
            self.forget(&occurrence, expiry);
            evicted += 1;
        }
        evicted
    }

    fn forget(&mut self, occurrence: &Occurrence, expiry: DateTime<Utc>) {
        let Some(voices) = self.voices.get_mut(&occurrence.text) else {
            return;
        };
        if voices.get(&occurrence.voice) == Some(&expiry) {
            voices.remove(&occurrence.voice);
        }
        if voices.is_empty() {
            self.voices.remove(&occurrence.text);
        }
    }

    /// Record `voice` posting `text` until `expiry`.
    ///
    /// Returns false without changing anything when the tally already holds
    /// an expiry at least as late for the same pair.
    fn record(&mut self, text: &str, voice: Voice, expiry: DateTime<Utc>) -> bool {
        if let Some(&current) = self.voices.get(text).and_then(|v| v.get(&voice)) {
            if current >= expiry {
                return false;
            }
        }

        self.voices
            .entry(text.to_owned())
            .or_default()
            .insert(voice.clone(), expiry);

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.occurrences.insert(
            (expiry, seq),
            Occurrence {
                text: text.to_owned(),
                voice,
            },
        );
        true
    }

    fn count(&self, text: &str) -> usize {
        self.voices.get(text).map_or(0, HashMap::len)
    }

    fn cooling_down(&self, text: &str) -> bool {
        self.voices
            .get(text)
            .is_some_and(|v| v.contains_key(&Voice::Cooldown))
    }
}

/// Sliding-window detector of texts repeated by distinct senders.
///
/// One instance serves one channel. All state sits behind a single mutex
/// whose critical sections do in-memory work bounded by the window size.
#[derive(Debug)]
pub struct DuplicateWindow {
    need: usize,
    within: Duration,
    tally: Mutex<Tally>,
}

impl DuplicateWindow {
    /// Create a detector that flags a text once `need` distinct senders
    /// posted it within `within`.
    ///
    /// A `need` of zero is treated as one.
    #[must_use]
    pub fn new(need: usize, within: Duration) -> Self {
        Self {
            need: need.max(1),
            within,
            tally: Mutex::new(Tally::default()),
        }
    }

    /// Distinct senders required to flag a text.
    #[must_use]
    pub const fn need(&self) -> usize {
        self.need
    }

    /// Length of the counting window.
    #[must_use]
    pub const fn within(&self) -> Duration {
        self.within
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `sender` posted `text` at `at` and report whether the
    /// text just became copypasta.
    ///
    /// Returns `Ok(())` at most once per cooldown period for a given text:
    /// the first time the number of distinct voices reaches `need`.
    ///
    /// # Errors
    ///
    /// Returns [`NotCopypasta`] when the text has too few distinct senders
    /// or is already cooling down. This is the ordinary outcome.
    pub fn check(&self, at: DateTime<Utc>, sender: &str, text: &str) -> Result<(), NotCopypasta> {
        let mut tally = self.lock();
        let evicted = tally.sweep(at);
        let recorded = tally.record(
            text,
            Voice::Sender(sender.to_owned()),
            expiry_after(at, self.within),
        );
        let voices = tally.count(text);

        if voices < self.need || tally.cooling_down(text) {
            drop(tally);
            trace!(evicted, recorded, voices, "copypasta check");
            return Err(NotCopypasta);
        }

        tally.record(text, Voice::Cooldown, expiry_after(at, COOLDOWN));
        drop(tally);

        debug!(text, voices, need = self.need, "copypasta detected");
        Ok(())
    }

    /// Put `text` into cooldown as of `at` regardless of how many senders
    /// posted it.
    ///
    /// Sender tallies are left untouched; only the cooldown is created or
    /// extended.
    pub fn block(&self, at: DateTime<Utc>, text: &str) {
        let mut tally = self.lock();
        tally.sweep(at);
        let recorded = tally.record(text, Voice::Cooldown, expiry_after(at, COOLDOWN));
        drop(tally);

        debug!(text, recorded, "copypasta blocked");
    }

    /// Number of distinct senders currently tallied for `text`, counting an
    /// active cooldown as one.
    ///
    /// Entries that have expired but not yet been swept are included.
    #[must_use]
    pub fn senders(&self, text: &str) -> usize {
        self.lock().count(text)
    }

    /// Returns true while `text` is cooling down after a detection or block.
    #[must_use]
    pub fn is_cooling_down(&self, text: &str) -> bool {
        self.lock().cooling_down(text)
    }

    /// Number of occurrences waiting to expire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().occurrences.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ms(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn window(need: usize) -> DuplicateWindow {
        DuplicateWindow::new(need, Duration::from_millis(15))
    }

    #[test]
    fn simple() {
        let d = window(2);
        assert_eq!(d.check(ms(0), "bocchi", "madoka"), Err(NotCopypasta));
        assert_eq!(d.check(ms(1), "ryou", "madoka"), Ok(()));
    }

    #[test]
    fn cooldown() {
        let d = window(2);
        assert!(d.check(ms(0), "bocchi", "madoka").is_err());
        assert!(d.check(ms(1), "ryou", "madoka").is_ok());
        assert!(d.check(ms(2), "nijika", "madoka").is_err());
        assert!(d.check(ms(3), "kita", "madoka").is_err());
        assert!(d.is_cooling_down("madoka"));
    }

    #[test]
    fn distinct_texts_count_independently() {
        let d = window(2);
        assert!(d.check(ms(0), "bocchi", "madoka").is_err());
        assert!(d.check(ms(1), "ryou", "homura").is_err());
        assert!(d.check(ms(2), "kita", "madoka").is_ok());
        assert!(d.check(ms(3), "nijika", "homura").is_ok());
    }

    #[test]
    fn one_sender_never_flags() {
        let d = window(2);
        for t in 0..100 {
            assert!(d.check(ms(t), "bocchi", "madoka").is_err());
        }
        assert_eq!(d.senders("madoka"), 1);
        assert!(d.check(ms(100), "ryou", "madoka").is_ok());
    }

    #[test]
    fn senders_outside_window_do_not_count() {
        let d = window(2);
        assert!(d.check(ms(0), "bocchi", "madoka").is_err());
        // The first occurrence expires at 15ms exactly.
        assert!(d.check(ms(15), "ryou", "madoka").is_err());
        assert_eq!(d.senders("madoka"), 1);
        assert!(d.check(ms(16), "kita", "madoka").is_ok());
    }

    #[test]
    fn need_of_one_flags_first_post() {
        let d = window(1);
        assert!(d.check(ms(0), "bocchi", "madoka").is_ok());
        assert!(d.check(ms(1), "bocchi", "madoka").is_err());
    }

    #[test]
    fn zero_need_is_clamped() {
        let d = DuplicateWindow::new(0, Duration::from_millis(15));
        assert_eq!(d.need(), 1);
    }

    #[test]
    fn cooldown_lapses_after_fifteen_minutes() {
        let d = window(2);
        assert!(d.check(ms(0), "bocchi", "madoka").is_err());
        assert!(d.check(ms(1), "ryou", "madoka").is_ok());

        let later = 1 + 15 * 60 * 1_000;
        assert!(d.check(ms(later), "bocchi", "madoka").is_err());
        assert!(!d.is_cooling_down("madoka"));
        assert!(d.check(ms(later + 1), "ryou", "madoka").is_ok());
    }

    #[test]
    fn cooldown_counts_as_a_voice() {
        let d = window(2);
        d.block(ms(0), "madoka");
        assert_eq!(d.senders("madoka"), 1);
        // Count reaches need but the cooldown suppresses the flag.
        assert!(d.check(ms(1), "bocchi", "madoka").is_err());
        assert_eq!(d.senders("madoka"), 2);
    }

    #[test]
    fn block_leaves_sender_tallies_alone() {
        let d = window(3);
        assert!(d.check(ms(0), "bocchi", "madoka").is_err());
        d.block(ms(1), "madoka");
        assert_eq!(d.senders("madoka"), 2);
        d.block(ms(2), "madoka");
        assert_eq!(d.senders("madoka"), 2);
        assert!(d.is_cooling_down("madoka"));
    }

    #[test]
    fn stale_redelivery_is_ignored() {
        let d = window(2);
        assert!(d.check(ms(10), "bocchi", "madoka").is_err());
        let pending = d.pending();
        // Same sender, earlier instant: the tally already holds a later expiry.
        assert!(d.check(ms(5), "bocchi", "madoka").is_err());
        assert_eq!(d.pending(), pending);
        assert_eq!(d.senders("madoka"), 1);
    }

    #[test]
    fn refreshed_sender_survives_sweep_of_older_occurrence() {
        let d = window(3);
        assert!(d.check(ms(0), "bocchi", "madoka").is_err());
        assert!(d.check(ms(10), "bocchi", "madoka").is_err());
        assert_eq!(d.pending(), 2);

        // The 0ms occurrence expires at 15ms; bocchi's 10ms post must remain.
        assert!(d.check(ms(16), "ryou", "madoka").is_err());
        assert_eq!(d.senders("madoka"), 2);
        assert!(d.check(ms(17), "kita", "madoka").is_ok());
    }

    #[test]
    fn empty_sender_is_an_ordinary_sender() {
        let d = window(2);
        assert!(d.check(ms(0), "", "madoka").is_err());
        assert!(!d.is_cooling_down("madoka"));
        assert!(d.check(ms(1), "ryou", "madoka").is_ok());
    }

    #[test]
    fn sweep_releases_memory() {
        let d = window(2);
        for (i, text) in ["a", "b", "c", "d"].into_iter().enumerate() {
            let t = i64::try_from(i).unwrap();
            assert!(d.check(ms(t), "bocchi", text).is_err());
        }
        assert_eq!(d.pending(), 4);
        assert!(d.check(ms(1_000), "ryou", "e").is_err());
        assert_eq!(d.pending(), 1);
        assert_eq!(d.senders("a"), 0);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let d = std::sync::Arc::new(window(2));
        assert!(d.check(ms(0), "bocchi", "madoka").is_err());

        let poisoner = std::sync::Arc::clone(&d);
        let joined: std::thread::Result<()> = std::thread::spawn(move || {
            let _guard = poisoner.tally.lock().unwrap();
            panic!("poison the tally");
        })
        .join();
        assert!(joined.is_err());
        assert!(d.tally.is_poisoned());

        assert_eq!(d.senders("madoka"), 1);
        assert!(d.check(ms(1), "ryou", "madoka").is_ok());
        assert!(d.is_cooling_down("madoka"));
    }
}
