//! Bounded time-window log of recent messages.
//!
//! [`EventLedger`] keeps every record added during the last
//! [`RETENTION`](crate::expiry::RETENTION) window in insertion order. Expired
//! records are swept from the oldest end by the next [`EventLedger::add`],
//! so the cost of eviction is paid by writers in proportion to what they
//! remove, never by readers.
//!
//! # Concurrency
//!
//! The oldest and newest ends share one short-held mutex. A writer builds
//! its record before taking the lock and publishes it as an immutable
//! [`Arc`], so a reader holding a record can never see it half-built, even
//! after it has been unlinked. [`EventLedger::all`] re-acquires the lock
//! for each step instead of holding it across the traversal, which keeps
//! concurrent writers and readers from waiting on anything but a bounded
//! critical section.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::expiry::{RETENTION, expiry_after, is_expired};

/// One message held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record<T> {
    /// Message identifier assigned by the chat service.
    pub id: String,
    /// Identifier of the sending user.
    pub sender: String,
    /// Message content.
    pub payload: T,
    /// Instant after which the record is eligible for eviction.
    pub expiry: DateTime<Utc>,
}

#[derive(Debug)]
struct Slot<T> {
    seq: u64,
    record: Arc<Record<T>>,
}

#[derive(Debug)]
struct Log<T> {
    slots: VecDeque<Slot<T>>,
    next_seq: u64,
}

impl<T> Log<T> {
    /// Sequence number of the oldest live slot, or `next_seq` when empty.
    fn first_seq(&self) -> u64 {
        self.slots.front().map_or(self.next_seq, |slot| slot.seq)
    }

    /// Drop records from the oldest end until the first live one.
    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        while let Some(front) = self.slots.front() {
            if !is_expired(front.record.expiry, now) {
                break;
            }
            self.slots.pop_front();
            evicted += 1;
        }
        evicted
    }

    fn push(&mut self, record: Arc<Record<T>>) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.slots.push_back(Slot { seq, record });
    }
}

/// Append-only, time-bounded log of recent records.
///
/// Generic over the payload so the same structure can hold display text,
/// parsed messages, or anything else a channel wants to audit.
#[derive(Debug)]
pub struct EventLedger<T> {
    log: Mutex<Log<T>>,
}

impl<T> Default for EventLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventLedger<T> {
    /// Create an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            log: Mutex::new(Log {
                slots: VecDeque::new(),
                next_seq: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Log<T>> {
        // Critical sections never leave the log half-updated, so a panic
        // elsewhere while holding the lock cannot have corrupted it.
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a message received at `at`.
    ///
    /// Evicts every record whose expiry is at or before `at`, then appends
    /// the new record with an expiry of `at` plus the fixed retention.
    pub fn add(&self, at: DateTime<Utc>, id: impl Into<String>, sender: impl Into<String>, payload: T) {
        let record = Arc::new(Record {
            id: id.into(),
            sender: sender.into(),
            payload,
            expiry: expiry_after(at, RETENTION),
        });

        let mut log = self.lock();
        let evicted = log.sweep(at);
        log.push(record);
        let live = log.slots.len();
        drop(log);

        if evicted > 0 {
            debug!(evicted, live, "ledger sweep");
        }
    }

    /// Traverse the ledger from oldest to newest.
    ///
    /// The traversal is lazy and bounded by the records present when it
    /// starts: records added afterwards are not visited, and records
    /// evicted before the traversal reaches them are skipped. Clone the
    /// returned iterator before advancing it to traverse the same range
    /// again.
    #[must_use]
    pub fn all(&self) -> Records<'_, T> {
        let log = self.lock();
        let cursor = log.first_seq();
        let end = log.next_seq;
        drop(log);
        Records {
            ledger: self,
            cursor,
            end,
        }
    }

    /// Number of records currently held, including any not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// Returns true if the ledger holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }
}

/// Lazy oldest-to-newest traversal returned by [`EventLedger::all`].
#[derive(Debug)]
pub struct Records<'a, T> {
    ledger: &'a EventLedger<T>,
    cursor: u64,
    end: u64,
}

impl<T> Clone for Records<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger,
            cursor: self.cursor,
            end: self.end,
        }
    }
}

impl<T> Iterator for Records<'_, T> {
    type Item = Arc<Record<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }

        let log = self.ledger.lock();
        // Slots carry contiguous sequence numbers, so the cursor maps
        // directly onto a deque index once evicted records are skipped.
        self.cursor = self.cursor.max(log.first_seq());
        if self.cursor >= self.end {
            return None;
        }
        let offset = usize::try_from(self.cursor - log.first_seq()).ok()?;
        let record = Arc::clone(&log.slots.get(offset)?.record);
        drop(log);

        self.cursor += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end.saturating_sub(self.cursor)).ok();
        (0, remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn ids<T>(ledger: &EventLedger<T>) -> Vec<String> {
        ledger.all().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn empty_ledger_yields_nothing() {
        let ledger: EventLedger<String> = EventLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.all().count(), 0);
    }

    #[test]
    fn add_sets_expiry_from_retention() {
        let ledger = EventLedger::new();
        ledger.add(at(100), "m1", "bocchi", "kessoku".to_string());

        let records: Vec<_> = ledger.all().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sender, "bocchi");
        assert_eq!(records[0].payload, "kessoku");
        assert_eq!(records[0].expiry, at(100 + 15 * 60));
    }

    #[test]
    fn old_records_are_swept_by_next_add() {
        let ledger = EventLedger::new();
        ledger.add(at(1), "m1", "bocchi", ());
        ledger.add(at(1_000_000), "m2", "ryou", ());
        assert_eq!(ids(&ledger), vec!["m2"]);
    }

    #[test]
    fn record_expiring_exactly_now_is_swept() {
        let ledger = EventLedger::new();
        ledger.add(at(0), "m1", "bocchi", ());
        ledger.add(at(15 * 60), "m2", "ryou", ());
        assert_eq!(ids(&ledger), vec!["m2"]);

        ledger.add(at(15 * 60 + 1), "m3", "kita", ());
        assert_eq!(ids(&ledger), vec!["m2", "m3"]);
    }

    #[test]
    fn traversal_preserves_insertion_order() {
        let ledger = EventLedger::new();
        for (i, name) in ["a", "b", "c", "d"].into_iter().enumerate() {
            ledger.add(at(i64::try_from(i).unwrap()), name, "nijika", i);
        }
        assert_eq!(ids(&ledger), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn traversal_is_bounded_by_start() {
        let ledger = EventLedger::new();
        ledger.add(at(0), "m1", "bocchi", ());
        let mut records = ledger.all();
        ledger.add(at(1), "m2", "ryou", ());

        assert_eq!(records.next().map(|r| r.id.clone()), Some("m1".to_string()));
        assert!(records.next().is_none());
    }

    #[test]
    fn traversal_skips_records_evicted_midway() {
        let ledger = EventLedger::new();
        ledger.add(at(0), "m1", "bocchi", ());
        ledger.add(at(1), "m2", "ryou", ());
        ledger.add(at(2), "m3", "kita", ());

        let mut records = ledger.all();
        assert_eq!(records.next().map(|r| r.id.clone()), Some("m1".to_string()));

        // Evicts m1 and m2, keeps m3.
        ledger.add(at(15 * 60 + 1), "m4", "nijika", ());
        let rest: Vec<_> = records.map(|r| r.id.clone()).collect();
        assert_eq!(rest, vec!["m3"]);
    }

    #[test]
    fn cloned_traversal_restarts() {
        let ledger = EventLedger::new();
        ledger.add(at(0), "m1", "bocchi", ());
        ledger.add(at(1), "m2", "ryou", ());

        let records = ledger.all();
        let first: Vec<_> = records.clone().map(|r| r.id.clone()).collect();
        let second: Vec<_> = records.map(|r| r.id.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn held_record_survives_eviction() {
        let ledger = EventLedger::new();
        ledger.add(at(0), "m1", "bocchi", "guitar".to_string());
        let held = ledger.all().next().unwrap();

        ledger.add(at(1_000_000), "m2", "ryou", "bass".to_string());
        assert_eq!(held.payload, "guitar");
        assert_eq!(ids(&ledger), vec!["m2"]);
    }

    #[test]
    fn non_monotonic_add_does_not_corrupt() {
        let ledger = EventLedger::new();
        ledger.add(at(10_000), "m1", "bocchi", ());
        ledger.add(at(5), "m2", "ryou", ());
        assert_eq!(ids(&ledger), vec!["m1", "m2"]);
    }

    #[test]
    fn concurrent_adds_are_all_kept() {
        let ledger = Arc::new(EventLedger::new());
        let handles: Vec<_> = (0..64)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    ledger.add(at(1), format!("m{i}"), format!("user{i}"), i);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen: Vec<_> = ledger.all().map(|r| r.payload).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..64).collect::<Vec<_>>());
    }
}
