//! Shared time arithmetic for the windowed structures.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// How long the ledger keeps a message after it arrives.
pub const RETENTION: Duration = Duration::from_secs(15 * 60);

/// How long a detected copypasta stays suppressed before it can flag again.
pub const COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Instant at which something recorded at `at` with lifetime `ttl` expires.
///
/// Saturates at the largest representable instant instead of panicking.
#[must_use]
pub fn expiry_after(at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// True once `expiry` is no longer in the future relative to `now`.
#[must_use]
pub fn is_expired(expiry: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expiry <= now
}
