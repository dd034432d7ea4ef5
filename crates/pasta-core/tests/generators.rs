use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

pub const SENDERS: &[&str] = &["bocchi", "ryou", "nijika", "kita"];
pub const TEXTS: &[&str] = &["madoka", "homura", "sayaka"];

pub fn instant(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

/// Gaps between consecutive instants: mostly short, sometimes long enough
/// to outlast a window or cooldown.
pub fn arb_gap_millis() -> impl Strategy<Value = i64> + Clone {
    prop_oneof![
        8 => 0i64..10,
        1 => 10i64..2_000,
        1 => Just(15 * 60 * 1_000),
    ]
}

#[derive(Debug, Clone)]
pub enum Op {
    Check { sender: usize, text: usize },
    Block { text: usize },
}

pub fn arb_op() -> impl Strategy<Value = Op> + Clone {
    prop_oneof![
        9 => (0..SENDERS.len(), 0..TEXTS.len()).prop_map(|(sender, text)| Op::Check { sender, text }),
        1 => (0..TEXTS.len()).prop_map(|text| Op::Block { text }),
    ]
}

/// Ops paired with non-decreasing instants in milliseconds.
pub fn arb_timeline(max_len: usize) -> impl Strategy<Value = Vec<(i64, Op)>> {
    prop::collection::vec((arb_gap_millis(), arb_op()), 1..max_len).prop_map(|steps| {
        let mut now = 0i64;
        steps
            .into_iter()
            .map(|(gap, op)| {
                now += gap;
                (now, op)
            })
            .collect()
    })
}
