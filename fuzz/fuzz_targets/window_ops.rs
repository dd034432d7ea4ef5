#![no_main]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use pasta_core::DuplicateWindow;

const SENDERS: [&str; 4] = ["bocchi", "ryou", "nijika", ""];
const TEXTS: [&str; 3] = ["madoka", "homura", ""];

// Each byte triple is (gap, sender, text); the high bit of the sender
// byte turns the step into a moderator block.
fuzz_target!(|data: &[u8]| {
    let window = DuplicateWindow::new(2, Duration::from_millis(500));
    let mut millis = 0_i64;
    for op in data.chunks_exact(3) {
        millis += i64::from(op[0]) * 37;
        let Some(at) = Utc.timestamp_millis_opt(millis).single() else {
            return;
        };
        let text = TEXTS[usize::from(op[2]) % TEXTS.len()];
        if op[1] & 0x80 != 0 {
            window.block(at, text);
        } else {
            let sender = SENDERS[usize::from(op[1]) % SENDERS.len()];
            let _ = window.check(at, sender, text);
        }
        assert!(window.senders(text) <= SENDERS.len() + 1);
    }
});
