#![no_main]

use libfuzzer_sys::fuzz_target;
use pasta_core::transcript::parse_line;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        let _ = parse_line(1, line);
    }
});
