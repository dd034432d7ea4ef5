use chrono::{TimeZone, Utc};
use pasta_core::ledger::EventLedger;
use proptest::prelude::*;

const RETENTION_SECS: i64 = 15 * 60;

/// Strictly increasing instants in seconds.
fn arb_instants() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..400, 1..80).prop_map(|gaps| {
        let mut now = 0;
        gaps.into_iter()
            .map(|gap| {
                now += gap;
                now
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(1000))]

    #[test]
    fn all_yields_live_records_in_order(instants in arb_instants()) {
        let ledger = EventLedger::new();
        for (i, secs) in instants.iter().enumerate() {
            ledger.add(Utc.timestamp_opt(*secs, 0).unwrap(), format!("m{i}"), "bocchi", *secs);
        }

        let latest = *instants.last().unwrap();
        let want: Vec<i64> = instants
            .iter()
            .copied()
            .filter(|secs| secs + RETENTION_SECS > latest)
            .collect();
        let got: Vec<i64> = ledger.all().map(|r| r.payload).collect();
        prop_assert_eq!(got, want);
    }

    #[test]
    fn all_is_idempotent(instants in arb_instants()) {
        let ledger = EventLedger::new();
        for (i, secs) in instants.iter().enumerate() {
            ledger.add(Utc.timestamp_opt(*secs, 0).unwrap(), format!("m{i}"), "ryou", ());
        }

        let first: Vec<String> = ledger.all().map(|r| r.id.clone()).collect();
        let second: Vec<String> = ledger.all().map(|r| r.id.clone()).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn expiry_is_insertion_plus_retention(instants in arb_instants()) {
        let ledger = EventLedger::new();
        for secs in &instants {
            ledger.add(Utc.timestamp_opt(*secs, 0).unwrap(), "m", "kita", *secs);
        }
        for record in ledger.all() {
            prop_assert_eq!(record.expiry.timestamp(), record.payload + RETENTION_SECS);
        }
    }
}
