#![forbid(unsafe_code)]

use anyhow::Result;
use pasta_sim::campaign::{CampaignConfig, run_campaign};

fn main() -> Result<()> {
    let config = CampaignConfig {
        seed_range: 0..20,
        ..CampaignConfig::default()
    };
    let report = run_campaign(&config)?;

    println!(
        "campaign complete: seeds={} passed={} flagged={} interesting={}",
        report.seeds_run, report.seeds_passed, report.flagged, report.interesting_states_reached
    );

    if let Some(seed) = report.first_failure {
        anyhow::bail!("seed {seed} failed; replay with `pasta sim replay --seed {seed}`");
    }
    Ok(())
}
