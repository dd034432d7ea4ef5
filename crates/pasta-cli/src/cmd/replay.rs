//! `pasta replay`: feed a JSON-lines transcript through the detectors.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use pasta_core::config::load_project_config;
use pasta_core::transcript::read_entries;
use pasta_core::{Channels, Ingested};
use serde::Serialize;
use tracing::{info, warn};

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines transcript to replay.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Channel for lines that do not name one.
    #[arg(long)]
    pub channel: Option<String>,

    /// Project root holding `.pasta/config.toml` (defaults to the current directory).
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct FlaggedOutput {
    channel: String,
    at: DateTime<Utc>,
    id: String,
    sender: String,
    text: String,
}

#[derive(Debug, Default, Serialize)]
struct ChannelSummary {
    channel: String,
    ingested: usize,
    flags: usize,
    history: usize,
    learning: bool,
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    messages: usize,
    flagged: Vec<FlaggedOutput>,
    channels: Vec<ChannelSummary>,
}

/// Execute `pasta replay`.
pub fn run_replay(args: &ReplayArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let root = args.root.as_deref().unwrap_or(project_root);
    let config = load_project_config(root)?;
    let fallback = args
        .channel
        .clone()
        .unwrap_or_else(|| config.replay.default_channel.clone());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open transcript {}", args.file.display()))?;
    let entries = read_entries(BufReader::new(file))
        .with_context(|| format!("Failed to read transcript {}", args.file.display()))?;
    info!(entries = entries.len(), path = %args.file.display(), "replaying transcript");

    let channels = Channels::new(config);
    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut last_seen: HashMap<String, DateTime<Utc>> = HashMap::new();
    let mut flagged = Vec::new();

    for entry in &entries {
        let name = entry.channel.as_deref().unwrap_or(&fallback);
        let channel = channels.get_or_insert(name)?;
        let message = &entry.message;

        if last_seen
            .get(name)
            .is_some_and(|&previous| message.at < previous)
        {
            warn!(channel = name, id = %message.id, "message is older than its predecessor");
        }
        last_seen.insert(name.to_string(), message.at);

        let verdict = channel.ingest(message);
        let count = counts.entry(name.to_string()).or_default();
        count.0 += 1;
        if verdict == Ingested::Flagged {
            count.1 += 1;
            flagged.push(FlaggedOutput {
                channel: name.to_string(),
                at: message.at,
                id: message.id.clone(),
                sender: message.sender.clone(),
                text: message.text.clone(),
            });
        }
    }

    let summaries = channels
        .names()
        .into_iter()
        .filter_map(|name| {
            let channel = channels.get(&name)?;
            let (ingested, flags) = counts.get(&name).copied().unwrap_or_default();
            Some(ChannelSummary {
                ingested,
                flags,
                history: channel.history().count(),
                learning: channel.is_learning(),
                channel: name,
            })
        })
        .collect();

    let out = ReplayOutput {
        messages: entries.len(),
        flagged,
        channels: summaries,
    };

    render_mode(output, &out, render_text, render_pretty)
}

fn render_text(out: &ReplayOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for f in &out.flagged {
        writeln!(
            w,
            "flagged channel={} at={} id={} sender={} text={:?}",
            f.channel,
            f.at.to_rfc3339(),
            f.id,
            f.sender,
            f.text
        )?;
    }
    for c in &out.channels {
        writeln!(
            w,
            "channel name={} ingested={} flags={} history={} learning={}",
            c.channel, c.ingested, c.flags, c.history, c.learning
        )?;
    }
    Ok(())
}

fn render_pretty(out: &ReplayOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Copypasta")?;
    if out.flagged.is_empty() {
        writeln!(w, "(none)")?;
    }
    for f in &out.flagged {
        writeln!(
            w,
            "{}  {:<12} {:<16} {}",
            f.at.format("%Y-%m-%d %H:%M:%S"),
            f.channel,
            f.sender,
            f.text
        )?;
    }

    for c in &out.channels {
        writeln!(w)?;
        pretty_section(w, &c.channel)?;
        pretty_kv(w, "Ingested", c.ingested.to_string())?;
        pretty_kv(w, "Flags", c.flags.to_string())?;
        pretty_kv(w, "History", c.history.to_string())?;
        pretty_kv(w, "Learning", c.learning.to_string())?;
    }
    Ok(())
}
