#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pasta: chat history and copypasta detection",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Replay a chat transcript through the detectors",
        long_about = "Feed a JSON-lines transcript through per-channel history and copypasta\n\
                      detection, print every detection, then summarize each channel.",
        after_help = "EXAMPLES:\n    # Replay into the default channel\n    pasta replay chat.jsonl\n\n\
                      # Lines without a channel go to #kessoku\n    pasta replay chat.jsonl --channel '#kessoku'\n\n\
                      # Machine-readable output\n    pasta replay chat.jsonl --format json"
    )]
    Replay(cmd::replay::ReplayArgs),

    #[command(about = "Deterministic simulation campaigns")]
    Sim(cmd::sim::SimArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PASTA_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "pasta=debug,info"
        } else {
            "pasta=info,warn"
        })
    });

    let format = env::var("PASTA_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = env::current_dir()?;
    let output = output::resolve_output_mode(cli.format, cli.json);
    debug!(?output, "resolved output mode");

    let result = match &cli.command {
        Commands::Replay(args) => cmd::replay::run_replay(args, output, &project_root),
        Commands::Sim(args) => cmd::sim::run_sim(args, output),
    };

    if let Err(err) = &result {
        output::render_error(output, &CliError::from(err))?;
        std::process::exit(1);
    }

    Ok(())
}
