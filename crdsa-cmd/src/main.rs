mod check;
mod decode;
mod scenario;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the random access frames of a scenario file.
    ///
    /// A scenario is a JSON document of the form
    /// {"slot_count": <n>, "frames": [[<replica>, ...], ...]} where every replica gives its
    /// packet key, home slot, sibling slots and signal quality.
    ///
    /// Frames that violate replica consistency are reported and skipped.
    Decode {
        /// Decoder configuration (JSON).
        ///
        /// Without one, a single 3dB SINR threshold is used for all waveforms.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,

        /// Override the decode policy of the configuration.
        #[arg(short, long)]
        policy: Option<decode::Policy>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: decode::Format,

        /// Input scenario file.
        input: PathBuf,
    },
    /// Check that every frame of a scenario file is replica consistent.
    ///
    /// Every sibling slot of every replica must hold a replica of the same packet.
    Check {
        /// Input scenario file.
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("CRDSA_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Decode {
            config,
            policy,
            format,
            input,
        } => decode::decode(input, config.as_deref(), policy.as_ref(), format),
        Commands::Check { input } => check::check(input),
    }
}
