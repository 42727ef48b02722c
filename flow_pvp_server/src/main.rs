// CLI entry point for the flow-pvp session server.
//
// Loads an optional JSON config, applies CLI overrides, loads the board
// catalog, and runs the server until the process is killed. See `server.rs`
// for the networking architecture and `authority.rs` for the protocol rules.
//
// Usage:
//   flow-pvp-server [--config <FILE>] [--bind <ADDR>] [--seed <N>]
//                   [--catalog <FILE>] [--max-players <N>] [--log-level <LEVEL>]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use flow_pvp_server::{ServerConfig, ServerError, start_server};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Session server for two-player flow-connect matches
#[derive(Parser, Debug)]
#[command(name = "flow-pvp-server")]
#[command(version)]
struct Args {
    /// JSON config file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<String>,

    /// PRNG seed for ids, colors and board order
    #[arg(long)]
    seed: Option<u64>,

    /// JSON board catalog replacing the built-in boards
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Players allowed per lobby
    #[arg(long)]
    max_players: Option<usize>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("failed to start server: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), ServerError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.catalog.is_some() {
        config.catalog_path = args.catalog;
    }
    if let Some(max_players) = args.max_players {
        config.max_players = max_players;
    }
    config.validate()?;

    let catalog = config.load_catalog()?;
    tracing::info!(boards = catalog.len(), sizes = ?catalog.sizes(), "board catalog loaded");
    let missing = config.missing_sizes(&catalog);
    if !missing.is_empty() {
        tracing::warn!(?missing, "no boards for some configured sizes");
    }

    let (handle, _addr) = start_server(config, catalog)?;
    handle.wait();
    Ok(())
}
