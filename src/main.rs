//! Resound Simulator
//!
//! Command-line front end that drives the playback engine against a
//! virtual device.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use resound::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    info!("Resound Simulator v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Resound Simulator v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Run(args) => commands::run(&args),
        Commands::PrintConfig { config } => commands::print_config(config.as_deref()),
        Commands::CheckManifest { path } => commands::check_manifest(&path),
    }
}
