//! CLI Module
//!
//! Command-line interface for the resound playback simulator.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Resound Simulator - run scripted playback sessions against a virtual device
#[derive(Parser, Debug)]
#[command(name = "resound-sim")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scripted session: music crossfade plus periodic sound effects
    #[command(name = "run")]
    Run(RunArgs),

    /// Print the effective configuration as JSON
    #[command(name = "print-config")]
    PrintConfig {
        /// Configuration file (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse an asset manifest and report what it declares
    #[command(name = "check-manifest")]
    CheckManifest {
        /// Path to the manifest
        path: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file (defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Asset manifest (built-in demo assets when omitted)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Seconds per tick
    #[arg(long, default_value_t = 1.0 / 60.0)]
    pub dt: f32,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            config: None,
            manifest: None,
            ticks: 600,
            dt: 1.0 / 60.0,
        }
    }
}
