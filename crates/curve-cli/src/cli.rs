//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Per-file focus time tracker.
///
/// Passively measures how long each file stays focused in the editor and
/// renders the totals as a ranked chart.
#[derive(Debug, Parser)]
#[command(name = "curve", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track focus events read as JSON Lines from stdin.
    ///
    /// End of input is treated as editor shutdown.
    Track {
        /// File active in the editor when tracking starts.
        #[arg(long)]
        active: Option<String>,
    },

    /// Show the ranked focus time visualization.
    Show {
        /// Emit `commitData` messages for a host UI instead of drawing a chart.
        #[arg(long)]
        json: bool,

        /// Only show the N most focused files.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Export accumulated focus time as JSON.
    Export {
        /// Directory to write `activity.json` into.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show current tracking status.
    Status,
}
