//! Command-line interface definition for feedrelay
//!
//! Uses clap's derive API. `run` starts the polling loop, `watermark`
//! inspects the delivery state kept in the watermark database.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// feedrelay - relay RSS/Atom feed items as CloudEvents
///
/// Polls the configured feeds, converts unseen items into events and
/// submits them to the destination with at-least-once delivery.
#[derive(Parser, Debug, Clone)]
#[command(name = "feedrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/feedrelay.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for feedrelay
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Poll feeds and submit new items
    Run {
        /// File with one feed url per line (overrides feeds.urls_file)
        #[arg(short, long)]
        feeds_file: Option<PathBuf>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Inspect stored watermarks
    Watermark {
        /// Watermark subcommand
        #[command(subcommand)]
        command: WatermarkCommand,
    },
}

/// Watermark inspection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum WatermarkCommand {
    /// List all stored watermarks
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the watermark of one feed
    Get {
        /// Feed url
        url: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
