use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autoreel")]
#[command(author, version, about = "Short-video production pipeline")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and record the next unseen news topic
    Fetch {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Produce and publish a video about a topic
    Run {
        /// Topic title (fetches news when omitted)
        #[arg(long)]
        topic: Option<String>,

        /// Context for the topic
        #[arg(long, requires = "topic", default_value = "")]
        description: String,
    },

    /// Continue the current version from where it stopped
    Resume,

    /// Show the current version and the status of each stage
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear the processed-topic history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Print the current version number
    Version,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Summary of processed topics
    Stats,

    /// Forget every processed topic
    Clear,
}
