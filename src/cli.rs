// src/cli.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::config::ENV_CONFIG_PATH;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Path to the feed registry (TOML or JSON).
    ///
    /// When absent, mastopost looks for `mastopost.toml`, `config/mastopost.toml`
    /// and `mastopost.json` in the current directory, in that order.
    #[arg(short, long, env = ENV_CONFIG_PATH, value_hint(ValueHint::FilePath), global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Post new entries of one or more feeds.
    Run {
        /// Feed name from the registry. Repeat for several feeds.
        #[arg(short, long = "feed", required = true)]
        feeds: Vec<String>,

        /// Log what would be posted; post nothing and save nothing.
        #[arg(long)]
        dry_run: bool,

        /// Repeat every N seconds until Ctrl-C.
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        every: Option<u64>,
    },

    /// List configured feeds.
    List,

    /// Show the stored watermark of a feed.
    Status {
        #[arg(short, long)]
        feed: String,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
