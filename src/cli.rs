use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search browsing history with a natural-language query
    Search {
        /// What to look for, e.g. "that reddit thread about arcane wallpapers"
        query: String,

        /// Time window: all_time, last_day, last_week or last_month
        #[clap(short, long)]
        time_range: Option<String>,

        /// Most history records to examine
        #[clap(short, long)]
        max_items: Option<usize>,

        /// History JSON export to search instead of the configured one
        #[clap(long)]
        history: Option<PathBuf>,
    },
    /// Serve the search API over HTTP
    Daemon {
        /// Address to listen on
        #[clap(short, long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// History JSON export to search instead of the configured one
        #[clap(long)]
        history: Option<PathBuf>,
    },
}
