use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use placemap_core::Config;

#[derive(Parser)]
#[command(
    name = "placemap",
    version,
    about = "Browse place themes and trip itineraries"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalOptions {
    /// Local data directory or http(s) base URL
    #[arg(long, global = true)]
    pub data_root: Option<String>,

    /// Config file (defaults to ~/.config/placemap/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run filter and search inline instead of on a worker thread
    #[arg(long, global = true)]
    pub no_worker: bool,

    /// Themes kept in memory
    #[arg(long, global = true)]
    pub theme_capacity: Option<usize>,

    /// Trips kept in memory
    #[arg(long, global = true)]
    pub trip_capacity: Option<usize>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl GlobalOptions {
    /// Command-line flags override file and environment settings
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.data_root {
            config.data_root = root.clone();
        }
        if self.no_worker {
            config.use_worker = false;
        }
        if let Some(capacity) = self.theme_capacity {
            config.theme_capacity = capacity;
        }
        if let Some(capacity) = self.trip_capacity {
            config.trip_capacity = capacity;
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// List every dataset in the catalogue
    List,
    /// Show a dataset's places, or one day of a trip
    Show {
        id: String,
        /// Trip day, starting at 1
        #[arg(long)]
        day: Option<usize>,
    },
    /// Show label facets of a dataset
    Facets { id: String },
    /// Filter a dataset by labels
    Filter {
        id: String,
        /// Label value in the default category; repeat to OR values
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Extra category constraint as category=value
        #[arg(long = "where", value_parser = parse_constraint)]
        constraints: Vec<(String, String)>,
    },
    /// Search a dataset by title, address, description and labels
    Search {
        id: String,
        query: String,
        /// Restrict to places carrying one of these labels
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// Interactive line-oriented session
    Browse,
}

pub fn parse_constraint(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((category, value)) if !category.trim().is_empty() && !value.trim().is_empty() => {
            Ok((category.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected category=value, got '{}'", raw)),
    }
}
