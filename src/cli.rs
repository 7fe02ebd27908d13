//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{FeedConfig, Severity};
use crate::errors::RoadtailError;
use crate::output::Format;

/// Watch Open511 road events from your terminal.
#[derive(Parser, Debug)]
#[command(name = "roadtail")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show current events (one-shot fetch and exit)
    Tail(TailArgs),

    /// Poll forever, rewriting an HTML page after every fetch
    Watch(WatchArgs),

    /// Poll forever and serve the page with live updates
    Ui(UiArgs),
}

/// Feed options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct FeedArgs {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Open511 events endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Jurisdiction to query
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// Server-side severity filter (minor, moderate, major, unknown)
    #[arg(long, value_parser = parse_severity)]
    pub severity: Option<Severity>,

    /// Maximum number of events requested
    #[arg(long)]
    pub limit: Option<u32>,

    /// Keep only events whose first subtype matches (e.g. FIRE)
    #[arg(long)]
    pub subtype: Option<String>,

    /// Insert feed text into the page without escaping
    #[arg(long)]
    pub raw_markup: bool,
}

impl FeedArgs {
    /// Build the feed configuration: defaults, then file, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn resolve(&self, poll_interval: Option<u64>) -> Result<FeedConfig, RoadtailError> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::load(path)?,
            None => FeedConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(jurisdiction) = &self.jurisdiction {
            config.jurisdiction.clone_from(jurisdiction);
        }
        if self.severity.is_some() {
            config.severity = self.severity;
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if self.subtype.is_some() {
            config.subtype.clone_from(&self.subtype);
        }
        if let Some(secs) = poll_interval {
            config.poll_interval_secs = secs;
        }
        config.raw_markup |= self.raw_markup;

        Ok(config)
    }
}

/// Arguments for the `tail` command.
#[derive(Parser, Debug)]
pub struct TailArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// HTML file rewritten after every fetch
    #[arg(long, short = 'o', default_value = "roadtail.html")]
    pub out: PathBuf,

    /// Poll interval in seconds (minimum 30, default 900)
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Poll interval in seconds (minimum 30, default 900)
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a severity from string.
fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse()
}
