//! roadtail - Watch Open511 road events from your terminal.
//!
//! Periodically fetches active events from an Open511 endpoint (DriveBC by
//! default), selects the ones worth showing, and renders them as an HTML
//! table with map links.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod client;
mod config;
mod errors;
mod filters;
mod geo;
mod models;
mod output;
mod poller;
mod render;
mod server;
mod surface;

use cli::{Cli, Command};
use client::Open511Client;
use config::{FeedConfig, MIN_POLL_INTERVAL_SECS};
use poller::Poller;
use render::Renderer;
use surface::PageFile;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;

    match cli.command {
        Command::Tail(args) => runtime.block_on(cmd_tail(args)),
        Command::Watch(args) => runtime.block_on(cmd_watch(args)),
        Command::Ui(args) => cmd_ui(&runtime, args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Resolve the feed configuration, clamping the poll interval.
fn resolve_config(feed: &cli::FeedArgs, poll_interval: Option<u64>) -> Result<FeedConfig> {
    let mut config = feed
        .resolve(poll_interval)
        .context("failed to load configuration")?;

    if config.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
        tracing::warn!(
            "poll interval clamped to minimum of {} seconds",
            MIN_POLL_INTERVAL_SECS
        );
        config.poll_interval_secs = MIN_POLL_INTERVAL_SECS;
    }
    Ok(config)
}

/// Execute the `tail` command - one-shot fetch of current events.
async fn cmd_tail(args: cli::TailArgs) -> Result<()> {
    let config = resolve_config(&args.feed, None)?;
    let client = Open511Client::new(&config).context("failed to create Open511 client")?;

    let feed = client
        .fetch_events()
        .await
        .context("failed to fetch road events")?;
    if feed.is_truncated() {
        tracing::warn!("server has more events than returned; consider raising --limit");
    }

    let selection = config.selector().select(&feed.events);
    let renderer = Renderer::new(config.markup());

    // Write output
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_selection(&mut handle, &selection, args.format, &renderer)?;
    handle.flush()?;

    Ok(())
}

/// Execute the `watch` command - poll and rewrite an HTML page.
async fn cmd_watch(args: cli::WatchArgs) -> Result<()> {
    let config = resolve_config(&args.feed, args.poll_interval)?;
    let client = Open511Client::new(&config).context("failed to create Open511 client")?;

    tracing::info!(
        "watching {} (poll every {}s), writing {}",
        client.url(),
        config.poll_interval_secs,
        args.out.display()
    );

    let surface = Arc::new(tokio::sync::Mutex::new(PageFile::new(&args.out)));
    let poller = Poller::new(
        client,
        config.selector(),
        Renderer::new(config.markup()),
        Arc::clone(&surface),
    );
    let handle = poller.spawn(config.poll_interval());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    tracing::info!("stopping");
    handle.stop().await;

    let last = surface.lock().await;
    tracing::info!(
        "last page: {} as of {}",
        last.page().count(),
        last.page().timestamp()
    );

    Ok(())
}

/// Execute the `ui` command - start web server.
fn cmd_ui(runtime: &tokio::runtime::Runtime, args: cli::UiArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        feed: resolve_config(&args.feed, args.poll_interval)?,
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🚧 roadtail Web UI\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Feed:    {}", config.feed.jurisdiction);
    println!("  Poll:    {}s", config.feed.poll_interval_secs);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    runtime.block_on(server::run_server(config))
}
