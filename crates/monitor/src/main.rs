//! bidwatch - chat-log item monitor
//!
//! Tails a game log file, extracts pipe-separated item links from a chosen
//! chat channel, resolves them against the item catalog, and pushes each
//! resolved batch to connected bidding clients as one JSON array per line.
//!
//! # Usage
//!
//! ```bash
//! # First run: pass the log file and channel (both are remembered)
//! bidwatch --file ~/eq/Logs/eqlog_Berik_project.txt --channel Bids \
//!          --catalog-url https://example.org/api/items
//!
//! # Later runs pick the stored preferences up
//! bidwatch
//! ```

mod prefs;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bidwatch_catalog::{CatalogFetcher, SharedCatalog};
use bidwatch_pipeline::{
    ui_channel, Broadcaster, BroadcasterConfig, Coordinator, MonitorTarget, UiEvent,
};

use crate::prefs::PrefStore;

/// bidwatch - push chat-channel item links to bidding clients
#[derive(Parser, Debug)]
#[command(name = "bidwatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log file to monitor (falls back to the stored preference)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Chat channel to monitor (falls back to the stored preference)
    #[arg(short, long)]
    channel: Option<String>,

    /// Address for the push listener
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Item catalog endpoint (a JSON array of objects with a Name field).
    /// Without one, raw tokens are pushed unresolved.
    #[arg(long)]
    catalog_url: Option<String>,

    /// Interval between catalog refreshes
    #[arg(long, default_value = "15m", value_parser = humantime::parse_duration)]
    refresh_interval: Duration,

    /// Preference file location (defaults to the OS config dir)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    // Resolve file + channel from flags and stored preferences; flags win
    // and are persisted for the next run
    let store = cli
        .prefs
        .clone()
        .map(PrefStore::at)
        .or_else(|| PrefStore::default_location().map(PrefStore::at));
    let mut preferences = store.as_ref().map(|s| s.load()).unwrap_or_default();

    let mut changed = false;
    if let Some(file) = &cli.file {
        let file = file.to_string_lossy().into_owned();
        if preferences.path.as_deref() != Some(file.as_str()) {
            preferences.path = Some(file);
            changed = true;
        }
    }
    if let Some(channel) = &cli.channel {
        if preferences.channel.as_deref() != Some(channel.as_str()) {
            preferences.channel = Some(channel.clone());
            changed = true;
        }
    }
    if changed {
        if let Some(store) = &store {
            if let Err(e) = store.save(&preferences) {
                warn!(error = %e, "could not persist preferences");
            }
        }
    }

    let Some(file) = preferences.path.clone() else {
        bail!("no log file configured; pass --file once, it is remembered");
    };
    let Some(channel) = preferences.channel.clone() else {
        bail!("no chat channel configured; pass --channel once, it is remembered");
    };

    // Catalog: empty until (and unless) the first fetch lands
    let catalog = SharedCatalog::empty();
    if let Some(url) = cli.catalog_url.clone() {
        let fetcher =
            CatalogFetcher::new(url, catalog.clone())?.with_interval(cli.refresh_interval);
        tokio::spawn(fetcher.run());
    } else {
        info!("no catalog endpoint configured, pushing raw tokens unresolved");
    }

    let (ui, mut events) = ui_channel();
    let broadcaster = Arc::new(Broadcaster::new(
        BroadcasterConfig {
            listen_addr: cli.listen,
        },
        ui.clone(),
    ));
    let mut coordinator = Coordinator::new(catalog, Arc::clone(&broadcaster), ui);
    coordinator
        .start(MonitorTarget::new(file, channel))
        .await?;

    // The local "UI": print the status tap and detected items until ctrl-c
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(UiEvent::Status(line)) => println!("{line}"),
                Some(UiEvent::Batch(batch)) => {
                    for name in batch.names() {
                        println!("Item detected: {name}");
                    }
                }
                None => break,
            }
        }
    }

    info!("shutting down");
    coordinator.stop().await;
    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
