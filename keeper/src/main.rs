//! Strike keeper
//!
//! Off-chain service that replays the engine's command journal, expires
//! positions nobody settled, and reports pool health.

mod config;
mod expiry_queue;
mod health;
mod journal;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use journal::JournalReader;
use runtime::Keeper;
use std::path::Path;
use std::time::Duration;
use tokio::time;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Strike keeper");

    // Load configuration
    let config_path = Config::path();
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({:#}), using default local config", e);
        if !Path::new(shellexpand::tilde(&config_path).as_ref()).exists() {
            if let Err(e) = Config::write_default(&config_path) {
                log::warn!("{:#}", e);
            }
        }
        Config::default_local()
    });

    let journal_path = config.journal_file();
    log::info!("Journal: {}", journal_path);
    log::info!("Pool account: {}", config.pool.account);
    log::info!("Custody account: {}", config.engine.custody);

    let mut keeper = Keeper::new(&config);
    let mut reader = JournalReader::new(&journal_path);

    // Initial replay
    let applied = process_new_entries(&mut keeper, &mut reader)
        .context("Failed to replay journal")?;
    log::info!("Replayed {} journal entries up to t={}", applied, keeper.now());
    keeper.report()?;

    if !config.follow {
        let stats = keeper.stats();
        log::info!(
            "Done: {} applied, {} rejected, {} expired, {} malformed lines skipped",
            stats.applied,
            stats.rejected,
            stats.expired,
            reader.skipped()
        );
        return Ok(());
    }

    log::info!("Following journal...");

    // Main event loop
    let mut interval = time::interval(Duration::from_secs(config.poll_interval_secs.max(1)));

    loop {
        interval.tick().await;

        match process_new_entries(&mut keeper, &mut reader) {
            Ok(0) => log::debug!("No new journal entries"),
            Ok(n) => {
                log::debug!("Applied {} new entries", n);
                if let Err(e) = keeper.report() {
                    log::error!("Health report failed: {}", e);
                }
            }
            Err(e) => log::error!("Error reading journal: {:#}", e),
        }

        if let Some(next) = keeper.queue().peek() {
            log::debug!("Next expiry: position {} at {}", next.id, next.expiry);
        }
    }
}

/// Apply every entry appended since the last poll; returns how many
fn process_new_entries(keeper: &mut Keeper, reader: &mut JournalReader) -> Result<usize> {
    let entries = reader.poll()?;
    let count = entries.len();

    for entry in entries {
        for event in keeper.apply(entry) {
            log::info!("event {}", serde_json::to_string(&event)?);
        }
    }

    Ok(count)
}
