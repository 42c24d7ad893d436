// Copyright 2025 EDJournal (https://github.com/edjournal)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! EDJournal CLI
//!
//! Inspect, tail and summarize Elite Dangerous journal folders.

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use edjournal_core::{classify_record, Category, ClassifiedEvent};
use edjournal_ingest::{
    discover, read_status, BatchHandler, FnHandler, IngestBatch, JournalFile, JournalWatcher,
    ReadPosition, SystemEvent,
};
use edjournal_query::{QueryEngine, ALL_TIME, DEFAULT_QUERY_LIMIT};
use edjournal_storage::{EventFilter, EventStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "edjournal")]
#[command(about = "EDJournal - Elite Dangerous journal ingestion", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Journal directory, overrides the configured one
    #[arg(short, long)]
    journal_dir: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List journal files, newest first
    Scan {
        /// Include `.log.backup` files
        #[arg(long)]
        backups: bool,

        /// Read each file's first record
        #[arg(long)]
        peek: bool,
    },

    /// Tail the newest journal and Status.json until Ctrl-C
    Watch {
        /// Replay the newest journal from its start
        #[arg(long)]
        catch_up: bool,
    },

    /// Load journals and print activity summaries
    Summary {
        /// Load every journal instead of only the newest
        #[arg(long)]
        all: bool,

        /// Only count events from the last N minutes
        #[arg(long)]
        window_minutes: Option<u64>,
    },

    /// Load journals and list matching events, newest first
    Query {
        /// Load every journal instead of only the newest
        #[arg(long)]
        all: bool,

        /// Record type tag, e.g. FSDJump
        #[arg(long = "type")]
        record_type: Option<String>,

        /// Category name, e.g. Navigation
        #[arg(long)]
        category: Option<String>,

        /// Star system the event refers to
        #[arg(long)]
        system: Option<String>,

        /// Case-insensitive text search
        #[arg(long)]
        text: Option<String>,

        #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.journal_dir {
        config.journal.dir = dir.clone();
    }
    logging::init(&config.logging, cli.verbose);
    source.log();

    match cli.command {
        Commands::Scan { backups, peek } => scan(&config, backups, peek, cli.json),
        Commands::Watch { catch_up } => {
            if catch_up {
                config.journal.catch_up = true;
            }
            watch(&config, cli.json)
        }
        Commands::Summary {
            all,
            window_minutes,
        } => summary(&config, all, window_minutes),
        Commands::Query {
            all,
            record_type,
            category,
            system,
            text,
            limit,
        } => {
            let mut filter = EventFilter::new().limit(limit);
            if let Some(record_type) = record_type {
                filter = filter.record_type(record_type);
            }
            if let Some(category) = category {
                let category: Category = category
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .context("Invalid --category")?;
                filter = filter.category(category);
            }
            if let Some(system) = system {
                filter = filter.system_name(system);
            }
            if let Some(text) = text {
                filter = filter.text(text);
            }
            query(&config, all, &filter, cli.json)
        }
    }
}

#[derive(Serialize)]
struct ScanEntry<'a> {
    #[serde(flatten)]
    file: &'a JournalFile,
    size: Option<u64>,
    first_record: Option<String>,
}

fn scan(config: &AppConfig, backups: bool, peek: bool, json: bool) -> Result<()> {
    let files = discover(&config.journal.dir, backups)
        .with_context(|| format!("Failed to scan {}", config.journal.dir.display()))?;

    let entries: Vec<ScanEntry> = files
        .iter()
        .map(|file| ScanEntry {
            file,
            size: std::fs::metadata(&file.path).ok().map(|m| m.len()),
            first_record: peek.then(|| match file.first_record() {
                Ok(record) => record.record_type,
                Err(e) => format!("<{}>", e),
            }),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No journals in {}", config.journal.dir.display());
        return Ok(());
    }
    for entry in &entries {
        let size = entry
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string());
        match &entry.first_record {
            Some(first) => println!("{}  {:>10}  {}", entry.file.name(), size, first),
            None => println!("{}  {:>10}", entry.file.name(), size),
        }
    }
    println!("{} journal(s)", entries.len());
    Ok(())
}

fn watch(config: &AppConfig, json: bool) -> Result<()> {
    let store = Arc::new(EventStore::new(config.store_config())?);

    let printer: Arc<dyn BatchHandler> = Arc::new(FnHandler::new("printer", move |batch: &IngestBatch| {
        print_batch(batch, json);
        Ok(())
    }));

    let handle = JournalWatcher::start(config.watcher_config(), Arc::clone(&store), vec![printer])
        .with_context(|| format!("Failed to watch {}", config.journal.dir.display()))?;

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    info!(directory = %handle.directory().display(), "Watching; press Ctrl-C to stop");
    let _ = stop_rx.recv();

    info!("Received Ctrl-C, shutting down");
    handle.stop();

    let stats = handle.stats();
    let store_stats = store.statistics();
    if json {
        let report = serde_json::json!({ "ingest": stats, "store": store_stats });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} lines read, {} decoded, {} failed, {} rotations, {} events retained",
            stats.lines_read,
            stats.records_decoded,
            stats.decode_failures,
            stats.rotations,
            store_stats.total_retained
        );
    }
    Ok(())
}

fn print_batch(batch: &IngestBatch, json: bool) {
    if json {
        match serde_json::to_string(batch) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to serialize batch"),
        }
        return;
    }
    match batch {
        IngestBatch::JournalEntries { events, .. } => {
            for event in events {
                print_event(event);
            }
        }
        IngestBatch::StatusUpdate(status) => {
            println!(
                "status  flags={:#x} docked={} landed={}",
                status.flags,
                status.docked(),
                status.landed()
            );
        }
        IngestBatch::SystemEvent(SystemEvent::Rotated { to, .. }) => {
            println!("--- now reading {}", to.display());
        }
        IngestBatch::SystemEvent(_) => {}
    }
}

fn print_event(event: &ClassifiedEvent) {
    let system = event.system_name().unwrap_or("");
    println!(
        "{}  {:<14} {:<24} {}",
        event.timestamp().format("%Y-%m-%d %H:%M:%S"),
        event.category,
        event.record_type(),
        system
    );
}

/// Read journals into a fresh store, oldest first, then the status file.
fn load_history(config: &AppConfig, all: bool) -> Result<Arc<EventStore>> {
    let store = Arc::new(EventStore::new(config.store_config())?);
    let dir = &config.journal.dir;

    let mut files = discover(dir, false)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    if !all {
        files.truncate(1);
    }
    files.reverse();

    for file in &files {
        let mut position = ReadPosition::at_start(&file.path);
        let outcome = position
            .read_new()
            .with_context(|| format!("Failed to read {}", file.path.display()))?;
        for failure in &outcome.failures {
            warn!(
                file = %file.name(),
                offset = failure.offset,
                error = %failure.error,
                "Skipping undecodable line"
            );
        }
        let events: Vec<ClassifiedEvent> =
            outcome.records.into_iter().map(classify_record).collect();
        info!(file = %file.name(), events = events.len(), "Loaded journal");
        store.append_batch(events);
    }

    let status_path = dir.join(&config.journal.status_file);
    if status_path.exists() {
        match read_status(&status_path) {
            Ok(snapshot) => store.update_status(snapshot),
            Err(e) => warn!(error = %e, "Ignoring status file"),
        }
    }
    Ok(store)
}

#[derive(Serialize)]
struct SummaryReport {
    overview: edjournal_query::SessionOverview,
    trading: edjournal_query::TradingSummary,
    exploration: edjournal_query::ExplorationSummary,
    combat: edjournal_query::CombatSummary,
    missions: edjournal_query::MissionSummary,
    mission_success_rate: f64,
    credits: edjournal_query::CreditChange,
}

fn summary(config: &AppConfig, all: bool, window_minutes: Option<u64>) -> Result<()> {
    let store = load_history(config, all)?;
    let engine = QueryEngine::new(&store);
    let window = window_minutes
        .map(|m| Duration::from_secs(m.saturating_mul(60)))
        .unwrap_or(ALL_TIME);

    let missions = engine.mission_summary(window)?;
    let report = SummaryReport {
        overview: engine.session_overview(window)?,
        trading: engine.trading_summary(window)?,
        exploration: engine.exploration_summary(window)?,
        combat: engine.combat_summary(window)?,
        mission_success_rate: missions.success_rate(),
        missions,
        credits: engine.credit_change(window)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn query(config: &AppConfig, all: bool, filter: &EventFilter, json: bool) -> Result<()> {
    let store = load_history(config, all)?;
    let engine = QueryEngine::new(&store);
    let events = engine.filtered(filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        for event in &events {
            print_event(event);
        }
        println!("{} event(s)", events.len());
    }
    Ok(())
}
