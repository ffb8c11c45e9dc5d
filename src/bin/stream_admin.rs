//! stream_admin - manage surveillance stream configurations
//!
//! CRUD over the persisted stream registry, plus a foreground simulator run
//! for demos without real remote feeds.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indra_netra::streams::{connect_stream, StreamConfig, SIMULATION_TICK};
use indra_netra::{DetectionLog, SqliteKvStore, StreamRegistry, StreamSimulator};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQLite store path.
    #[arg(long, default_value = "netra.db", env = "NETRA_DB_PATH")]
    db: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured streams.
    List,
    /// Add a stream.
    Add {
        name: String,
        url: String,
        #[arg(long, default_value = "")]
        location: String,
    },
    /// Remove a stream by id.
    Remove { id: String },
    /// Mark a stream active.
    Activate { id: String },
    /// Mark a stream inactive.
    Deactivate { id: String },
    /// Attempt a connection to a stream by id.
    Connect { id: String },
    /// Run the simulator in the foreground until interrupted.
    Simulate,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut store = SqliteKvStore::open(&args.db)?;
    let mut registry = StreamRegistry::load(&store);

    match args.command {
        Command::List => {
            if registry.list().is_empty() {
                println!("no streams configured");
                return Ok(());
            }
            for stream in registry.list() {
                println!(
                    "{}  {}  {}  [{}]{}",
                    stream.id,
                    stream.name,
                    stream.url,
                    stream.location,
                    if stream.active { "" } else { "  (inactive)" }
                );
            }
        }
        Command::Add {
            name,
            url,
            location,
        } => {
            let stream = StreamConfig::new(name, url, location);
            let id = stream.id.clone();
            registry.add(&mut store, stream)?;
            println!("added stream {}", id);
        }
        Command::Remove { id } => {
            registry.remove(&mut store, &id)?;
            println!("removed stream {}", id);
        }
        Command::Activate { id } => {
            registry.set_active(&mut store, &id, true)?;
            println!("stream {} active", id);
        }
        Command::Deactivate { id } => {
            registry.set_active(&mut store, &id, false)?;
            println!("stream {} inactive", id);
        }
        Command::Connect { id } => {
            let stream = registry
                .get(&id)
                .ok_or_else(|| anyhow!("stream '{}' not found", id))?;
            connect_stream(stream)?;
            println!("stream {} connected", id);
        }
        Command::Simulate => {
            let mut detection_log = DetectionLog::load(&store);
            let mut simulator = StreamSimulator::new();

            let running = Arc::new(AtomicBool::new(true));
            {
                let running = running.clone();
                ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
            }

            log::info!(
                "simulating {} streams, tick every {:?}",
                registry.list().iter().filter(|s| s.active).count(),
                SIMULATION_TICK
            );
            while running.load(Ordering::SeqCst) {
                for alert in simulator.tick(&registry, &mut detection_log, &mut store) {
                    println!(
                        "{}  {}  {} detections  [{}]",
                        alert.stream_name, alert.threat, alert.detection_count, alert.id
                    );
                }
                std::thread::sleep(SIMULATION_TICK);
            }
            log::info!(
                "simulation stopped, {} unacknowledged alerts",
                simulator.unacknowledged()
            );
        }
    }

    Ok(())
}
