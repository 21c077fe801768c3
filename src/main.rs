//! Terminal demo of the statecraft view models.

mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use statecraft::config::{Config, ConfigStore};
use statecraft::logging::init_tracing;

/// Counter, list and host-synced controls driven by serialized state stores
#[derive(Parser, Debug)]
#[command(name = "statecraft")]
#[command(version)]
struct Args {
    /// Config file (default: the platform config dir's statecraft/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run stores in debug mode: reducers are applied twice and checked
    #[arg(long)]
    debug: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Number of entities served by the list screen
    #[arg(long)]
    entities: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let path = args.config.clone().unwrap_or_else(Config::config_path);
    let config = ConfigStore::new(Config::load_from(&path)?, path);
    config.update(|config| {
        if args.debug {
            config.store.debug_mode = true;
        }
        if let Some(file) = args.log_file.clone() {
            config.logging.file = Some(file);
        }
        if let Some(count) = args.entities {
            config.sample.entity_count = count;
        }
    });
    config.get().validate()?;

    init_tracing(&config.get().logging);
    tracing::info!(path = %config.path().display(), "starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("statecraft-rt")
        .enable_time()
        .build()?;

    let result = ui::run(config, runtime.handle().clone());
    runtime.shutdown_timeout(Duration::from_millis(500));
    if let Err(err) = &result {
        tracing::error!(error = %err, "sample exited with error");
    }
    result
}
