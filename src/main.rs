use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use inventoor::aggregate::Accumulator;
use inventoor::config::Config;
use inventoor::store::Store;
use inventoor::{dashboard, input};

/// Inventory metrics aggregation engine.
#[derive(Parser)]
#[command(name = "inventoor", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

/// Build-time version info, injected via RUSTFLAGS or build.rs.
mod version {
    /// Release version string (set at build time).
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash (set at build time via env, or "unknown").
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    /// Target OS.
    pub fn target_os() -> &'static str {
        std::env::consts::OS
    }

    /// Target architecture.
    pub fn target_arch() -> &'static str {
        std::env::consts::ARCH
    }

    /// Full version string with platform info.
    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            target_os(),
            target_arch(),
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle version subcommand before anything else.
    if let Some(Command::Version) = &cli.command {
        println!("inventoor {}", version::full());
        return Ok(());
    }

    // Initialize tracing.
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;

    fmt().with_env_filter(filter).with_target(true).init();

    // Config is required for an aggregation run.
    let config_path = cli
        .config
        .context("--config is required (use --help for usage)")?;

    let cfg = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    tracing::info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        "starting inventoor",
    );

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async { run(cfg).await })
}

async fn run(cfg: Config) -> Result<()> {
    let store = Store::from_config(&cfg.store)?;

    let mut acc = Accumulator::new();
    for region in &cfg.collected_regions {
        acc.add_collected_region(region);
    }

    // The reported processing duration spans ingestion through snapshot.
    let started = Instant::now();
    let stats = input::ingest_paths(&mut acc, &cfg.input.paths)?;
    let snapshot = acc.snapshot();
    let processing_duration = started.elapsed();

    tracing::info!(
        records = stats.records,
        skipped = stats.skipped,
        total_resources = snapshot.global.total_resources,
        "aggregation complete"
    );

    let items = dashboard::build_items(&snapshot, Utc::now(), processing_duration)?;
    let saved = dashboard::save_items(&store, &cfg.store.tables, &items).await;

    // Table failures are already logged per table; a run that aggregated
    // cleanly still exits zero.
    tracing::info!(
        saved,
        tables = cfg.store.tables.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "inventoor finished"
    );

    Ok(())
}
