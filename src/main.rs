use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pumppad::{
    cli::{Cli, Commands},
    commands,
    config::{Config, DEFAULT_LOG_FILTER},
    output::OutputFmt,
    store::WorkoutStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = Config::default_path()?;
    let cfg = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(cfg.log_filter()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let fmt = OutputFmt::from_flag(cli.json);

    // Config and db commands manage storage themselves; opening the store
    // here would flush its collections over whatever they write.
    let cmd = match cli.cmd {
        Commands::Config(cmd) => return commands::config::handle(cmd, &config_path),
        Commands::Db(cmd) => return commands::db::handle(cmd, &cfg, fmt).await,
        cmd => cmd,
    };

    let data_dir = cfg.data_dir()?;
    let mut store = WorkoutStore::open(&data_dir, cfg.backend())
        .await
        .with_context(|| format!("Failed to open workout data in `{}`", data_dir.display()))?;
    tracing::debug!(backend = %store.backend_kind(), "store ready");

    let result = match cmd {
        Commands::Preset(cmd) => commands::preset::handle(cmd, &mut store, fmt).await,
        Commands::Workout(cmd) => commands::workout::handle(cmd, &mut store, fmt).await,
        Commands::History(cmd) => commands::history::handle(cmd, &store, fmt).await,
        Commands::Config(_) | Commands::Db(_) => unreachable!("handled before the store is opened"),
    };

    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "final save failed");
    }
    result
}
