use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::{
    backend::{self, BackendKind, COMPLETED_WORKOUTS_KEY, KeyValueFile, PRESETS_KEY, SqliteBackend, WorkoutBackend},
    cli::DbCmd,
    config::Config,
    migration::{self, MIGRATION_FLAG_KEY, MigrationReport},
    output::{OutputFmt, emit},
    store::WorkoutStore,
};

/* ────────────────────────── public entry point ───────────────────────── */

pub async fn handle(cmd: DbCmd, cfg: &Config, fmt: OutputFmt) -> Result<()> {
    let data_dir = cfg.data_dir()?;

    match cmd {
        DbCmd::Migrate { from, force } => {
            if cfg.backend() != BackendKind::Structured {
                bail!("migration writes to the structured backend, but `backend` is set to `flat`");
            }
            let legacy_path = from.unwrap_or_else(|| backend::flat_path(&data_dir));
            let report = migrate(&data_dir, &legacy_path, force).await?;

            emit(fmt, &report, || {
                if report.skipped {
                    println!(
                        "{} `{}` was already migrated (use --force to import it again)",
                        "info:".blue().bold(),
                        legacy_path.display()
                    );
                } else {
                    println!(
                        "{} migration complete – {} presets & {} completed workouts imported",
                        "ok:".green().bold(),
                        report.presets,
                        report.completed_workouts
                    );
                }
            })?;
        }

        DbCmd::Export { file } => {
            let store = WorkoutStore::open(&data_dir, cfg.backend()).await?;
            export(&store, &file)?;
            println!(
                "{} exported {} presets & {} completed workouts to `{}`",
                "ok:".green().bold(),
                store.presets().len(),
                store.history().len(),
                file.display()
            );
            store.close().await?;
        }
    }

    Ok(())
}

/* ───────────────────────────── migrate legacy ──────────────────────────── */

async fn migrate(data_dir: &Path, legacy_path: &Path, force: bool) -> Result<MigrationReport> {
    if !legacy_path.exists() {
        bail!("`{}` does not exist", legacy_path.display());
    }
    let legacy = KeyValueFile::open(legacy_path)?;
    if force {
        legacy.remove(MIGRATION_FLAG_KEY)?;
    }

    let target = SqliteBackend::open(&backend::db_path(data_dir))
        .await
        .context("Failed to open the structured database")?;
    let report = migration::migrate_legacy(&legacy, &target)
        .await
        .with_context(|| format!("Failed to migrate `{}`", legacy_path.display()))?;
    target.close().await;

    Ok(report)
}

/* ─────────────────────────────── export ─────────────────────────────── */

/// Writes both collections in the legacy layout, without the migration flag,
/// so the file can be imported elsewhere with `db migrate --from`.
fn export(store: &WorkoutStore, file: &Path) -> Result<()> {
    let out = KeyValueFile::open(file)?;
    out.set(PRESETS_KEY, store.presets())?;
    out.set(COMPLETED_WORKOUTS_KEY, store.history())?;
    out.remove(MIGRATION_FLAG_KEY)?;
    Ok(())
}
