use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::{
    cli::PresetCmd,
    commands::{report_persist_error, resolve_preset},
    models::{Exercise, WorkoutPreset, WorkoutSet},
    output::{OutputFmt, emit},
    store::WorkoutStore,
    utils::format_weight,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PresetToml {
    name: String,
    notes: Option<String>,
    #[serde(default)]
    exercises: Vec<ExerciseToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExerciseToml {
    name: String,
    /// Defaults to one set per `reps` entry.
    sets: Option<u32>,
    reps: RepsToml,
    weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepsToml {
    Count(u32),
    One(String),
    PerSet(Vec<String>),
}

impl RepsToml {
    fn targets(self) -> Vec<String> {
        match self {
            Self::Count(n) => vec![n.to_string()],
            Self::One(s) => vec![s],
            Self::PerSet(v) => v,
        }
    }
}

impl PresetToml {
    fn into_preset(self) -> Result<WorkoutPreset> {
        let mut exercises = Vec::with_capacity(self.exercises.len());
        for ex in self.exercises {
            let targets = ex.reps.targets();
            let Some(last) = targets.last().cloned() else {
                bail!("exercise `{}` has an empty `reps` list", ex.name);
            };
            let count = ex.sets.unwrap_or(targets.len() as u32) as usize;

            // Sets past the end of the list repeat its last entry.
            let sets = (0..count)
                .map(|i| {
                    let target = targets.get(i).cloned().unwrap_or_else(|| last.clone());
                    let set = WorkoutSet::new(target.trim());
                    match ex.weight {
                        Some(w) => set.with_weight(w),
                        None => set,
                    }
                })
                .collect();

            exercises.push(Exercise::new(ex.name.trim(), sets));
        }

        let preset = WorkoutPreset::new(self.name.trim(), exercises, self.notes.unwrap_or_default());
        preset.validate()?;
        Ok(preset)
    }
}

#[derive(Serialize)]
struct PresetJson<'a> {
    idx: usize,
    #[serde(flatten)]
    preset: &'a WorkoutPreset,
}

pub async fn handle(cmd: PresetCmd, store: &mut WorkoutStore, fmt: OutputFmt) -> Result<()> {
    match cmd {
        PresetCmd::List => {
            let rows: Vec<PresetJson> = store
                .presets()
                .iter()
                .enumerate()
                .map(|(i, preset)| PresetJson { idx: i + 1, preset })
                .collect();

            emit(fmt, &rows, || print_list(store.presets()))?;
        }

        PresetCmd::Show { preset } => {
            let Some(idx) = resolve_preset(store, &preset) else {
                println!("{} no preset `{}`", "error:".red().bold(), preset);
                return Ok(());
            };
            let preset = &store.presets()[idx];
            emit(fmt, preset, || print_preset(idx + 1, preset))?;
        }

        PresetCmd::Import { files } => {
            if files.is_empty() {
                println!("{} no preset file provided", "warning:".yellow().bold());
            }
            for file in files {
                match import_file(store, &file).await {
                    Ok(()) => {}
                    Err(e) => {
                        if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
                            if io_err.kind() == std::io::ErrorKind::NotFound {
                                println!(
                                    "{} cannot open file `{}` – file not found",
                                    "error:".red().bold(),
                                    file.display()
                                );
                                continue;
                            }
                        }
                        println!("{} `{}`: {:#}", "error:".red().bold(), file.display(), e);
                    }
                }
            }
            report_persist_error(store);
        }

        PresetCmd::Delete { preset } => {
            let Some(idx) = resolve_preset(store, &preset) else {
                println!("{} no preset `{}`", "error:".red().bold(), preset);
                return Ok(());
            };
            let target = store.presets()[idx].clone();
            store.delete_preset(target.id).await;
            println!("{} deleted preset `{}`", "ok:".green().bold(), target.name);
            report_persist_error(store);
        }
    }

    Ok(())
}

/// Adds the preset in `path`, or replaces the preset that already has its
/// name while keeping that preset's id and creation date.
async fn import_file(store: &mut WorkoutStore, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let parsed: PresetToml = toml::from_str(&raw).context("Failed to parse preset TOML")?;
    let mut preset = parsed.into_preset()?;

    let existing = store.presets().iter().find(|p| p.name == preset.name).cloned();
    match existing {
        Some(old) => {
            preset.id = old.id;
            preset.date_created = old.date_created;
            store.update_preset(preset.clone()).await;
            println!("{} replaced preset `{}`", "info:".blue().bold(), preset.name.green());
        }
        None => {
            let name = preset.name.clone();
            store.add_preset(preset).await;
            println!("{} imported preset `{}`", "ok:".green().bold(), name.green());
        }
    }
    Ok(())
}

fn print_list(presets: &[WorkoutPreset]) {
    if presets.is_empty() {
        println!("{}", "  (no presets found)".dimmed());
        return;
    }

    println!("{}", "Presets:".cyan().bold());
    let idx_w = presets.len().to_string().len();
    for (i, p) in presets.iter().enumerate() {
        let sets: usize = p.exercises.iter().map(|e| e.sets.len()).sum();
        println!(
            " {} • {} {} {}",
            format!("{:>width$}", i + 1, width = idx_w).yellow(),
            p.name.bold(),
            format!("– {} exercises, {} sets", p.exercises.len(), sets).dimmed(),
            format!("| added {}", p.date_created.format("%Y-%m-%d")).dimmed(),
        );
    }
}

fn print_preset(idx: usize, preset: &WorkoutPreset) {
    println!("{} {}", format!("{idx}.").yellow(), preset.name.bold());
    if !preset.notes.is_empty() {
        println!("   {}", preset.notes.dimmed());
    }

    if preset.exercises.is_empty() {
        println!("{}", "   (no exercises)".dimmed());
    }
    for (ex_idx, exercise) in preset.exercises.iter().enumerate() {
        println!("\n   {} {}", format!("{}.", ex_idx + 1).yellow(), exercise.name.bold());
        if exercise.sets.is_empty() {
            println!("      {}", "no sets added".dimmed().italic());
        }
        for (set_idx, set) in exercise.sets.iter().enumerate() {
            let weight = set
                .weight
                .map(|w| format!(" @ {}", format_weight(w)))
                .unwrap_or_default();
            println!("      Set {}: {} reps{}", set_idx + 1, set.target_reps, weight);
        }
    }
}
