use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::{
    cli::WorkoutCmd,
    commands::{report_persist_error, resolve_preset},
    output::{OutputFmt, emit},
    store::WorkoutStore,
    utils::{format_seconds, format_weight},
};

/// One line typed for a set.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Entry {
    /// Leave the set unlogged.
    Skip,
    /// Abandon the whole workout.
    Cancel,
    Logged { reps: u32, weight: WeightEntry },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WeightEntry {
    /// Keep the planned weight.
    Planned,
    Bodyweight,
    Value(f64),
}

fn parse_entry(line: &str) -> Result<Entry> {
    let mut parts = line.split_whitespace();
    let Some(first) = parts.next() else {
        return Ok(Entry::Skip);
    };
    if first.eq_ignore_ascii_case("q") {
        return Ok(Entry::Cancel);
    }

    let reps: u32 = first
        .parse()
        .with_context(|| format!("`{first}` is not a rep count"))?;

    let weight = match parts.next() {
        None => WeightEntry::Planned,
        Some(w) if w.eq_ignore_ascii_case("bw") => WeightEntry::Bodyweight,
        Some(w) => {
            let value: f64 = w.parse().with_context(|| format!("`{w}` is not a weight"))?;
            if !value.is_finite() || value <= 0.0 {
                bail!("weight must be a positive number (use `bw` for bodyweight)");
            }
            WeightEntry::Value(value)
        }
    };

    if let Some(extra) = parts.next() {
        bail!("unexpected `{extra}` (expected: REPS [WEIGHT|bw])");
    }
    Ok(Entry::Logged { reps, weight })
}

pub async fn handle(cmd: WorkoutCmd, store: &mut WorkoutStore, fmt: OutputFmt) -> Result<()> {
    match cmd {
        WorkoutCmd::Run { preset } => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut out = std::io::stdout();
            let finished = run(store, &preset, &mut input, &mut out).await?;

            if let Some(idx) = finished {
                let workout = &store.history()[idx];
                if fmt == OutputFmt::Json {
                    emit(fmt, workout, || {})?;
                }
            }
            report_persist_error(store);
        }
    }

    Ok(())
}

/// Runs a session for the selected preset, reading one line per set.
///
/// Returns the history position of the completed workout, or `None` when
/// the preset is unknown or the session was cancelled.
async fn run<R: BufRead, W: Write>(
    store: &mut WorkoutStore,
    sel: &str,
    input: &mut R,
    out: &mut W,
) -> Result<Option<usize>> {
    let Some(idx) = resolve_preset(store, sel) else {
        writeln!(out, "{} no preset `{}`", "error:".red().bold(), sel)?;
        return Ok(None);
    };
    let preset = store.presets()[idx].clone();
    store.start_workout(&preset);

    writeln!(out, "{} {}", "Workout:".cyan().bold(), preset.name.bold())?;
    if !preset.notes.is_empty() {
        writeln!(out, "  {}", preset.notes.dimmed())?;
    }
    writeln!(
        out,
        "{}",
        "  enter `REPS [WEIGHT|bw]` per set, empty line to skip, `q` to cancel".dimmed()
    )?;

    for (ex_idx, exercise) in preset.exercises.iter().enumerate() {
        writeln!(out, "\n{} {}", format!("{}.", ex_idx + 1).yellow(), exercise.name.bold())?;

        for (set_idx, planned) in exercise.sets.iter().enumerate() {
            let entry = loop {
                let plan = planned
                    .weight
                    .map(|w| format!(", planned {}", format_weight(w)))
                    .unwrap_or_default();
                write!(out, "  Set {} (target {}{}): ", set_idx + 1, planned.target_reps, plan)?;
                out.flush()?;

                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    break Entry::Cancel;
                }
                match parse_entry(&line) {
                    Ok(entry) => break entry,
                    Err(e) => writeln!(out, "  {} {:#}", "error:".red().bold(), e)?,
                }
            };

            let (reps, weight) = match entry {
                Entry::Skip => continue,
                Entry::Cancel => {
                    store.cancel_current_workout();
                    writeln!(out, "\n{} workout cancelled, nothing saved", "ok:".green().bold())?;
                    return Ok(None);
                }
                Entry::Logged { reps, weight } => (reps, weight),
            };

            let Some(set) = store
                .current_workout_mut()
                .and_then(|w| w.exercises.get_mut(ex_idx))
                .and_then(|e| e.sets.get_mut(set_idx))
            else {
                bail!("active workout lost track of exercise {} set {}", ex_idx + 1, set_idx + 1);
            };
            set.actual_reps = Some(reps);
            match weight {
                WeightEntry::Planned => {}
                WeightEntry::Bodyweight => set.weight = None,
                WeightEntry::Value(w) => set.weight = Some(w),
            }

            let mark = match set.rep_target() {
                Some(target) if target.contains(reps) => "✓".green(),
                Some(_) => "≠".yellow(),
                None => "·".dimmed(),
            };
            writeln!(out, "    {mark} logged {reps} reps")?;
        }
    }

    let Some(done) = store.finish_current_workout().await else {
        bail!("no active workout to complete");
    };
    let summary = done.summary();
    writeln!(
        out,
        "\n{} workout complete in {} – {}/{} sets, {} reps, volume {}",
        "ok:".green().bold(),
        format_seconds(done.duration),
        summary.completed_sets,
        summary.total_sets,
        summary.total_reps,
        format_weight(summary.total_volume),
    )?;

    Ok(Some(store.history().len() - 1))
}
