use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::{
    cli::HistoryCmd,
    models::{CompletedWorkout, WorkoutSummary},
    output::{OutputFmt, emit},
    store::WorkoutStore,
    utils::{format_seconds, format_weight},
};

#[derive(Serialize)]
struct HistoryJson<'a> {
    idx: usize,
    #[serde(flatten)]
    workout: &'a CompletedWorkout,
    summary: WorkoutSummary,
}

/// History ordered most recent first; ties keep completion order reversed.
fn newest_first(history: &[CompletedWorkout]) -> Vec<&CompletedWorkout> {
    let mut sorted: Vec<&CompletedWorkout> = history.iter().rev().collect();
    sorted.sort_by(|a, b| b.date_completed.cmp(&a.date_completed));
    sorted
}

pub async fn handle(cmd: HistoryCmd, store: &WorkoutStore, fmt: OutputFmt) -> Result<()> {
    let sorted = newest_first(store.history());

    match cmd {
        HistoryCmd::List => {
            let rows: Vec<HistoryJson> = sorted
                .iter()
                .enumerate()
                .map(|(i, w)| HistoryJson {
                    idx: i + 1,
                    workout: w,
                    summary: w.summary(),
                })
                .collect();

            emit(fmt, &rows, || print_list(&rows))?;
        }

        HistoryCmd::Show { entry } => {
            let Some(workout) = entry.checked_sub(1).and_then(|i| sorted.get(i)) else {
                println!("{} no history entry {}", "error:".red().bold(), entry);
                return Ok(());
            };
            let row = HistoryJson {
                idx: entry,
                workout,
                summary: workout.summary(),
            };
            emit(fmt, &row, || print_workout(&row))?;
        }
    }

    Ok(())
}

fn print_list(rows: &[HistoryJson]) {
    if rows.is_empty() {
        println!("{}", "  (no completed workouts)".dimmed());
        return;
    }

    println!("{}", "History:".cyan().bold());
    let idx_w = rows.len().to_string().len();
    for row in rows {
        let duration = match row.workout.duration {
            Some(_) => format!(" in {}", format_seconds(row.workout.duration)),
            None => String::new(),
        };
        println!(
            " {} • {} {} {}",
            format!("{:>width$}", row.idx, width = idx_w).yellow(),
            row.workout.preset_name.bold(),
            format!("– {}/{} sets{}", row.summary.completed_sets, row.summary.total_sets, duration).dimmed(),
            format!("| {}", row.workout.date_completed.format("%Y-%m-%d %H:%M")).dimmed(),
        );
    }
}

fn print_workout(row: &HistoryJson) {
    let w = row.workout;
    println!("{} {}", "Workout:".cyan().bold(), w.preset_name.bold());
    println!("  completed {}", w.date_completed.format("%Y-%m-%d %H:%M"));
    println!("  duration  {}", format_seconds(w.duration));
    if !w.notes.is_empty() {
        println!("  {}", w.notes.dimmed());
    }

    for (ex_idx, exercise) in w.exercises.iter().enumerate() {
        println!("\n{} {}", format!("{}.", ex_idx + 1).yellow(), exercise.name.bold());
        for (set_idx, set) in exercise.sets.iter().enumerate() {
            let reps = match set.actual_reps {
                Some(r) => format!("{} reps", r),
                None => format!("{} reps (target)", set.target_reps).dimmed().to_string(),
            };
            let weight = set
                .weight
                .map(|w| format!(" @ {}", format_weight(w)))
                .unwrap_or_default();
            let mark = if set.is_completed() { "✓".green() } else { "○".dimmed() };
            println!("  Set {}: {}{} {}", set_idx + 1, reps, weight, mark);
        }
    }

    let s = row.summary;
    println!(
        "\n{} {} of {} sets completed, {} reps, volume {}",
        "Summary:".cyan().bold(),
        s.completed_sets,
        s.total_sets,
        s.total_reps,
        format_weight(s.total_volume)
    );
}
