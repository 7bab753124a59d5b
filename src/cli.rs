use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pumppad", version, about = "Workout presets, sessions and training history")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Workout preset management
    #[command(subcommand, visible_alias = "p")]
    Preset(PresetCmd),

    /// Run a workout from a preset
    #[command(subcommand, visible_alias = "w")]
    Workout(WorkoutCmd),

    /// Completed workouts
    #[command(subcommand)]
    History(HistoryCmd),

    /// View or edit pumppad config
    #[command(subcommand)]
    Config(ConfigCmd),

    /// Storage maintenance
    #[command(subcommand)]
    Db(DbCmd),
}

//
// Commands
//

#[derive(Debug, Subcommand)]
pub enum PresetCmd {
    /// List presets
    #[command(visible_alias = "l")]
    List,

    /// Show a single preset in detail
    #[command(visible_alias = "s")]
    Show {
        /// Preset index (from `preset list`) or exact name
        preset: String,
    },

    /// Import one or more presets from TOML files
    #[command(visible_alias = "i")]
    Import { files: Vec<PathBuf> },

    /// Delete a preset (its completed workouts are kept)
    #[command(visible_alias = "d")]
    Delete {
        /// Preset index (from `preset list`) or exact name
        preset: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum WorkoutCmd {
    /// Start a workout and log every set interactively
    #[command(visible_alias = "r")]
    Run {
        /// Preset index (from `preset list`) or exact name
        preset: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryCmd {
    /// List completed workouts, most recent first
    #[command(visible_alias = "l")]
    List,

    /// Show one completed workout with its summary
    #[command(visible_alias = "s")]
    Show {
        /// Index from `history list`
        entry: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}

#[derive(Debug, Subcommand)]
pub enum DbCmd {
    /// Import legacy flat data into the structured database
    Migrate {
        /// Legacy key-value file (defaults to the one in the data directory)
        #[arg(long)]
        from: Option<PathBuf>,

        /// Run even if the file is already marked as migrated
        #[arg(long)]
        force: bool,
    },

    /// Write presets and history to a legacy-format flat file
    Export {
        /// Output file path
        file: PathBuf,
    },
}
