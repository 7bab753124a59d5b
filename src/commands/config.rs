use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::{cli::ConfigCmd, config::Config};

pub fn handle(cmd: ConfigCmd, config_path: &Path) -> Result<()> {
    let mut cfg = Config::load(config_path)?;

    match cmd {
        ConfigCmd::List => {
            let entries = cfg.entries();
            if entries.is_empty() {
                println!("{}", "(no config set)".dimmed());
            } else {
                println!("{}", "Config:".cyan().bold());
                for (k, v) in entries {
                    println!("  {} = {}", k.green(), v);
                }
            }
        }

        ConfigCmd::Get { key } => match cfg.get(&key) {
            Some(val) => println!("{}", val),
            None => println!("{} key `{}` not set", "warning:".yellow().bold(), key),
        },

        ConfigCmd::Set { key, val } => {
            cfg.set(&key, &val)?;
            cfg.save(config_path)?;
            println!("{} set `{}` = `{}`", "info:".blue().bold(), key.green(), val);
        }

        ConfigCmd::Unset { key } => {
            if cfg.unset(&key) {
                cfg.save(config_path)?;
                println!("{} removed `{}`", "info:".blue().bold(), key.green());
            } else {
                println!("{} key `{}` not set", "warning:".yellow().bold(), key);
            }
        }
    }

    Ok(())
}
