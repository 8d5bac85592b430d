//! `kaizen init` command
//!
//! Creates `.kaizen/` with a default config and an empty database seeded
//! with `global:default`.
//!
//! # Usage
//! ```bash
//! kaizen init                    # Initialize in current directory
//! kaizen init /path/to/project   # Initialize in specific path
//! kaizen init --global           # Initialize ~/.kaizen
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use colored::Colorize;

use super::utils::{print_json, Context};
use crate::config::{Config, KAIZEN_DIR};
use crate::core::storage::Store;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to initialize (default: current directory)
    pub path: Option<PathBuf>,

    /// Initialize ~/.kaizen instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let kaizen_dir = if args.global {
        Config::global_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?
    } else {
        args.path
            .unwrap_or_else(|| PathBuf::from("."))
            .join(KAIZEN_DIR)
    };

    let config_path = kaizen_dir.join("config.toml");
    if config_path.exists() && !args.force {
        bail!(
            "{} already exists. Use --force to overwrite the config.",
            kaizen_dir.display()
        );
    }

    fs::create_dir_all(&kaizen_dir)?;
    Config::default().save_to(&config_path)?;

    // opening creates the schema and seeds global:default
    let db_path = kaizen_dir.join("data.db");
    let store = Store::open(&db_path)?;
    let stats = store.stats()?;

    if ctx.json() {
        return print_json(&serde_json::json!({
            "config": config_path,
            "database": db_path,
            "namespaces": stats.namespaces,
        }));
    }

    println!("{} Initialized kaizen in {}", "✓".green(), kaizen_dir.display());
    println!("   Config:   {}", config_path.display());
    println!("   Database: {}", db_path.display());
    println!("\nNext steps:");
    println!("  kaizen ns create acme --description \"Acme Corp\"");
    println!("  kaizen write global:default \"Your first fact\" --tags \"topic words\"");
    println!("  kaizen search \"topic\"");

    Ok(())
}
