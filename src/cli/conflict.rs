//! Conflict commands: `resolve`, `conflicts`
//!
//! # Usage
//! ```bash
//! kaizen resolve <active-id> <suppressed-id>... --by alice
//! kaizen conflicts
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::utils::{parse_id, print_json, Context};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Entry that stays active
    pub active: String,

    /// Entries to suppress everywhere
    #[arg(required = true)]
    pub suppressed: Vec<String>,

    /// Who decided (default: [user] name from config)
    #[arg(long)]
    pub by: Option<String>,
}

pub fn resolve(args: ResolveArgs, ctx: &Context) -> Result<()> {
    let active = parse_id(&args.active)?;
    let suppressed = args
        .suppressed
        .iter()
        .map(|raw| parse_id(raw))
        .collect::<Result<Vec<_>>>()?;
    let by = args.by.unwrap_or_else(|| ctx.config.user.name.clone());

    let mut store = ctx.open_store()?;
    let conflict_id = store.resolve_conflict(active, &suppressed, Some(&by))?;

    if ctx.json() {
        return print_json(&serde_json::json!({
            "conflict_id": conflict_id,
            "active": active,
            "suppressed": suppressed,
        }));
    }

    println!("{} Conflict #{} recorded", "✓".green(), conflict_id);
    println!("   Active:     {}", active);
    for id in &suppressed {
        println!("   Suppressed: {}", id.to_string().dimmed());
    }
    Ok(())
}

pub fn list(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let records = store.list_conflicts()?;

    if ctx.json() {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No conflict records.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{} {} {}",
            format!("#{}", record.id).bold(),
            record.active,
            record.resolved_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
        if let Some(by) = &record.resolved_by {
            println!("   by {}", by.dimmed());
        }
        for id in &record.suppressed {
            println!("   {} {}", "✗".red(), id);
        }
    }
    Ok(())
}
