//! `kaizen scope` commands
//!
//! # Usage
//! ```bash
//! kaizen scope create acme:backend --parent rust:default --parent acme:shared
//! kaizen scope update acme:backend --parents java:default
//! kaizen scope add-parent acme:backend kotlin:default
//! kaizen scope ancestors acme:backend
//! kaizen scope delete acme:backend
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::utils::{print_json, Context};
use crate::core::graph::ScopeInfo;
use crate::core::name::ScopeName;

#[derive(Args, Debug)]
pub struct ScopeArgs {
    #[command(subcommand)]
    pub command: ScopeCommand,
}

#[derive(Subcommand, Debug)]
pub enum ScopeCommand {
    /// Create a scope (always inherits from its namespace default)
    Create {
        /// Qualified name (namespace:scope)
        scope: ScopeName,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Additional parent scope (repeatable)
        #[arg(short, long = "parent")]
        parents: Vec<ScopeName>,
    },

    /// Rename a scope, change its description or replace its parents
    Update {
        scope: ScopeName,

        #[arg(long)]
        rename: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// New explicit parent set (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "clear_parents")]
        parents: Option<Vec<ScopeName>>,

        /// Drop every parent except the namespace default
        #[arg(long)]
        clear_parents: bool,
    },

    /// Add parent edges
    AddParent {
        scope: ScopeName,
        #[arg(required = true)]
        parents: Vec<ScopeName>,
    },

    /// Remove parent edges
    RemoveParent {
        scope: ScopeName,
        #[arg(required = true)]
        parents: Vec<ScopeName>,
    },

    /// Show a scope and its parents
    Show { scope: ScopeName },

    /// Show the cached ancestor set, nearest first
    Ancestors { scope: ScopeName },

    /// Delete a scope and its knowledge
    Delete { scope: ScopeName },
}

pub fn run(args: ScopeArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;

    match args.command {
        ScopeCommand::Create {
            scope,
            description,
            parents,
        } => {
            let info = store.create_scope(&scope, &description, &parents)?;
            print_scope(ctx, "Created scope", &info)?;
        }
        ScopeCommand::Update {
            scope,
            rename,
            description,
            parents,
            clear_parents,
        } => {
            let parents = if clear_parents { Some(Vec::new()) } else { parents };
            let info = store.update_scope(
                &scope,
                rename.as_deref(),
                description.as_deref(),
                parents.as_deref(),
            )?;
            print_scope(ctx, "Updated scope", &info)?;
        }
        ScopeCommand::AddParent { scope, parents } => {
            let info = store.add_parents(&scope, &parents)?;
            print_scope(ctx, "Updated scope", &info)?;
        }
        ScopeCommand::RemoveParent { scope, parents } => {
            let info = store.remove_parents(&scope, &parents)?;
            print_scope(ctx, "Updated scope", &info)?;
        }
        ScopeCommand::Show { scope } => {
            let info = store.get_scope(&scope)?;
            if ctx.json() {
                return print_json(&info);
            }
            print_info(&info);
        }
        ScopeCommand::Ancestors { scope } => {
            let ancestors = store.ancestors(&scope)?;
            if ctx.json() {
                return print_json(&ancestors);
            }
            for (i, ancestor) in ancestors.iter().enumerate() {
                if i == 0 {
                    println!("{}", ancestor.to_string().cyan().bold());
                } else {
                    println!("  {} {}", "↑".dimmed(), ancestor);
                }
            }
        }
        ScopeCommand::Delete { scope } => {
            let deleted = store.delete_scope(&scope)?;
            if ctx.json() {
                return print_json(&deleted);
            }
            println!(
                "{} Deleted scope {} ({} knowledge entries)",
                "✓".green(),
                deleted.scope,
                deleted.deleted_knowledge
            );
        }
    }

    Ok(())
}

fn print_scope(ctx: &Context, action: &str, info: &ScopeInfo) -> Result<()> {
    if ctx.json() {
        return print_json(info);
    }
    println!("{} {}", "✓".green(), action);
    print_info(info);
    Ok(())
}

fn print_info(info: &ScopeInfo) {
    println!("{}", info.scope.to_string().cyan().bold());
    if !info.description.is_empty() {
        println!("   {}", info.description.dimmed());
    }
    for parent in &info.parents {
        println!("   {} {}", "parent:".dimmed(), parent);
    }
}
