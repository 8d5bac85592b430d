//! `kaizen ns` commands
//!
//! # Usage
//! ```bash
//! kaizen ns list --detail long
//! kaizen ns create acme --description "Acme Corp"
//! kaizen ns update acme --rename acme-corp
//! kaizen ns delete acme-corp
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::utils::{print_json, Context};
use crate::core::graph::{DetailLevel, NamespaceListing};

#[derive(Args, Debug)]
pub struct NsArgs {
    #[command(subcommand)]
    pub command: NsCommand,
}

#[derive(Subcommand, Debug)]
pub enum NsCommand {
    /// List namespaces and their scopes
    List {
        /// Only this namespace
        name: Option<String>,

        /// short, long or details
        #[arg(short, long, default_value = "short")]
        detail: DetailLevel,
    },

    /// Create a namespace and its default scope
    Create {
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Rename a namespace or change its description
    Update {
        name: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a namespace with all its scopes and knowledge
    Delete { name: String },
}

pub fn run(args: NsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        NsCommand::List { name, detail } => {
            let store = ctx.open_store()?;
            let listing = store.get_namespaces(name.as_deref(), detail)?;
            if ctx.json() {
                return print_json(&listing);
            }
            print_listing(&listing);
        }
        NsCommand::Create { name, description } => {
            let mut store = ctx.open_store()?;
            let info = store.create_namespace(&name, &description)?;
            if ctx.json() {
                return print_json(&info);
            }
            println!("{} Created namespace {}", "✓".green(), info.name.cyan().bold());
            println!("   Default scope: {}", info.default_scope);
        }
        NsCommand::Update {
            name,
            rename,
            description,
        } => {
            let mut store = ctx.open_store()?;
            let info = store.update_namespace(&name, rename.as_deref(), description.as_deref())?;
            if ctx.json() {
                return print_json(&info);
            }
            println!("{} Updated namespace {}", "✓".green(), info.name.cyan().bold());
        }
        NsCommand::Delete { name } => {
            let mut store = ctx.open_store()?;
            let deleted = store.delete_namespace(&name)?;
            if ctx.json() {
                return print_json(&deleted);
            }
            println!(
                "{} Deleted namespace {} ({} scopes, {} knowledge entries)",
                "✓".green(),
                deleted.namespace,
                deleted.deleted_scopes,
                deleted.deleted_knowledge
            );
        }
    }

    Ok(())
}

fn print_listing(listing: &NamespaceListing) {
    for ns in &listing.namespaces {
        match &ns.description {
            Some(desc) if !desc.is_empty() => {
                println!("{} {}", ns.name.cyan().bold(), format!("- {}", desc).dimmed())
            }
            _ => println!("{}", ns.name.cyan().bold()),
        }

        for scope in &ns.scopes {
            let mut line = format!("  {}", scope.scope);
            if let Some(desc) = scope.description.as_ref().filter(|d| !d.is_empty()) {
                line.push_str(&format!(" {}", format!("- {}", desc).dimmed()));
            }
            println!("{}", line);

            if let Some(parents) = &scope.parents {
                for parent in parents {
                    println!("    {} {}", "↑".dimmed(), parent);
                }
            }
        }
    }
}
