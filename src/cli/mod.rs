//! CLI module - Command definitions and handlers
//!
//! Every command is thin glue: parse arguments, open the store, call one
//! store operation, print the result as JSON or colored text.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod conflict;
pub mod init;
pub mod knowledge;
pub mod namespace;
pub mod scope;
pub mod search;
pub mod stats;
pub mod utils;

/// kaizen - Scoped knowledge store for AI agents
///
/// Knowledge lives in scopes; scopes inherit from parents across namespaces.
#[derive(Parser, Debug)]
#[command(name = "kaizen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, env = "KAIZEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a kaizen directory and database
    Init(init::InitArgs),

    /// Manage namespaces
    #[command(alias = "namespace")]
    Ns(namespace::NsArgs),

    /// Manage scopes and their parents
    Scope(scope::ScopeArgs),

    /// Store a knowledge entry
    Write(knowledge::WriteArgs),

    /// Update a knowledge entry
    Update(knowledge::UpdateArgs),

    /// Delete a knowledge entry
    Delete(knowledge::DeleteArgs),

    /// Show a knowledge entry
    Show(knowledge::ShowArgs),

    /// Record that one entry supersedes others
    Resolve(conflict::ResolveArgs),

    /// List conflict records
    Conflicts,

    /// Search knowledge visible from a scope
    Search(search::SearchArgs),

    /// Show store statistics
    Stats,
}
