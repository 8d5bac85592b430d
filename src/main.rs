//! kaizen CLI - Entry point
//!
//! Usage: kaizen <command> [options]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kaizen::cli::utils::Context;
use kaizen::cli::{Cli, Commands};
use kaizen::config::Config;

fn main() -> Result<()> {
    // Initialize tracing (stderr, filtered by RUST_LOG)
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let ctx = Context::new(config, cli.format);

    match cli.command {
        Commands::Init(args) => kaizen::cli::init::run(args, &ctx),
        Commands::Ns(args) => kaizen::cli::namespace::run(args, &ctx),
        Commands::Scope(args) => kaizen::cli::scope::run(args, &ctx),
        Commands::Write(args) => kaizen::cli::knowledge::write(args, &ctx),
        Commands::Update(args) => kaizen::cli::knowledge::update(args, &ctx),
        Commands::Delete(args) => kaizen::cli::knowledge::delete(args, &ctx),
        Commands::Show(args) => kaizen::cli::knowledge::show(args, &ctx),
        Commands::Resolve(args) => kaizen::cli::conflict::resolve(args, &ctx),
        Commands::Conflicts => kaizen::cli::conflict::list(&ctx),
        Commands::Search(args) => kaizen::cli::search::run(args, &ctx),
        Commands::Stats => kaizen::cli::stats::execute(&ctx),
    }
}
