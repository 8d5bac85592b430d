//! `kaizen search` command
//!
//! Searches everything visible from a scope: the scope itself, every
//! ancestor and `global:default`.
//!
//! # Usage
//! ```bash
//! kaizen search "oauth flow" "session storage" --scope acme:backend
//! kaizen search "\"connection pool\" -redis" --complexity M
//! kaizen search "retries" --limit 5 --format json
//! ```
//!
//! Each positional argument is an independent query term; an entry keeps
//! its best score across terms. Results are grouped by originating scope.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::utils::{print_json, Context};
use crate::core::knowledge::Complexity;
use crate::core::name::ScopeName;
use crate::core::search::SearchRequest;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query terms (words are OR-ed; "phrases", AND, OR, -word, NOT and parentheses work)
    #[arg(required = true)]
    pub terms: Vec<String>,

    /// Scope to search from
    #[arg(short, long, default_value = "global:default")]
    pub scope: ScopeName,

    /// Minimum complexity (XS, S, M, L, XL); unclassified entries always match
    #[arg(long)]
    pub complexity: Option<Complexity>,

    /// Maximum results (default from config)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

pub fn run(args: SearchArgs, ctx: &Context) -> Result<()> {
    let mut request = SearchRequest::new(args.scope, args.terms);
    if let Some(level) = args.complexity {
        request = request.with_complexity(level);
    }
    if let Some(limit) = args.limit {
        request = request.with_limit(limit);
    }

    let store = ctx.open_store()?;
    let hits = store.search(&request)?;
    let groups = hits.by_scope();

    if ctx.json() {
        return print_json(&serde_json::json!({
            "scope": request.scope,
            "total": hits.len(),
            "groups": groups,
        }));
    }

    if hits.is_empty() {
        println!("No relevant knowledge found from {}.", request.scope);
        return Ok(());
    }

    println!(
        "Found {} entries from {}\n",
        hits.len(),
        request.scope.to_string().bold()
    );

    for group in &groups {
        println!("{} {}", "##".dimmed(), group.scope.to_string().cyan().bold());
        for hit in &group.hits {
            let level = hit
                .complexity
                .map(|c| format!(" [{}]", c))
                .unwrap_or_default();
            println!(
                "  {} {}{}",
                format!("{:.2}", hit.score).yellow(),
                hit.content,
                level.dimmed()
            );
            println!("       {}", hit.knowledge_id.to_string().dimmed());
        }
        println!();
    }

    Ok(())
}
