//! Knowledge commands: `write`, `update`, `delete`, `show`
//!
//! # Usage
//! ```bash
//! kaizen write acme:backend "Return 404 for missing rows" --tags "http errors" --complexity S
//! kaizen update 01HQ3K2JN5... --content "Return 404 or 410" --clear-complexity
//! kaizen show 01HQ3K2JN5...
//! kaizen delete 01HQ3K2JN5...
//! ```

use std::fs;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use super::utils::{parse_id, print_json, Context};
use crate::core::knowledge::{Complexity, Knowledge, KnowledgeUpdate, NewKnowledge};
use crate::core::name::ScopeName;

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Owning scope (namespace:scope)
    pub scope: ScopeName,

    /// The fact itself
    pub content: Option<String>,

    /// Search tags (free text, weighted above content)
    #[arg(short, long)]
    pub tags: String,

    /// XS, S, M, L or XL
    #[arg(long)]
    pub complexity: Option<Complexity>,

    /// Read content from file
    #[arg(long)]
    pub file: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Knowledge id
    pub id: String,

    #[arg(long)]
    pub content: Option<String>,

    #[arg(short, long)]
    pub tags: Option<String>,

    /// Move to another scope
    #[arg(short, long)]
    pub scope: Option<ScopeName>,

    #[arg(long, conflicts_with = "clear_complexity")]
    pub complexity: Option<Complexity>,

    /// Make the entry match every complexity filter again
    #[arg(long)]
    pub clear_complexity: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Knowledge id
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Knowledge id
    pub id: String,
}

pub fn write(args: WriteArgs, ctx: &Context) -> Result<()> {
    let content = match (&args.file, args.content) {
        (Some(path), None) => fs::read_to_string(path)?,
        (None, Some(content)) => content,
        (Some(_), Some(_)) => bail!("Give either content or --file, not both."),
        (None, None) => bail!("Content is required. Pass it as an argument or use --file."),
    };

    let mut new = NewKnowledge::new(args.scope, content, args.tags);
    if let Some(level) = args.complexity {
        new = new.with_complexity(level);
    }

    let mut store = ctx.open_store()?;
    let scope = new.scope.clone();
    let id = store.write_knowledge(new)?;

    if ctx.json() {
        return print_json(&serde_json::json!({ "id": id, "scope": scope }));
    }

    println!("{} Knowledge written: {}", "✓".green(), id);
    println!("   Scope: {}", scope);
    Ok(())
}

pub fn update(args: UpdateArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let update = KnowledgeUpdate {
        content: args.content,
        tags: args.tags,
        scope: args.scope,
        complexity: args.complexity,
        clear_complexity: args.clear_complexity,
    };

    let mut store = ctx.open_store()?;
    let knowledge = store.update_knowledge(id, update)?;

    if ctx.json() {
        return print_json(&knowledge);
    }

    println!("{} Knowledge updated", "✓".green());
    print_knowledge(&knowledge);
    Ok(())
}

pub fn delete(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;

    let mut store = ctx.open_store()?;
    store.delete_knowledge(id)?;

    if ctx.json() {
        return print_json(&serde_json::json!({ "deleted": id }));
    }

    println!("{} Knowledge deleted: {}", "✓".green(), id);
    Ok(())
}

pub fn show(args: ShowArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;

    let store = ctx.open_store()?;
    let knowledge = store.get_knowledge(id)?;

    if ctx.json() {
        return print_json(&knowledge);
    }

    print_knowledge(&knowledge);
    Ok(())
}

fn print_knowledge(knowledge: &Knowledge) {
    println!("{} {}", "##".dimmed(), knowledge.scope.to_string().cyan().bold());
    println!("{}", knowledge.content);
    println!();
    println!("{} {}", "ID:".dimmed(), knowledge.id.to_string().dimmed());
    println!("{} {}", "Tags:".dimmed(), knowledge.tags);
    if let Some(level) = knowledge.complexity {
        println!("{} {}", "Complexity:".dimmed(), level);
    }
    if knowledge.suppressed {
        println!("{}", "Suppressed by a conflict record".yellow());
    }
    println!(
        "{} {}",
        "Updated:".dimmed(),
        knowledge.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}
