//! Stats command - Show database statistics

use anyhow::Result;

use super::utils::{print_json, Context};

/// Execute stats command
pub fn execute(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let stats = store.stats()?;
    let generations = store.generations()?;

    if ctx.json() {
        return print_json(&serde_json::json!({
            "stats": stats,
            "generations": generations,
            "database": store.path(),
        }));
    }

    println!("📊 Knowledge Store Statistics\n");
    println!("  Namespaces:       {}", stats.namespaces);
    println!("  Scopes:           {}", stats.scopes);
    println!("  Knowledge:        {}", stats.knowledge);
    println!(
        "  ├── Active:       {} ({}%)",
        stats.active_knowledge,
        percent(stats.active_knowledge, stats.knowledge)
    );
    println!(
        "  └── Suppressed:   {} ({}%)",
        stats.suppressed_knowledge,
        percent(stats.suppressed_knowledge, stats.knowledge)
    );
    println!("  Conflict records: {}", stats.conflicts);
    println!(
        "\n  Ancestor cache generation: {}, view generation: {}",
        generations.ancestors, generations.view
    );

    if let Some(path) = store.path() {
        println!("\n📁 Database: {}", path.display());
    }

    Ok(())
}

fn percent(part: usize, total: usize) -> usize {
    if total > 0 {
        part * 100 / total
    } else {
        0
    }
}
