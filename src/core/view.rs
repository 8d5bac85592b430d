//! View - The active-knowledge projection search reads from
//!
//! `active_knowledge` is knowledge joined with its scope and namespace, minus
//! every entry named in any conflict record's suppressed set. It is the only
//! place that decides whether an entry is active.
//!
//! # Key Points
//! - Rebuilt wholesale inside the caller's transaction, so other connections
//!   see either the old or the new projection
//! - The FTS5 index is an external-content table over the view and is rebuilt
//!   in the same step
//! - Rebuilding twice in a row yields the same rows

use rusqlite::Connection;
use tracing::debug;

use super::error::StoreResult;
use super::storage::{bump_generation, Store};

/// Rebuild the view from knowledge, scopes and the conflict ledger
pub(crate) fn refresh_view(conn: &Connection) -> StoreResult<usize> {
    conn.execute("DELETE FROM active_knowledge", [])?;

    let rows = conn.execute(
        r#"
        INSERT INTO active_knowledge (
            knowledge_id, scope_id, qualified_scope, content, tags,
            complexity, complexity_rank, tags_tokens, content_tokens, updated_at
        )
        SELECT
            k.id,
            k.scope_id,
            n.name || ':' || s.name,
            k.content,
            k.tags,
            k.complexity,
            CASE k.complexity
                WHEN 'XS' THEN 0
                WHEN 'S' THEN 1
                WHEN 'M' THEN 2
                WHEN 'L' THEN 3
                WHEN 'XL' THEN 4
            END,
            k.tags_tokens,
            k.content_tokens,
            k.updated_at
        FROM knowledge k
        JOIN scopes s ON k.scope_id = s.id
        JOIN namespaces n ON s.namespace_id = n.id
        WHERE NOT EXISTS (
            SELECT 1 FROM knowledge_conflict_suppressed cs WHERE cs.knowledge_id = k.id
        )
        ORDER BY k.id
        "#,
        [],
    )?;

    conn.execute(
        "INSERT INTO active_knowledge_fts(active_knowledge_fts) VALUES('rebuild')",
        [],
    )?;

    bump_generation(conn, "view_generation")?;
    debug!(rows, "refreshed active knowledge view");
    Ok(rows)
}

impl Store {
    /// Force a rebuild of the active-knowledge view.
    ///
    /// Mutations already refresh it; this exists for repair after external
    /// edits to the database file.
    pub fn refresh_view(&mut self) -> StoreResult<usize> {
        self.write_tx(|tx| refresh_view(tx))
    }
}
