//! Conflict - Ledger of superseded knowledge
//!
//! A conflict record names one active entry and the entries it suppresses.
//! Suppression is global: a suppressed entry disappears from every search,
//! whichever scope the conflict was noticed in.
//!
//! # Key Points
//! - Callers decide what conflicts; nothing is detected automatically
//! - An entry stays suppressed while any record names it
//! - Records are never edited, only removed with their active entry

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use tracing::info;
use ulid::Ulid;

use super::error::{StoreError, StoreResult};
use super::knowledge::knowledge_exists;
use super::storage::{now, parse_time, parse_ulid, Store};
use super::view::refresh_view;

/// One recorded decision
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRecord {
    pub id: i64,
    pub active: Ulid,
    pub suppressed: Vec<Ulid>,
    pub resolved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl Store {
    /// Record that `active` supersedes every entry in `suppressed`
    pub fn resolve_conflict(
        &mut self,
        active: Ulid,
        suppressed: &[Ulid],
        resolved_by: Option<&str>,
    ) -> StoreResult<i64> {
        if suppressed.is_empty() {
            return Err(StoreError::InvalidInput(
                "at least one suppressed id is required".to_string(),
            ));
        }
        if suppressed.contains(&active) {
            return Err(StoreError::SelfConflict(active.to_string()));
        }

        let suppressed: BTreeSet<Ulid> = suppressed.iter().copied().collect();

        let conflict_id = self.write_tx(|tx| {
            for id in std::iter::once(&active).chain(suppressed.iter()) {
                let key = id.to_string();
                if !knowledge_exists(tx, &key)? {
                    return Err(StoreError::UnknownKnowledge(key));
                }
            }

            tx.execute(
                "INSERT INTO knowledge_conflicts (active_knowledge_id, resolved_at, resolved_by) VALUES (?1, ?2, ?3)",
                params![active.to_string(), now(), resolved_by],
            )?;
            let conflict_id = tx.last_insert_rowid();

            let mut insert = tx.prepare_cached(
                "INSERT INTO knowledge_conflict_suppressed (conflict_id, knowledge_id) VALUES (?1, ?2)",
            )?;
            for id in &suppressed {
                insert.execute(params![conflict_id, id.to_string()])?;
            }

            refresh_view(tx)?;
            Ok(conflict_id)
        })?;

        info!(
            conflict_id,
            active = %active,
            suppressed = suppressed.len(),
            "resolved conflict"
        );
        Ok(conflict_id)
    }

    /// Every conflict record, oldest first
    pub fn list_conflicts(&self) -> StoreResult<Vec<ConflictRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, active_knowledge_id, resolved_at, resolved_by FROM knowledge_conflicts ORDER BY id",
        )?;

        let mut records = stmt
            .query_map([], |row| {
                let active: String = row.get(1)?;
                let resolved_at: String = row.get(2)?;
                Ok(ConflictRecord {
                    id: row.get(0)?,
                    active: parse_ulid(1, &active)?,
                    suppressed: Vec::new(),
                    resolved_at: parse_time(2, &resolved_at)?,
                    resolved_by: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut suppressed_stmt = self.conn().prepare(
            "SELECT knowledge_id FROM knowledge_conflict_suppressed WHERE conflict_id = ?1 ORDER BY knowledge_id",
        )?;
        for record in &mut records {
            record.suppressed = suppressed_stmt
                .query_map([record.id], |row| {
                    let id: String = row.get(0)?;
                    parse_ulid(0, &id)
                })?
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(records)
    }
}
