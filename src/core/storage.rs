//! Storage - SQLite backend
//!
//! One database holds the scope graph, knowledge, the conflict ledger and
//! the two derived structures search reads from:
//!
//! - `scope_ancestors`: flattened ancestor set per scope
//! - `active_knowledge` (+ `active_knowledge_fts`): knowledge not suppressed
//!   by any conflict record, with qualified scope names denormalized
//!
//! # Key Points
//! - WAL mode: readers on other connections see the last committed snapshot
//! - Every mutation is one IMMEDIATE transaction that also recomputes the
//!   derived structures it invalidates
//! - `store_meta` carries a generation counter per derived structure

use std::path::{Path as FilePath, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior};
use serde::Serialize;
use ulid::Ulid;

use super::error::{StoreError, StoreResult};
use super::name::{ScopeName, DEFAULT_SCOPE, GLOBAL_NAMESPACE};
use super::search::SearchSettings;

/// Database storage
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
    pub(crate) search: SearchSettings,
}

impl Store {
    /// Open or create a database
    pub fn open(path: &FilePath) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // WAL gives readers a stable snapshot while a writer commits
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000; PRAGMA foreign_keys=ON;",
        )?;

        let mut store = Self {
            conn,
            path: Some(path.to_path_buf()),
            search: SearchSettings::default(),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn,
            path: None,
            search: SearchSettings::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a second connection to the same database.
    /// In-memory stores cannot be shared and get a fresh database.
    pub fn clone_connection(&self) -> StoreResult<Self> {
        let mut store = match &self.path {
            Some(path) => Self::open(path)?,
            None => Self::open_memory()?,
        };
        store.search = self.search.clone();
        Ok(store)
    }

    /// Replace the search tunables
    pub fn with_search_settings(mut self, settings: SearchSettings) -> Self {
        self.search = settings;
        self
    }

    pub fn search_settings(&self) -> &SearchSettings {
        &self.search
    }

    pub fn path(&self) -> Option<&FilePath> {
        self.path.as_deref()
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one IMMEDIATE transaction; nothing is committed if it fails
    pub(crate) fn write_tx<T>(
        &mut self,
        f: impl FnOnce(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Initialize database schema and seed `global:default`
    fn init_schema(&mut self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS namespaces (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scopes (
                id INTEGER PRIMARY KEY,
                namespace_id INTEGER NOT NULL REFERENCES namespaces(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(namespace_id, name)
            );

            -- child inherits from parent
            CREATE TABLE IF NOT EXISTS scope_parents (
                child_scope_id INTEGER NOT NULL REFERENCES scopes(id) ON DELETE CASCADE,
                parent_scope_id INTEGER NOT NULL REFERENCES scopes(id) ON DELETE CASCADE,
                PRIMARY KEY (child_scope_id, parent_scope_id)
            );

            CREATE INDEX IF NOT EXISTS idx_scope_parents_parent ON scope_parents(parent_scope_id);

            -- Derived: flattened ancestor set, self included at depth 0
            CREATE TABLE IF NOT EXISTS scope_ancestors (
                scope_id INTEGER NOT NULL REFERENCES scopes(id) ON DELETE CASCADE,
                ancestor_id INTEGER NOT NULL REFERENCES scopes(id) ON DELETE CASCADE,
                depth INTEGER NOT NULL,
                PRIMARY KEY (scope_id, ancestor_id)
            );

            CREATE INDEX IF NOT EXISTS idx_scope_ancestors_ancestor ON scope_ancestors(ancestor_id);

            CREATE TABLE IF NOT EXISTS knowledge (
                id TEXT PRIMARY KEY,
                scope_id INTEGER NOT NULL REFERENCES scopes(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                tags TEXT NOT NULL,
                complexity TEXT,
                tags_tokens TEXT NOT NULL,     -- JSON array
                content_tokens TEXT NOT NULL,  -- JSON array
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_knowledge_scope ON knowledge(scope_id);

            CREATE TABLE IF NOT EXISTS knowledge_conflicts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                active_knowledge_id TEXT NOT NULL REFERENCES knowledge(id) ON DELETE CASCADE,
                resolved_at TEXT NOT NULL,
                resolved_by TEXT
            );

            CREATE TABLE IF NOT EXISTS knowledge_conflict_suppressed (
                conflict_id INTEGER NOT NULL REFERENCES knowledge_conflicts(id) ON DELETE CASCADE,
                knowledge_id TEXT NOT NULL REFERENCES knowledge(id) ON DELETE CASCADE,
                PRIMARY KEY (conflict_id, knowledge_id)
            );

            CREATE INDEX IF NOT EXISTS idx_conflict_suppressed_knowledge
                ON knowledge_conflict_suppressed(knowledge_id);

            -- Derived: what search reads
            CREATE TABLE IF NOT EXISTS active_knowledge (
                id INTEGER PRIMARY KEY,
                knowledge_id TEXT NOT NULL UNIQUE,
                scope_id INTEGER NOT NULL,
                qualified_scope TEXT NOT NULL,
                content TEXT NOT NULL,
                tags TEXT NOT NULL,
                complexity TEXT,
                complexity_rank INTEGER,
                tags_tokens TEXT NOT NULL,
                content_tokens TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_active_knowledge_scope ON active_knowledge(scope_id);

            -- Indexes the scorer's own token lists, not the raw text, so the
            -- prefilter never splits words differently from scoring
            CREATE VIRTUAL TABLE IF NOT EXISTS active_knowledge_fts USING fts5(
                tags_tokens,
                content_tokens,
                content='active_knowledge',
                content_rowid='id',
                tokenize='unicode61 remove_diacritics 0'
            );

            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            INSERT OR IGNORE INTO store_meta (key, value) VALUES ('ancestor_generation', 0);
            INSERT OR IGNORE INTO store_meta (key, value) VALUES ('view_generation', 0);
            "#,
        )?;

        self.write_tx(|tx| {
            if namespace_id(tx, GLOBAL_NAMESPACE)?.is_none() {
                let now = now();
                tx.execute(
                    "INSERT INTO namespaces (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                    params![GLOBAL_NAMESPACE, "Universal root namespace", now],
                )?;
                let ns_id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO scopes (namespace_id, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![ns_id, DEFAULT_SCOPE, "Knowledge visible from every scope", now],
                )?;
                let scope_id = tx.last_insert_rowid();
                super::graph::recompute_ancestors(tx, &[scope_id])?;
                tracing::debug!("seeded global:default");
            }
            Ok(())
        })
    }

    /// Current generation counters of the derived structures
    pub fn generations(&self) -> StoreResult<Generations> {
        Ok(Generations {
            ancestors: meta_value(&self.conn, "ancestor_generation")?,
            view: meta_value(&self.conn, "view_generation")?,
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let count = |sql: &str| -> StoreResult<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            namespaces: count("SELECT COUNT(*) FROM namespaces")?,
            scopes: count("SELECT COUNT(*) FROM scopes")?,
            knowledge: count("SELECT COUNT(*) FROM knowledge")?,
            active_knowledge: count("SELECT COUNT(*) FROM active_knowledge")?,
            suppressed_knowledge: count(
                "SELECT COUNT(DISTINCT knowledge_id) FROM knowledge_conflict_suppressed",
            )?,
            conflicts: count("SELECT COUNT(*) FROM knowledge_conflicts")?,
        })
    }
}

/// Generation counters, bumped in the same transaction as each recomputation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Generations {
    pub ancestors: i64,
    pub view: i64,
}

/// Storage statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub namespaces: usize,
    pub scopes: usize,
    pub knowledge: usize,
    pub active_knowledge: usize,
    pub suppressed_knowledge: usize,
    pub conflicts: usize,
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn parse_time(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_ulid(idx: usize, s: &str) -> rusqlite::Result<Ulid> {
    Ulid::from_string(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn meta_value(conn: &Connection, key: &str) -> StoreResult<i64> {
    let value = conn.query_row(
        "SELECT value FROM store_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )?;
    Ok(value)
}

pub(crate) fn bump_generation(conn: &Connection, key: &str) -> StoreResult<()> {
    conn.execute(
        "UPDATE store_meta SET value = value + 1 WHERE key = ?1",
        [key],
    )?;
    Ok(())
}

pub(crate) fn namespace_id(conn: &Connection, name: &str) -> StoreResult<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM namespaces WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}

pub(crate) fn require_namespace(conn: &Connection, name: &str) -> StoreResult<i64> {
    namespace_id(conn, name)?.ok_or_else(|| StoreError::UnknownNamespace(name.to_string()))
}

pub(crate) fn scope_id(conn: &Connection, name: &ScopeName) -> StoreResult<Option<i64>> {
    let id = conn
        .prepare_cached(
            r#"
            SELECT s.id FROM scopes s
            JOIN namespaces n ON s.namespace_id = n.id
            WHERE n.name = ?1 AND s.name = ?2
            "#,
        )?
        .query_row(params![name.namespace(), name.scope()], |row| row.get(0))
        .optional()?;
    Ok(id)
}

pub(crate) fn require_scope(conn: &Connection, name: &ScopeName) -> StoreResult<i64> {
    scope_id(conn, name)?.ok_or_else(|| StoreError::UnknownScope(name.to_string()))
}

pub(crate) fn scope_name(conn: &Connection, id: i64) -> StoreResult<ScopeName> {
    let (namespace, scope): (String, String) = conn
        .prepare_cached(
            r#"
            SELECT n.name, s.name FROM scopes s
            JOIN namespaces n ON s.namespace_id = n.id
            WHERE s.id = ?1
            "#,
        )?
        .query_row([id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(ScopeName::new(namespace, scope))
}

pub(crate) fn global_default_id(conn: &Connection) -> StoreResult<i64> {
    require_scope(conn, &ScopeName::global_default())
}
