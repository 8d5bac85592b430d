//! Knowledge - Core data structure
//!
//! A knowledge entry is an atomic fact owned by exactly one scope.
//!
//! # Key Properties
//! - **id**: ULID (sortable, unique)
//! - **scope**: Owning scope (`namespace:scope`)
//! - **content**: Free text payload
//! - **tags**: Free text curated for search matching
//! - **complexity**: Optional task size; `None` matches every filter level

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;
use ulid::Ulid;

use super::error::{StoreError, StoreResult};
use super::name::ScopeName;
use super::query::tokenize;
use super::storage::{now, parse_time, parse_ulid, require_scope, Store};
use super::view::refresh_view;

/// Task complexity classification, ordered smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Complexity {
    #[serde(rename = "XS")]
    ExtraSmall,
    #[serde(rename = "S")]
    Small,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Large,
    #[serde(rename = "XL")]
    ExtraLarge,
}

impl Complexity {
    pub const ALL: [Complexity; 5] = [
        Complexity::ExtraSmall,
        Complexity::Small,
        Complexity::Medium,
        Complexity::Large,
        Complexity::ExtraLarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::ExtraSmall => "XS",
            Complexity::Small => "S",
            Complexity::Medium => "M",
            Complexity::Large => "L",
            Complexity::ExtraLarge => "XL",
        }
    }

    /// Position on the scale, 0 for XS
    pub fn rank(&self) -> i64 {
        *self as i64
    }

    /// Does an entry with classification `entry` pass a filter at this level.
    /// Unclassified entries pass every level.
    pub fn admits(&self, entry: Option<Complexity>) -> bool {
        match entry {
            None => true,
            Some(level) => level >= *self,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Complexity {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "XS" => Ok(Complexity::ExtraSmall),
            "S" => Ok(Complexity::Small),
            "M" => Ok(Complexity::Medium),
            "L" => Ok(Complexity::Large),
            "XL" => Ok(Complexity::ExtraLarge),
            _ => Err(StoreError::InvalidInput(format!(
                "unknown complexity '{}', expected one of XS, S, M, L, XL",
                s
            ))),
        }
    }
}

/// A knowledge entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Knowledge {
    /// Unique identifier (ULID)
    pub id: Ulid,

    /// Owning scope
    pub scope: ScopeName,

    /// The fact itself
    pub content: String,

    /// Search tags (free text)
    pub tags: String,

    /// Task complexity classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,

    /// Whether a conflict record currently suppresses this entry
    #[serde(default)]
    pub suppressed: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new knowledge entry
#[derive(Debug, Clone)]
pub struct NewKnowledge {
    pub scope: ScopeName,
    pub content: String,
    pub tags: String,
    pub complexity: Option<Complexity>,
}

impl NewKnowledge {
    pub fn new(scope: ScopeName, content: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            scope,
            content: content.into(),
            tags: tags.into(),
            complexity: None,
        }
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }
}

/// Partial update of a knowledge entry; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct KnowledgeUpdate {
    pub content: Option<String>,
    pub tags: Option<String>,
    pub scope: Option<ScopeName>,
    pub complexity: Option<Complexity>,
    /// Reset the classification to "every level"
    pub clear_complexity: bool,
}

impl KnowledgeUpdate {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.tags.is_none()
            && self.scope.is_none()
            && self.complexity.is_none()
            && !self.clear_complexity
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn scope(mut self, scope: ScopeName) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }
}

/// Reject text fields that are only whitespace
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!(
            "knowledge {} cannot be empty",
            field
        )));
    }
    Ok(())
}

impl Store {
    /// Store a new knowledge entry
    pub fn write_knowledge(&mut self, new: NewKnowledge) -> StoreResult<Ulid> {
        require_text("content", &new.content)?;
        require_text("tags", &new.tags)?;

        let id = Ulid::new();
        self.write_tx(|tx| {
            let scope_id = require_scope(tx, &new.scope)?;
            let now = now();

            tx.execute(
                r#"
                INSERT INTO knowledge (
                    id, scope_id, content, tags, complexity,
                    tags_tokens, content_tokens, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                "#,
                params![
                    id.to_string(),
                    scope_id,
                    new.content,
                    new.tags,
                    new.complexity.map(|c| c.as_str()),
                    serde_json::to_string(&tokenize(&new.tags))?,
                    serde_json::to_string(&tokenize(&new.content))?,
                    now,
                ],
            )?;

            refresh_view(tx)?;
            Ok(())
        })?;

        info!(id = %id, scope = %new.scope, "wrote knowledge");
        Ok(id)
    }

    /// Apply a partial update; at least one field must be set
    pub fn update_knowledge(&mut self, id: Ulid, update: KnowledgeUpdate) -> StoreResult<Knowledge> {
        if update.is_empty() {
            return Err(StoreError::NoOp(id.to_string()));
        }
        if update.complexity.is_some() && update.clear_complexity {
            return Err(StoreError::InvalidInput(
                "cannot set and clear complexity at once".to_string(),
            ));
        }
        if let Some(content) = &update.content {
            require_text("content", content)?;
        }
        if let Some(tags) = &update.tags {
            require_text("tags", tags)?;
        }

        let knowledge = self.write_tx(|tx| {
            let key = id.to_string();
            if !knowledge_exists(tx, &key)? {
                return Err(StoreError::UnknownKnowledge(key));
            }

            if let Some(content) = &update.content {
                tx.execute(
                    "UPDATE knowledge SET content = ?2, content_tokens = ?3 WHERE id = ?1",
                    params![key, content, serde_json::to_string(&tokenize(content))?],
                )?;
            }

            if let Some(tags) = &update.tags {
                tx.execute(
                    "UPDATE knowledge SET tags = ?2, tags_tokens = ?3 WHERE id = ?1",
                    params![key, tags, serde_json::to_string(&tokenize(tags))?],
                )?;
            }

            if let Some(scope) = &update.scope {
                let scope_id = require_scope(tx, scope)?;
                tx.execute(
                    "UPDATE knowledge SET scope_id = ?2 WHERE id = ?1",
                    params![key, scope_id],
                )?;
            }

            if let Some(complexity) = update.complexity {
                tx.execute(
                    "UPDATE knowledge SET complexity = ?2 WHERE id = ?1",
                    params![key, complexity.as_str()],
                )?;
            } else if update.clear_complexity {
                tx.execute("UPDATE knowledge SET complexity = NULL WHERE id = ?1", [&key])?;
            }

            tx.execute(
                "UPDATE knowledge SET updated_at = ?2 WHERE id = ?1",
                params![key, now()],
            )?;

            refresh_view(tx)?;
            load_knowledge(tx, id)
        })?;

        info!(id = %id, "updated knowledge");
        Ok(knowledge)
    }

    /// Delete an entry.
    ///
    /// Conflict records naming it as the active entry go with it, so the
    /// entries they suppressed become visible again unless another record
    /// still suppresses them.
    pub fn delete_knowledge(&mut self, id: Ulid) -> StoreResult<()> {
        let dropped = self.write_tx(|tx| {
            let key = id.to_string();

            let dropped: i64 = tx.query_row(
                "SELECT COUNT(*) FROM knowledge_conflicts WHERE active_knowledge_id = ?1",
                [&key],
                |row| row.get(0),
            )?;

            if tx.execute("DELETE FROM knowledge WHERE id = ?1", [&key])? == 0 {
                return Err(StoreError::UnknownKnowledge(key));
            }

            refresh_view(tx)?;
            Ok(dropped)
        })?;

        info!(id = %id, dropped_conflicts = dropped, "deleted knowledge");
        Ok(())
    }

    /// Fetch one entry, suppressed or not
    pub fn get_knowledge(&self, id: Ulid) -> StoreResult<Knowledge> {
        load_knowledge(self.conn(), id)
    }
}

pub(crate) fn knowledge_exists(conn: &Connection, key: &str) -> StoreResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM knowledge WHERE id = ?1)",
        [key],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn load_knowledge(conn: &Connection, id: Ulid) -> StoreResult<Knowledge> {
    let row = conn
        .query_row(
            r#"
            SELECT k.id, n.name, s.name, k.content, k.tags, k.complexity,
                   EXISTS(SELECT 1 FROM knowledge_conflict_suppressed cs WHERE cs.knowledge_id = k.id),
                   k.created_at, k.updated_at
            FROM knowledge k
            JOIN scopes s ON k.scope_id = s.id
            JOIN namespaces n ON s.namespace_id = n.id
            WHERE k.id = ?1
            "#,
            [id.to_string()],
            |row| {
                let id: String = row.get(0)?;
                let created_at: String = row.get(7)?;
                let updated_at: String = row.get(8)?;
                Ok((
                    parse_ulid(0, &id)?,
                    ScopeName::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, bool>(6)?,
                    parse_time(7, &created_at)?,
                    parse_time(8, &updated_at)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::UnknownKnowledge(id.to_string()))?;

    let (id, scope, content, tags, complexity, suppressed, created_at, updated_at) = row;
    Ok(Knowledge {
        id,
        scope,
        content,
        tags,
        complexity: complexity.map(|c| c.parse()).transpose()?,
        suppressed,
        created_at,
        updated_at,
    })
}
