//! Search - Multi-term ranked search over the active-knowledge view
//!
//! A request carries several independent query terms. Each term is parsed
//! on its own, every candidate entry keeps its best score across terms, and
//! the survivors come back ranked.
//!
//! # Algorithm
//! 1. Resolve the target scope; its cached ancestor set bounds the search
//! 2. FTS5 narrows the view to rows containing any positive word or phrase
//! 3. Each candidate is scored per term from its stored token lists
//!    (tags weigh 1.0, content 0.4 by default)
//! 4. Max across terms, drop below the relevance threshold, sort, truncate
//!
//! Candidate selection, ancestor restriction and the complexity filter run in
//! one SELECT, so a search reads a single committed snapshot.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use ulid::Ulid;

use super::error::{StoreError, StoreResult};
use super::knowledge::Complexity;
use super::name::ScopeName;
use super::query::{fts_prefilter, Document, Query, Weights};
use super::storage::{parse_time, parse_ulid, require_scope, Store};

/// Store-wide ranking tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchSettings {
    pub tags_weight: f32,
    pub content_weight: f32,
    /// Entries whose best score is below this are dropped
    pub min_relevance: f32,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            tags_weight: 1.0,
            content_weight: 0.4,
            min_relevance: 0.4,
            max_results: 50,
        }
    }
}

impl SearchSettings {
    pub fn weights(&self) -> Weights {
        Weights {
            tags: self.tags_weight,
            content: self.content_weight,
        }
    }
}

/// Search request builder
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Independent query terms
    pub terms: Vec<String>,

    /// Scope whose ancestor set is searched
    pub scope: ScopeName,

    /// Minimum complexity; unclassified entries always pass
    pub complexity: Option<Complexity>,

    /// Overrides the configured maximum result count
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new<I, S>(scope: ScopeName, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            scope,
            complexity: None,
            limit: None,
        }
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One ranked entry
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub knowledge_id: Ulid,
    pub scope: ScopeName,
    pub content: String,
    pub tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    pub score: f32,
    pub updated_at: DateTime<Utc>,
}

/// Hits sharing an originating scope
#[derive(Debug, Clone, Serialize)]
pub struct ScopeGroup {
    pub scope: ScopeName,
    pub hits: Vec<SearchHit>,
}

/// Ranked search results
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchHits {
    pub hits: Vec<SearchHit>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchHit> {
        self.hits.iter()
    }

    pub fn ids(&self) -> Vec<Ulid> {
        self.hits.iter().map(|h| h.knowledge_id).collect()
    }

    /// Group by qualified scope, groups ordered by their best hit
    pub fn by_scope(&self) -> Vec<ScopeGroup> {
        let mut groups: Vec<ScopeGroup> = Vec::new();
        for hit in &self.hits {
            match groups.iter_mut().find(|g| g.scope == hit.scope) {
                Some(group) => group.hits.push(hit.clone()),
                None => groups.push(ScopeGroup {
                    scope: hit.scope.clone(),
                    hits: vec![hit.clone()],
                }),
            }
        }
        groups
    }
}

impl IntoIterator for SearchHits {
    type Item = SearchHit;
    type IntoIter = std::vec::IntoIter<SearchHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

struct Candidate {
    id: String,
    scope: String,
    content: String,
    tags: String,
    complexity: Option<String>,
    tags_tokens: String,
    content_tokens: String,
    updated_at: String,
}

impl Store {
    /// Ranked search from `request.scope` over everything it inherits
    pub fn search(&self, request: &SearchRequest) -> StoreResult<SearchHits> {
        if request.terms.is_empty() {
            return Err(StoreError::InvalidInput(
                "at least one query term is required".to_string(),
            ));
        }
        let limit = request.limit.unwrap_or(self.search.max_results);
        if limit == 0 {
            return Err(StoreError::InvalidInput(
                "result limit must be positive".to_string(),
            ));
        }

        let conn = self.conn();
        let scope_id = require_scope(conn, &request.scope)?;

        let queries: Vec<Query> = request.terms.iter().map(|t| Query::parse(t)).collect();
        let Some(prefilter) = fts_prefilter(&queries) else {
            debug!(scope = %request.scope, "no positive query words");
            return Ok(SearchHits::default());
        };

        let mut stmt = conn.prepare_cached(
            r#"
            SELECT a.knowledge_id, a.qualified_scope, a.content, a.tags, a.complexity,
                   a.tags_tokens, a.content_tokens, a.updated_at
            FROM active_knowledge a
            JOIN scope_ancestors sa ON sa.ancestor_id = a.scope_id
            WHERE sa.scope_id = ?1
              AND a.id IN (
                  SELECT rowid FROM active_knowledge_fts WHERE active_knowledge_fts MATCH ?2
              )
              AND (?3 IS NULL OR a.complexity_rank IS NULL OR a.complexity_rank >= ?3)
            "#,
        )?;

        let candidates = stmt
            .query_map(
                rusqlite::params![scope_id, prefilter, request.complexity.map(|c| c.rank())],
                |row| {
                    Ok(Candidate {
                        id: row.get(0)?,
                        scope: row.get(1)?,
                        content: row.get(2)?,
                        tags: row.get(3)?,
                        complexity: row.get(4)?,
                        tags_tokens: row.get(5)?,
                        content_tokens: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let weights = self.search.weights();
        let total = candidates.len();
        let mut hits = Vec::new();

        for candidate in candidates {
            let doc = Document::new(
                serde_json::from_str(&candidate.tags_tokens)?,
                serde_json::from_str(&candidate.content_tokens)?,
            );

            let score = queries
                .iter()
                .map(|q| q.score(&doc, weights))
                .fold(0.0_f32, f32::max);

            if score <= 0.0 || score < self.search.min_relevance {
                continue;
            }

            hits.push(SearchHit {
                knowledge_id: parse_ulid(0, &candidate.id)?,
                scope: ScopeName::parse(&candidate.scope)?,
                content: candidate.content,
                tags: candidate.tags,
                complexity: candidate.complexity.map(|c| c.parse()).transpose()?,
                score,
                updated_at: parse_time(7, &candidate.updated_at)?,
            });
        }

        hits.sort_by(rank_order);
        hits.truncate(limit);

        debug!(
            scope = %request.scope,
            terms = request.terms.len(),
            candidates = total,
            hits = hits.len(),
            "search"
        );

        Ok(SearchHits { hits })
    }
}

/// Score descending, then most recently updated, then id
fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.knowledge_id.cmp(&b.knowledge_id))
}
