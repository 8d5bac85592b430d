//! Graph - Namespaces, scopes and multi-parent inheritance
//!
//! Scopes form a DAG stored as an adjacency table (`scope_parents`, keyed by
//! child id). Each scope's transitive ancestor set is flattened into
//! `scope_ancestors` so search never walks edges.
//!
//! # Key Points
//! - Every namespace owns a `default` scope; every other scope keeps an edge
//!   to it that cannot be removed
//! - `global:default` is in every ancestor set
//! - Adding parent P to child C is rejected when C is already an ancestor of P
//! - Any edge change recomputes the cache of the child and all its descendants

use std::collections::{BTreeSet, HashSet, VecDeque};

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{StoreError, StoreResult};
use super::name::{validate_name, ScopeName, DEFAULT_SCOPE, GLOBAL_NAMESPACE};
use super::storage::{
    bump_generation, global_default_id, namespace_id, now, require_namespace, require_scope,
    scope_id, scope_name, Store,
};
use super::view::refresh_view;

/// A namespace and its default scope
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub description: String,
    pub default_scope: ScopeName,
}

/// A scope and its explicit parents
#[derive(Debug, Clone, Serialize)]
pub struct ScopeInfo {
    pub scope: ScopeName,
    pub description: String,
    pub parents: Vec<ScopeName>,
}

/// Result of a namespace cascade delete
#[derive(Debug, Clone, Serialize)]
pub struct DeletedNamespace {
    pub namespace: String,
    pub deleted_scopes: usize,
    pub deleted_knowledge: usize,
}

/// Result of a scope delete
#[derive(Debug, Clone, Serialize)]
pub struct DeletedScope {
    pub scope: ScopeName,
    pub deleted_knowledge: usize,
}

/// How much of the namespace tree to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Namespace and scope names only
    #[default]
    Short,
    /// Names and descriptions
    Long,
    /// Names, descriptions and parent edges
    Details,
}

impl std::str::FromStr for DetailLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short" => Ok(DetailLevel::Short),
            "long" => Ok(DetailLevel::Long),
            "details" => Ok(DetailLevel::Details),
            _ => Err(StoreError::InvalidInput(format!(
                "unknown detail level '{}', expected short, long or details",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceListing {
    pub namespaces: Vec<NamespaceEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scopes: Vec<ScopeEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeEntry {
    pub scope: ScopeName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<ScopeName>>,
}

impl Store {
    /// Create a namespace together with its `default` scope
    pub fn create_namespace(&mut self, name: &str, description: &str) -> StoreResult<NamespaceInfo> {
        validate_name(name)?;

        let info = self.write_tx(|tx| {
            if namespace_id(tx, name)?.is_some() {
                return Err(StoreError::DuplicateName(name.to_string()));
            }

            let now = now();
            tx.execute(
                "INSERT INTO namespaces (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![name, description, now],
            )?;
            let ns_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO scopes (namespace_id, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                params![ns_id, DEFAULT_SCOPE, format!("Default scope of {}", name), now],
            )?;
            recompute_ancestors(tx, &[tx.last_insert_rowid()])?;

            Ok(NamespaceInfo {
                name: name.to_string(),
                description: description.to_string(),
                default_scope: ScopeName::default_of(name),
            })
        })?;

        info!(namespace = name, "created namespace");
        Ok(info)
    }

    /// Rename a namespace and/or change its description
    pub fn update_namespace(
        &mut self,
        name: &str,
        new_name: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<NamespaceInfo> {
        let rename = new_name.filter(|n| *n != name);
        if rename.is_none() && description.is_none() {
            return Err(StoreError::NoOp(name.to_string()));
        }
        if name == GLOBAL_NAMESPACE {
            return Err(StoreError::ProtectedEntity(
                "the global namespace cannot be modified".to_string(),
            ));
        }
        if let Some(new_name) = rename {
            validate_name(new_name)?;
        }

        let info = self.write_tx(|tx| {
            let id = require_namespace(tx, name)?;
            let now = now();
            let mut renamed = false;

            if let Some(new_name) = rename {
                if namespace_id(tx, new_name)?.is_some() {
                    return Err(StoreError::DuplicateName(new_name.to_string()));
                }
                tx.execute(
                    "UPDATE namespaces SET name = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, new_name, now],
                )?;
                renamed = true;
            }

            if let Some(description) = description {
                tx.execute(
                    "UPDATE namespaces SET description = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, description, now],
                )?;
            }

            // qualified names are denormalized into the view
            if renamed {
                refresh_view(tx)?;
            }

            let (name, description): (String, String) = tx.query_row(
                "SELECT name, description FROM namespaces WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(NamespaceInfo {
                default_scope: ScopeName::default_of(&name),
                name,
                description,
            })
        })?;

        info!(namespace = name, new_name = %info.name, "updated namespace");
        Ok(info)
    }

    /// Delete a namespace with all of its scopes and knowledge
    pub fn delete_namespace(&mut self, name: &str) -> StoreResult<DeletedNamespace> {
        if name == GLOBAL_NAMESPACE {
            return Err(StoreError::ProtectedEntity(
                "the global namespace cannot be deleted".to_string(),
            ));
        }

        let deleted = self.write_tx(|tx| {
            let id = require_namespace(tx, name)?;

            let owned: Vec<i64> = tx
                .prepare("SELECT id FROM scopes WHERE namespace_id = ?1")?
                .query_map([id], |row| row.get(0))?
                .collect::<Result<_, _>>()?;

            let deleted_knowledge: i64 = tx.query_row(
                "SELECT COUNT(*) FROM knowledge k JOIN scopes s ON k.scope_id = s.id WHERE s.namespace_id = ?1",
                [id],
                |row| row.get(0),
            )?;

            // scopes in other namespaces that inherit from this one
            let owned_set: HashSet<i64> = owned.iter().copied().collect();
            let outside: Vec<i64> = descendants_of(tx, &owned)?
                .into_iter()
                .filter(|d| !owned_set.contains(d))
                .collect();

            tx.execute("DELETE FROM namespaces WHERE id = ?1", [id])?;

            recompute_ancestors(tx, &outside)?;
            refresh_view(tx)?;

            Ok(DeletedNamespace {
                namespace: name.to_string(),
                deleted_scopes: owned.len(),
                deleted_knowledge: deleted_knowledge as usize,
            })
        })?;

        info!(
            namespace = name,
            scopes = deleted.deleted_scopes,
            knowledge = deleted.deleted_knowledge,
            "deleted namespace"
        );
        Ok(deleted)
    }

    /// Create a scope; it always inherits from its namespace's default scope
    pub fn create_scope(
        &mut self,
        scope: &ScopeName,
        description: &str,
        parents: &[ScopeName],
    ) -> StoreResult<ScopeInfo> {
        let info = self.write_tx(|tx| {
            let ns_id = require_namespace(tx, scope.namespace())?;
            if scope_id(tx, scope)?.is_some() {
                return Err(StoreError::DuplicateName(scope.to_string()));
            }

            let parents = resolve_parents(tx, parents)?;
            let default = ScopeName::default_of(scope.namespace());
            let default_id = require_scope(tx, &default)?;

            let now = now();
            tx.execute(
                "INSERT INTO scopes (namespace_id, name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                params![ns_id, scope.scope(), description, now],
            )?;
            let id = tx.last_insert_rowid();

            add_edge(tx, (id, scope), (default_id, &default))?;
            for (parent_id, parent) in &parents {
                add_edge(tx, (id, scope), (*parent_id, parent))?;
            }

            scope_info(tx, id)
        })?;

        info!(scope = %scope, parents = info.parents.len(), "created scope");
        Ok(info)
    }

    /// Rename a scope, change its description and/or replace its parents.
    ///
    /// `parents` replaces the explicit parent set; the edge to the namespace
    /// default is always kept.
    pub fn update_scope(
        &mut self,
        scope: &ScopeName,
        new_name: Option<&str>,
        description: Option<&str>,
        parents: Option<&[ScopeName]>,
    ) -> StoreResult<ScopeInfo> {
        let rename = new_name.filter(|n| *n != scope.scope());
        if rename.is_none() && description.is_none() && parents.is_none() {
            return Err(StoreError::NoOp(scope.to_string()));
        }
        if rename.is_some() && scope.is_default() {
            return Err(StoreError::ProtectedEntity(format!(
                "{} cannot be renamed",
                scope
            )));
        }
        if description.is_some() && scope.is_global_default() {
            return Err(StoreError::ProtectedEntity(format!(
                "{} cannot be modified",
                scope
            )));
        }
        if let Some(new_name) = rename {
            validate_name(new_name)?;
        }

        let info = self.write_tx(|tx| {
            let id = require_scope(tx, scope)?;
            let now = now();

            if let Some(parents) = parents {
                if scope.is_default() {
                    if !parents.is_empty() {
                        warn!(scope = %scope, "default scopes have no parents; ignoring");
                    }
                } else {
                    replace_parents(tx, (id, scope), parents)?;
                }
            }

            let mut renamed = false;
            if let Some(new_name) = rename {
                let target = ScopeName::new(scope.namespace(), new_name);
                if scope_id(tx, &target)?.is_some() {
                    return Err(StoreError::DuplicateName(target.to_string()));
                }
                tx.execute(
                    "UPDATE scopes SET name = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, new_name, now],
                )?;
                renamed = true;
            }

            if let Some(description) = description {
                tx.execute(
                    "UPDATE scopes SET description = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, description, now],
                )?;
            }

            if renamed {
                refresh_view(tx)?;
            }

            scope_info(tx, id)
        })?;

        info!(scope = %scope, now = %info.scope, "updated scope");
        Ok(info)
    }

    /// Add one parent edge
    pub fn add_parent(&mut self, child: &ScopeName, parent: &ScopeName) -> StoreResult<ScopeInfo> {
        self.add_parents(child, std::slice::from_ref(parent))
    }

    /// Add parent edges; a no-op on default scopes
    pub fn add_parents(&mut self, child: &ScopeName, parents: &[ScopeName]) -> StoreResult<ScopeInfo> {
        self.write_tx(|tx| {
            let id = require_scope(tx, child)?;
            let parents = resolve_parents(tx, parents)?;

            if child.is_default() {
                warn!(scope = %child, "default scopes have no parents; ignoring");
                return scope_info(tx, id);
            }

            for (parent_id, parent) in &parents {
                add_edge(tx, (id, child), (*parent_id, parent))?;
            }

            scope_info(tx, id)
        })
    }

    /// Remove one parent edge
    pub fn remove_parent(&mut self, child: &ScopeName, parent: &ScopeName) -> StoreResult<ScopeInfo> {
        self.remove_parents(child, std::slice::from_ref(parent))
    }

    /// Remove parent edges; the namespace default edge is not removable
    pub fn remove_parents(
        &mut self,
        child: &ScopeName,
        parents: &[ScopeName],
    ) -> StoreResult<ScopeInfo> {
        self.write_tx(|tx| {
            let id = require_scope(tx, child)?;
            let parents = resolve_parents(tx, parents)?;
            let default = ScopeName::default_of(child.namespace());

            for (parent_id, parent) in &parents {
                if *parent == default {
                    return Err(StoreError::ProtectedEntity(format!(
                        "{} must keep its parent {}",
                        child, default
                    )));
                }
                if !has_edge(tx, id, *parent_id)? {
                    return Err(StoreError::UnknownParent(format!(
                        "{} is not a parent of {}",
                        parent, child
                    )));
                }
            }

            for (parent_id, _) in &parents {
                tx.execute(
                    "DELETE FROM scope_parents WHERE child_scope_id = ?1 AND parent_scope_id = ?2",
                    params![id, parent_id],
                )?;
            }

            let affected = descendants_of(tx, &[id])?;
            recompute_ancestors(tx, &affected)?;

            scope_info(tx, id)
        })
    }

    /// Delete a scope and its knowledge; default scopes only go with their namespace
    pub fn delete_scope(&mut self, scope: &ScopeName) -> StoreResult<DeletedScope> {
        if scope.is_default() {
            return Err(StoreError::ProtectedEntity(format!(
                "{} can only be deleted with its namespace",
                scope
            )));
        }

        let deleted = self.write_tx(|tx| {
            let id = require_scope(tx, scope)?;

            let deleted_knowledge: i64 = tx.query_row(
                "SELECT COUNT(*) FROM knowledge WHERE scope_id = ?1",
                [id],
                |row| row.get(0),
            )?;

            let orphaned: Vec<i64> = descendants_of(tx, &[id])?
                .into_iter()
                .filter(|d| *d != id)
                .collect();

            tx.execute("DELETE FROM scopes WHERE id = ?1", [id])?;

            recompute_ancestors(tx, &orphaned)?;
            refresh_view(tx)?;

            Ok(DeletedScope {
                scope: scope.clone(),
                deleted_knowledge: deleted_knowledge as usize,
            })
        })?;

        info!(scope = %scope, knowledge = deleted.deleted_knowledge, "deleted scope");
        Ok(deleted)
    }

    /// A scope with its description and explicit parents
    pub fn get_scope(&self, scope: &ScopeName) -> StoreResult<ScopeInfo> {
        let id = require_scope(self.conn(), scope)?;
        scope_info(self.conn(), id)
    }

    /// Cached ancestor set, nearest first (the scope itself leads)
    pub fn ancestors(&self, scope: &ScopeName) -> StoreResult<Vec<ScopeName>> {
        let id = require_scope(self.conn(), scope)?;

        let mut stmt = self.conn().prepare(
            r#"
            SELECT n.name, s.name
            FROM scope_ancestors a
            JOIN scopes s ON a.ancestor_id = s.id
            JOIN namespaces n ON s.namespace_id = n.id
            WHERE a.scope_id = ?1
            ORDER BY a.depth, n.name, s.name
            "#,
        )?;

        let names = stmt
            .query_map([id], |row| {
                Ok(ScopeName::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(names)
    }

    /// List namespaces and their scopes at the requested detail level
    pub fn get_namespaces(
        &self,
        filter: Option<&str>,
        detail: DetailLevel,
    ) -> StoreResult<NamespaceListing> {
        let conn = self.conn();
        if let Some(name) = filter {
            require_namespace(conn, name)?;
        }

        let namespaces: Vec<(i64, String, String)> = conn
            .prepare("SELECT id, name, description FROM namespaces WHERE ?1 IS NULL OR name = ?1 ORDER BY name")?
            .query_map([filter], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<_, _>>()?;

        let mut scopes_stmt = conn.prepare(
            "SELECT id, name, description FROM scopes WHERE namespace_id = ?1 ORDER BY name <> 'default', name",
        )?;

        let mut entries = Vec::with_capacity(namespaces.len());
        for (ns_id, ns_name, ns_description) in namespaces {
            let scopes: Vec<(i64, String, String)> = scopes_stmt
                .query_map([ns_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<_, _>>()?;

            let mut scope_entries = Vec::with_capacity(scopes.len());
            for (id, name, description) in scopes {
                scope_entries.push(ScopeEntry {
                    scope: ScopeName::new(ns_name.clone(), name),
                    description: (detail != DetailLevel::Short).then_some(description),
                    parents: match detail {
                        DetailLevel::Details => Some(explicit_parents(conn, id)?),
                        _ => None,
                    },
                });
            }

            entries.push(NamespaceEntry {
                name: ns_name,
                description: (detail != DetailLevel::Short).then_some(ns_description),
                scopes: scope_entries,
            });
        }

        Ok(NamespaceListing { namespaces: entries })
    }
}

/// Recompute the flattened ancestor set of every scope in `ids`.
/// Ids of scopes that no longer exist are skipped.
pub(crate) fn recompute_ancestors(conn: &Connection, ids: &[i64]) -> StoreResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let global_id = global_default_id(conn)?;
    let bound: i64 = conn.query_row("SELECT COUNT(*) FROM scopes", [], |row| row.get(0))?;

    let mut recomputed = 0;
    for &id in ids {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM scopes WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            continue;
        }

        let ancestors = compute_ancestors(conn, id, global_id, bound as usize)?;

        conn.execute("DELETE FROM scope_ancestors WHERE scope_id = ?1", [id])?;
        let mut insert = conn.prepare_cached(
            "INSERT INTO scope_ancestors (scope_id, ancestor_id, depth) VALUES (?1, ?2, ?3)",
        )?;
        for (ancestor, depth) in ancestors {
            insert.execute(params![id, ancestor, depth])?;
        }
        recomputed += 1;
    }

    bump_generation(conn, "ancestor_generation")?;
    debug!(scopes = recomputed, "recomputed ancestor cache");
    Ok(())
}

/// Bounded breadth-first walk over parent edges, plus `global:default`
fn compute_ancestors(
    conn: &Connection,
    scope_id: i64,
    global_id: i64,
    bound: usize,
) -> StoreResult<Vec<(i64, i64)>> {
    let mut seen = HashSet::from([scope_id]);
    let mut out = vec![(scope_id, 0)];
    let mut queue = VecDeque::from([(scope_id, 0_i64)]);
    let mut steps = 0;

    let mut parents_stmt = conn.prepare_cached(
        "SELECT parent_scope_id FROM scope_parents WHERE child_scope_id = ?1 ORDER BY parent_scope_id",
    )?;

    while let Some((id, depth)) = queue.pop_front() {
        steps += 1;
        if steps > bound {
            warn!(scope_id, bound, "ancestor walk hit its bound; edge set may be corrupt");
            break;
        }

        let parents: Vec<i64> = parents_stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        for parent in parents {
            if seen.insert(parent) {
                out.push((parent, depth + 1));
                queue.push_back((parent, depth + 1));
            }
        }
    }

    if seen.insert(global_id) {
        let depth = out.iter().map(|(_, d)| *d).max().unwrap_or(0) + 1;
        out.push((global_id, depth));
    }

    Ok(out)
}

/// `ids` plus every scope whose cached ancestor set contains one of them
fn descendants_of(conn: &Connection, ids: &[i64]) -> StoreResult<Vec<i64>> {
    let mut out: BTreeSet<i64> = ids.iter().copied().collect();
    let mut stmt = conn.prepare_cached("SELECT scope_id FROM scope_ancestors WHERE ancestor_id = ?1")?;

    for &id in ids {
        let rows = stmt.query_map([id], |row| row.get::<_, i64>(0))?;
        for row in rows {
            out.insert(row?);
        }
    }

    Ok(out.into_iter().collect())
}

/// Commit edge child -> parent after the cycle check, then refresh caches
fn add_edge(
    conn: &Connection,
    (child_id, child): (i64, &ScopeName),
    (parent_id, parent): (i64, &ScopeName),
) -> StoreResult<()> {
    let cycle: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM scope_ancestors WHERE scope_id = ?1 AND ancestor_id = ?2)",
        params![parent_id, child_id],
        |row| row.get(0),
    )?;
    if cycle {
        return Err(StoreError::CycleDetected {
            child: child.to_string(),
            parent: parent.to_string(),
        });
    }

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO scope_parents (child_scope_id, parent_scope_id) VALUES (?1, ?2)",
        params![child_id, parent_id],
    )?;

    if inserted > 0 {
        let affected = descendants_of(conn, &[child_id])?;
        recompute_ancestors(conn, &affected)?;
    }

    Ok(())
}

fn replace_parents(
    conn: &Connection,
    (id, scope): (i64, &ScopeName),
    parents: &[ScopeName],
) -> StoreResult<()> {
    let parents = resolve_parents(conn, parents)?;
    let default = ScopeName::default_of(scope.namespace());
    let default_id = require_scope(conn, &default)?;

    conn.execute(
        "DELETE FROM scope_parents WHERE child_scope_id = ?1 AND parent_scope_id <> ?2",
        params![id, default_id],
    )?;
    let affected = descendants_of(conn, &[id])?;
    recompute_ancestors(conn, &affected)?;

    add_edge(conn, (id, scope), (default_id, &default))?;
    for (parent_id, parent) in &parents {
        add_edge(conn, (id, scope), (*parent_id, parent))?;
    }

    Ok(())
}

fn has_edge(conn: &Connection, child_id: i64, parent_id: i64) -> StoreResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM scope_parents WHERE child_scope_id = ?1 AND parent_scope_id = ?2)",
        params![child_id, parent_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Look up every parent; fails on the first unknown one
fn resolve_parents(conn: &Connection, parents: &[ScopeName]) -> StoreResult<Vec<(i64, ScopeName)>> {
    let mut out: Vec<(i64, ScopeName)> = Vec::with_capacity(parents.len());
    for parent in parents {
        let id = scope_id(conn, parent)?
            .ok_or_else(|| StoreError::UnknownParent(parent.to_string()))?;
        if !out.iter().any(|(existing, _)| *existing == id) {
            out.push((id, parent.clone()));
        }
    }
    Ok(out)
}

fn explicit_parents(conn: &Connection, id: i64) -> StoreResult<Vec<ScopeName>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT n.name, s.name
        FROM scope_parents sp
        JOIN scopes s ON sp.parent_scope_id = s.id
        JOIN namespaces n ON s.namespace_id = n.id
        WHERE sp.child_scope_id = ?1
        ORDER BY n.name, s.name
        "#,
    )?;

    let parents = stmt
        .query_map([id], |row| {
            Ok(ScopeName::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parents)
}

fn scope_info(conn: &Connection, id: i64) -> StoreResult<ScopeInfo> {
    let description: String =
        conn.query_row("SELECT description FROM scopes WHERE id = ?1", [id], |row| row.get(0))?;
    Ok(ScopeInfo {
        scope: scope_name(conn, id)?,
        description,
        parents: explicit_parents(conn, id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ScopeName {
        ScopeName::parse(s).unwrap()
    }

    fn names(list: &[&str]) -> Vec<ScopeName> {
        list.iter().map(|s| name(s)).collect()
    }

    #[test]
    fn test_create_namespace_creates_default() -> StoreResult<()> {
        let mut store = Store::open_memory()?;

        let info = store.create_namespace("acme", "Acme Corp")?;
        assert_eq!(info.default_scope, name("acme:default"));

        let ancestors = store.ancestors(&name("acme:default"))?;
        assert_eq!(ancestors, names(&["acme:default", "global:default"]));

        Ok(())
    }

    #[test]
    fn test_duplicate_namespace() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;

        let err = store.create_namespace("acme", "Again").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(n) if n == "acme"));

        let err = store.create_namespace("global", "Nope").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));
        Ok(())
    }

    #[test]
    fn test_scope_without_parents_inherits_defaults() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;

        let info = store.create_scope(&name("acme:frontend"), "UI", &[])?;
        assert_eq!(info.parents, names(&["acme:default"]));

        let ancestors = store.ancestors(&name("acme:frontend"))?;
        assert_eq!(
            ancestors,
            names(&["acme:frontend", "acme:default", "global:default"])
        );
        Ok(())
    }

    #[test]
    fn test_cross_namespace_multiple_parents() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_namespace("rust", "Rust language")?;
        store.create_scope(&name("acme:shared"), "Shared", &[])?;

        let info = store.create_scope(
            &name("acme:backend"),
            "Backend",
            &names(&["acme:shared", "rust:default"]),
        )?;
        assert_eq!(
            info.parents,
            names(&["acme:default", "acme:shared", "rust:default"])
        );

        let ancestors: HashSet<ScopeName> =
            store.ancestors(&name("acme:backend"))?.into_iter().collect();
        for expected in names(&[
            "acme:backend",
            "acme:shared",
            "acme:default",
            "rust:default",
            "global:default",
        ]) {
            assert!(ancestors.contains(&expected), "missing {}", expected);
        }
        assert_eq!(ancestors.len(), 5);
        Ok(())
    }

    #[test]
    fn test_unknown_parent_commits_nothing() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;

        let err = store
            .create_scope(&name("acme:api"), "API", &names(&["acme:missing"]))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownParent(p) if p == "acme:missing"));

        assert!(matches!(
            store.get_scope(&name("acme:api")),
            Err(StoreError::UnknownScope(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_namespace_on_create_scope() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        let err = store.create_scope(&name("nope:api"), "API", &[]).unwrap_err();
        assert!(matches!(err, StoreError::UnknownNamespace(n) if n == "nope"));
        Ok(())
    }

    #[test]
    fn test_deep_chain_reaches_global() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("deep", "Deep")?;

        let mut previous = name("deep:default");
        for i in 0..8 {
            let scope = name(&format!("deep:level-{}", i));
            store.create_scope(&scope, "level", std::slice::from_ref(&previous))?;
            previous = scope;
        }

        let ancestors = store.ancestors(&previous)?;
        assert_eq!(ancestors.first(), Some(&previous));
        assert_eq!(ancestors.last(), Some(&ScopeName::global_default()));
        assert_eq!(ancestors.len(), 8 + 2);
        Ok(())
    }

    #[test]
    fn test_cycle_rejected_and_edges_unchanged() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_scope(&name("acme:a"), "A", &[])?;
        store.create_scope(&name("acme:b"), "B", &names(&["acme:a"]))?;
        store.create_scope(&name("acme:c"), "C", &names(&["acme:b"]))?;

        let before = store.get_scope(&name("acme:a"))?.parents;
        let generations = store.generations()?;

        let err = store.add_parent(&name("acme:a"), &name("acme:c")).unwrap_err();
        assert!(matches!(err, StoreError::CycleDetected { .. }));

        assert_eq!(store.get_scope(&name("acme:a"))?.parents, before);
        assert_eq!(store.generations()?, generations);

        // self edges are cycles too
        let err = store.add_parent(&name("acme:b"), &name("acme:b")).unwrap_err();
        assert!(matches!(err, StoreError::CycleDetected { .. }));
        Ok(())
    }

    #[test]
    fn test_add_parent_propagates_to_descendants() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_namespace("java", "Java")?;
        store.create_scope(&name("acme:backend"), "Backend", &[])?;
        store.create_scope(&name("acme:payments"), "Payments", &names(&["acme:backend"]))?;

        store.add_parent(&name("acme:backend"), &name("java:default"))?;

        let ancestors = store.ancestors(&name("acme:payments"))?;
        assert!(ancestors.contains(&name("java:default")));

        store.remove_parent(&name("acme:backend"), &name("java:default"))?;
        let ancestors = store.ancestors(&name("acme:payments"))?;
        assert!(!ancestors.contains(&name("java:default")));
        Ok(())
    }

    #[test]
    fn test_default_parent_is_protected() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_scope(&name("acme:api"), "API", &[])?;

        let err = store
            .remove_parent(&name("acme:api"), &name("acme:default"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ProtectedEntity(_)));

        let err = store.delete_scope(&name("acme:default")).unwrap_err();
        assert!(matches!(err, StoreError::ProtectedEntity(_)));
        Ok(())
    }

    #[test]
    fn test_remove_parent_that_is_not_a_parent() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_scope(&name("acme:api"), "API", &[])?;
        store.create_scope(&name("acme:web"), "Web", &[])?;

        let err = store
            .remove_parent(&name("acme:api"), &name("acme:web"))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownParent(_)));
        Ok(())
    }

    #[test]
    fn test_add_parent_to_default_is_noop() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_namespace("java", "Java")?;

        let info = store.add_parent(&name("acme:default"), &name("java:default"))?;
        assert!(info.parents.is_empty());
        assert_eq!(
            store.ancestors(&name("acme:default"))?,
            names(&["acme:default", "global:default"])
        );
        Ok(())
    }

    #[test]
    fn test_update_scope_replaces_parents_keeps_default() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_namespace("java", "Java")?;
        store.create_namespace("kotlin", "Kotlin")?;
        store.create_scope(&name("acme:api"), "API", &names(&["java:default"]))?;

        let info = store.update_scope(
            &name("acme:api"),
            None,
            None,
            Some(&names(&["kotlin:default"])),
        )?;
        assert_eq!(info.parents, names(&["acme:default", "kotlin:default"]));

        let ancestors = store.ancestors(&name("acme:api"))?;
        assert!(!ancestors.contains(&name("java:default")));
        assert!(ancestors.contains(&name("kotlin:default")));

        let info = store.update_scope(&name("acme:api"), None, None, Some(&[]))?;
        assert_eq!(info.parents, names(&["acme:default"]));
        Ok(())
    }

    #[test]
    fn test_update_scope_cycle_rolls_back() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_scope(&name("acme:a"), "A", &[])?;
        store.create_scope(&name("acme:b"), "B", &names(&["acme:a"]))?;

        let err = store
            .update_scope(&name("acme:a"), Some("renamed"), None, Some(&names(&["acme:b"])))
            .unwrap_err();
        assert!(matches!(err, StoreError::CycleDetected { .. }));

        // neither the rename nor the edge survived
        assert!(store.get_scope(&name("acme:a")).is_ok());
        assert!(store.get_scope(&name("acme:renamed")).is_err());
        Ok(())
    }

    #[test]
    fn test_update_scope_rename_and_errors() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_scope(&name("acme:api"), "API", &[])?;
        store.create_scope(&name("acme:web"), "Web", &[])?;

        let info = store.update_scope(&name("acme:api"), Some("rest"), Some("REST API"), None)?;
        assert_eq!(info.scope, name("acme:rest"));
        assert_eq!(info.description, "REST API");

        let err = store
            .update_scope(&name("acme:rest"), Some("web"), None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));

        let err = store.update_scope(&name("acme:rest"), None, None, None).unwrap_err();
        assert!(matches!(err, StoreError::NoOp(_)));

        let err = store
            .update_scope(&name("acme:rest"), Some("rest"), None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NoOp(_)));
        let err = store
            .update_scope(&name("acme:default"), Some("default"), None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NoOp(_)));

        let info = store.update_scope(&name("acme:rest"), Some("rest"), Some("HTTP"), None)?;
        assert_eq!(info.scope, name("acme:rest"));
        assert_eq!(info.description, "HTTP");

        let err = store
            .update_scope(&name("acme:default"), Some("main"), None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::ProtectedEntity(_)));
        Ok(())
    }

    #[test]
    fn test_delete_scope_recomputes_children() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_scope(&name("acme:mid"), "Mid", &[])?;
        store.create_scope(&name("acme:leaf"), "Leaf", &names(&["acme:mid"]))?;

        let deleted = store.delete_scope(&name("acme:mid"))?;
        assert_eq!(deleted.deleted_knowledge, 0);

        assert_eq!(
            store.ancestors(&name("acme:leaf"))?,
            names(&["acme:leaf", "acme:default", "global:default"])
        );
        Ok(())
    }

    #[test]
    fn test_delete_namespace_cascades_across_namespaces() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_namespace("java", "Java")?;
        store.create_scope(&name("java:spring"), "Spring", &[])?;
        store.create_scope(&name("acme:api"), "API", &names(&["java:spring"]))?;

        let deleted = store.delete_namespace("java")?;
        assert_eq!(deleted.deleted_scopes, 2);

        let info = store.get_scope(&name("acme:api"))?;
        assert_eq!(info.parents, names(&["acme:default"]));
        assert_eq!(
            store.ancestors(&name("acme:api"))?,
            names(&["acme:api", "acme:default", "global:default"])
        );

        let err = store.delete_namespace("global").unwrap_err();
        assert!(matches!(err, StoreError::ProtectedEntity(_)));
        let err = store.delete_namespace("java").unwrap_err();
        assert!(matches!(err, StoreError::UnknownNamespace(_)));
        Ok(())
    }

    #[test]
    fn test_update_namespace() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_namespace("other", "Other")?;
        store.create_scope(&name("acme:api"), "API", &[])?;

        let info = store.update_namespace("acme", Some("acme-corp"), None)?;
        assert_eq!(info.default_scope, name("acme-corp:default"));
        assert!(store.get_scope(&name("acme-corp:api")).is_ok());

        let err = store.update_namespace("acme-corp", Some("other"), None).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));

        let err = store.update_namespace("acme-corp", None, None).unwrap_err();
        assert!(matches!(err, StoreError::NoOp(_)));
        let err = store
            .update_namespace("acme-corp", Some("acme-corp"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NoOp(_)));

        let info = store.update_namespace("acme-corp", Some("acme-corp"), Some("Acme Corp"))?;
        assert_eq!(info.name, "acme-corp");
        assert_eq!(info.description, "Acme Corp");

        let err = store.update_namespace("global", None, Some("x")).unwrap_err();
        assert!(matches!(err, StoreError::ProtectedEntity(_)));
        Ok(())
    }

    #[test]
    fn test_get_namespaces_detail_levels() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme Corp")?;
        store.create_scope(&name("acme:api"), "API", &[])?;

        let short = store.get_namespaces(Some("acme"), DetailLevel::Short)?;
        assert_eq!(short.namespaces.len(), 1);
        let ns = &short.namespaces[0];
        assert!(ns.description.is_none());
        assert_eq!(ns.scopes[0].scope, name("acme:default"));
        assert!(ns.scopes[1].parents.is_none());

        let long = store.get_namespaces(Some("acme"), DetailLevel::Long)?;
        assert_eq!(long.namespaces[0].description.as_deref(), Some("Acme Corp"));
        assert!(long.namespaces[0].scopes[1].parents.is_none());

        let details = store.get_namespaces(None, DetailLevel::Details)?;
        assert_eq!(details.namespaces.len(), 2);
        let acme = details.namespaces.iter().find(|n| n.name == "acme").unwrap();
        assert_eq!(acme.scopes[1].parents, Some(names(&["acme:default"])));

        assert!(matches!(
            store.get_namespaces(Some("missing"), DetailLevel::Short),
            Err(StoreError::UnknownNamespace(_))
        ));
        Ok(())
    }

    #[test]
    fn test_every_scope_reaches_global_default() -> StoreResult<()> {
        let mut store = Store::open_memory()?;
        store.create_namespace("acme", "Acme")?;
        store.create_namespace("java", "Java")?;
        store.create_scope(&name("java:spring"), "Spring", &[])?;
        store.create_scope(&name("acme:a"), "A", &names(&["java:spring"]))?;
        store.create_scope(&name("acme:b"), "B", &names(&["acme:a", "java:default"]))?;
        store.create_scope(&name("global:shared"), "Shared", &[])?;

        let listing = store.get_namespaces(None, DetailLevel::Short)?;
        for ns in listing.namespaces {
            for scope in ns.scopes {
                let ancestors = store.ancestors(&scope.scope)?;
                assert!(
                    ancestors.contains(&ScopeName::global_default()),
                    "{} does not reach global:default",
                    scope.scope
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_detail_level_from_str() {
        assert_eq!("short".parse::<DetailLevel>().unwrap(), DetailLevel::Short);
        assert_eq!("DETAILS".parse::<DetailLevel>().unwrap(), DetailLevel::Details);
        assert!("full".parse::<DetailLevel>().is_err());
    }
}
