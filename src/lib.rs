//! kaizen - Scoped knowledge store for AI agents
//!
//! Knowledge entries live in scopes. Scopes belong to namespaces and inherit
//! from any number of parent scopes, across namespaces, forming a DAG rooted
//! at `global:default`. A search from a scope sees everything its ancestors
//! see, minus entries suppressed by a conflict record.
//!
//! ## Key Concepts
//!
//! - **Qualified scope names**: `namespace:scope`, e.g. `acme:backend`
//! - **Ancestor cache**: each scope's flattened ancestor set, recomputed on
//!   every edge change so search never walks the graph
//! - **Conflict ledger**: one entry wins, the others disappear everywhere
//! - **Active-knowledge view**: the conflict-filtered projection search reads
//! - **Multi-term search**: independent terms, best score per entry wins

pub mod cli;
pub mod config;
pub mod core;

pub use crate::core::error::{StoreError, StoreResult};
pub use crate::core::knowledge::{Complexity, Knowledge, KnowledgeUpdate, NewKnowledge};
pub use crate::core::name::ScopeName;
pub use crate::core::search::{SearchHit, SearchHits, SearchRequest, SearchSettings};
pub use crate::core::storage::Store;
