//! Core module - Business logic
//!
//! The store and everything it owns: scope graph, knowledge, conflict
//! ledger, the active-knowledge view and search over it.

pub mod conflict;
pub mod error;
pub mod graph;
pub mod knowledge;
pub mod name;
pub mod query;
pub mod search;
pub mod storage;
pub mod view;
