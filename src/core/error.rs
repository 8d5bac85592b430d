//! Error - Failure kinds surfaced by the store
//!
//! Every variant carries the offending identifier so a caller (usually an
//! AI agent) can inspect existing namespaces/scopes and retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("name already exists: {0}")]
    DuplicateName(String),

    #[error("namespace not found: {0}")]
    UnknownNamespace(String),

    #[error("scope not found: {0}")]
    UnknownScope(String),

    #[error("parent scope not found: {0}")]
    UnknownParent(String),

    #[error("knowledge entry not found: {0}")]
    UnknownKnowledge(String),

    #[error("adding parent {parent} to {child} would create a cycle")]
    CycleDetected { child: String, parent: String },

    #[error("protected entity: {0}")]
    ProtectedEntity(String),

    #[error("knowledge entry {0} cannot suppress itself")]
    SelfConflict(String),

    #[error("nothing to update for {0}")]
    NoOp(String),

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
