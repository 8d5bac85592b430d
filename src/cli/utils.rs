//! CLI utility functions
//!
//! Shared by the command handlers:
//! - Store access with the loaded config
//! - Knowledge id parsing
//! - JSON printing

use anyhow::{anyhow, Result};
use serde::Serialize;
use ulid::Ulid;

use super::OutputFormat;
use crate::config::Config;
use crate::core::storage::Store;

/// What every handler gets from `main`
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: Config, format: OutputFormat) -> Self {
        Self { config, format }
    }

    pub fn open_store(&self) -> Result<Store> {
        self.config.open_store()
    }

    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Parse a knowledge id (ULID)
pub fn parse_id(raw: &str) -> Result<Ulid> {
    Ulid::from_string(raw.trim()).map_err(|_| anyhow!("Invalid knowledge id: {}", raw))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
