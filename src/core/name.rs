//! Name - Qualified scope names
//!
//! Scopes are always referenced externally as `namespace:scope`.
//!
//! # Examples
//! - `global:default` (the universal root)
//! - `acme:default`
//! - `acme:frontend`
//!
//! # Key Points
//! - Both halves are 2-64 chars of lowercase ascii letters, digits and `-`
//! - The string is split on the first `:`
//! - Qualified names are derived at read time, never stored

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};

/// Name of the universal root namespace
pub const GLOBAL_NAMESPACE: &str = "global";

/// Name of the scope every namespace owns
pub const DEFAULT_SCOPE: &str = "default";

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 64;

/// Validate a namespace or scope name
pub fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::invalid_name(name, "name cannot be empty"));
    }

    if name.len() < MIN_LEN || name.len() > MAX_LEN {
        return Err(StoreError::invalid_name(
            name,
            format!("must be {}-{} characters", MIN_LEN, MAX_LEN),
        ));
    }

    let valid = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if !valid {
        return Err(StoreError::invalid_name(
            name,
            "only lowercase letters, numbers and hyphens are allowed",
        ));
    }

    Ok(())
}

/// A qualified scope name (`namespace:scope`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeName {
    namespace: String,
    scope: String,
}

impl ScopeName {
    /// Parse a qualified scope name
    ///
    /// # Examples
    /// ```
    /// use kaizen::core::name::ScopeName;
    ///
    /// let name = ScopeName::parse("acme:frontend").unwrap();
    /// assert_eq!(name.namespace(), "acme");
    /// assert_eq!(name.scope(), "frontend");
    /// ```
    pub fn parse(s: &str) -> StoreResult<Self> {
        let s = s.trim();

        let (namespace, scope) = s.split_once(':').ok_or_else(|| {
            StoreError::invalid_name(s, "expected format 'namespace:scope'")
        })?;

        validate_name(namespace)?;
        validate_name(scope)?;

        Ok(Self {
            namespace: namespace.to_string(),
            scope: scope.to_string(),
        })
    }

    /// Build from already-validated parts
    pub fn new(namespace: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            scope: scope.into(),
        }
    }

    /// The default scope of a namespace
    pub fn default_of(namespace: &str) -> Self {
        Self::new(namespace, DEFAULT_SCOPE)
    }

    /// `global:default`
    pub fn global_default() -> Self {
        Self::default_of(GLOBAL_NAMESPACE)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Is this the `default` scope of its namespace
    pub fn is_default(&self) -> bool {
        self.scope == DEFAULT_SCOPE
    }

    /// Is this `global:default`
    pub fn is_global_default(&self) -> bool {
        self.is_default() && self.namespace == GLOBAL_NAMESPACE
    }
}

impl fmt::Display for ScopeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.scope)
    }
}

impl FromStr for ScopeName {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        ScopeName::parse(s)
    }
}

impl TryFrom<&str> for ScopeName {
    type Error = StoreError;

    fn try_from(s: &str) -> StoreResult<Self> {
        ScopeName::parse(s)
    }
}

impl TryFrom<String> for ScopeName {
    type Error = StoreError;

    fn try_from(s: String) -> StoreResult<Self> {
        ScopeName::parse(&s)
    }
}

impl From<ScopeName> for String {
    fn from(name: ScopeName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let name = ScopeName::parse("acme:frontend").unwrap();
        assert_eq!(name.namespace(), "acme");
        assert_eq!(name.scope(), "frontend");
        assert!(!name.is_default());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let name = ScopeName::parse("  acme:api-v2 ").unwrap();
        assert_eq!(name.to_string(), "acme:api-v2");
    }

    #[test]
    fn test_missing_colon() {
        let err = ScopeName::parse("acme").unwrap_err();
        assert!(matches!(err, StoreError::InvalidName { .. }));
    }

    #[test]
    fn test_splits_on_first_colon() {
        // "front:end" is not a valid scope name
        assert!(ScopeName::parse("acme:front:end").is_err());
    }

    #[test]
    fn test_invalid_characters() {
        assert!(ScopeName::parse("Acme:frontend").is_err());
        assert!(ScopeName::parse("acme:front end").is_err());
        assert!(ScopeName::parse("acme:front_end").is_err());
        assert!(ScopeName::parse("acme:").is_err());
    }

    #[test]
    fn test_length_limits() {
        assert!(validate_name("a").is_err());
        assert!(validate_name("ab").is_ok());
        assert!(validate_name(&"a".repeat(64)).is_ok());
        assert!(validate_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_defaults() {
        let global = ScopeName::global_default();
        assert!(global.is_default());
        assert!(global.is_global_default());
        assert_eq!(global.to_string(), "global:default");

        let acme = ScopeName::default_of("acme");
        assert!(acme.is_default());
        assert!(!acme.is_global_default());
    }

    #[test]
    fn test_from_str_and_serde() {
        let name: ScopeName = "acme:backend".parse().unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"acme:backend\"");

        let back: ScopeName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);

        assert!(serde_json::from_str::<ScopeName>("\"nocolon\"").is_err());
    }
}
