//! Search surfaces declared in TOML.
//!
//! ```toml
//! permit = ["name", "age", "nickname"]
//!
//! [aliases]
//! nick = "nickname"
//!
//! [[search]]
//! kind = "in"
//! fields = ["name"]
//!
//! [[search]]
//! kind = "any_of"
//! fields = ["name", "nickname"]
//! field = "called"
//! ```

use crate::definition::{DefinitionBuilder, SearchOptions};
use crate::error::ConfigError;
use crate::query::Query;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Which field-expansion helper a `[[search]]` entry registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// `search_in`
    In,
    /// `search_in_any_of`
    AnyOf,
    /// `search_in_all_of`
    AllOf,
    /// `search_in_specific_fields`
    Specific,
}

/// One `[[search]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchEntry {
    pub kind: SearchKind,
    pub fields: Vec<String>,
    /// Field the term must carry for fan-out kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default = "default_true")]
    pub consume: bool,
    #[serde(default)]
    pub rank: i64,
}

fn default_true() -> bool {
    true
}

/// Declarative search surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Fields allowed in fielded terms; empty permits everything
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permit: Vec<String>,
    /// Typed field -> field seen by rules
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<SearchEntry>,
}

impl SurfaceConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a surface from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            path = ?path,
            permit = config.permit.len(),
            aliases = config.aliases.len(),
            search = config.search.len(),
            "loaded search surface"
        );
        Ok(config)
    }

    /// Register this surface on `builder`
    pub fn apply<Q: Query>(&self, builder: DefinitionBuilder<Q>) -> DefinitionBuilder<Q> {
        let mut builder = builder;
        if !self.permit.is_empty() {
            builder = builder.permit(self.permit.iter().cloned());
        }
        for (field, target) in &self.aliases {
            builder = builder.alias(field.clone(), target.clone());
        }
        for entry in &self.search {
            let mut options = SearchOptions::new().consume(entry.consume).rank(entry.rank);
            if let Some(field) = &entry.field {
                options = options.field(field.clone());
            }
            let fields = entry.fields.iter().cloned();
            builder = match entry.kind {
                SearchKind::In => builder.search_in(fields, options),
                SearchKind::AnyOf => builder.search_in_any_of(fields, options),
                SearchKind::AllOf => builder.search_in_all_of(fields, options),
                SearchKind::Specific => builder.search_in_specific_fields(fields, options),
            };
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_surface() {
        let toml = r#"
permit = ["name", "age"]

[aliases]
nick = "nickname"

[[search]]
kind = "in"
fields = ["name"]

[[search]]
kind = "all_of"
fields = ["iq", "eq"]
field = "smartness"
consume = false
rank = 5
"#;
        let config = SurfaceConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.permit, ["name", "age"]);
        assert_eq!(config.aliases.get("nick").map(String::as_str), Some("nickname"));
        assert_eq!(config.search.len(), 2);
        assert_eq!(config.search[0].kind, SearchKind::In);
        assert!(config.search[0].consume);
        assert_eq!(config.search[1].field.as_deref(), Some("smartness"));
        assert!(!config.search[1].consume);
        assert_eq!(config.search[1].rank, 5);
    }

    #[test]
    fn test_empty_surface() {
        let config = SurfaceConfig::from_toml_str("").unwrap();
        assert_eq!(config, SurfaceConfig::default());
    }

    #[test]
    fn test_unknown_option_key_is_rejected() {
        let toml = r#"
[[search]]
kind = "in"
fields = ["name"]
consme = false
"#;
        let err = SurfaceConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().contains("consme"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml = r#"
[[search]]
kind = "fuzzy"
fields = ["name"]
"#;
        assert!(SurfaceConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = SurfaceConfig {
            permit: vec!["name".into()],
            aliases: BTreeMap::from([("nick".to_string(), "nickname".to_string())]),
            search: vec![SearchEntry {
                kind: SearchKind::AnyOf,
                fields: vec!["name".into(), "nickname".into()],
                field: None,
                consume: true,
                rank: 0,
            }],
        };
        let serialized = toml::to_string(&config).unwrap();
        let parsed = SurfaceConfig::from_toml_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SurfaceConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
