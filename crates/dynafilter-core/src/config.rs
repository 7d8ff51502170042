//! DynaFilter configuration.
//!
//! Provides [`DynaFilterConfig`] and the per-table [`KeySchemaRegistry`] the
//! planner consults. Configuration can be built in code or loaded from
//! environment variables via [`DynaFilterConfig::from_env`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::planner::KeySchema;

/// Invalid configuration input.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Key-schema JSON could not be decoded.
    #[error("invalid key schemas in {origin}: {source}")]
    InvalidKeySchemas {
        /// Where the JSON came from.
        origin: String,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },
    /// The key-schema file could not be read.
    #[error("failed to read key schema file {}: {source}", path.display())]
    ReadKeySchemaFile {
        /// The file path.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },
    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Table name to key schema.
///
/// A table without an entry has no schema, which makes every field
/// key-eligible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySchemaRegistry(BTreeMap<String, KeySchema>);

impl KeySchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a table's schema, builder style.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>, schema: KeySchema) -> Self {
        self.insert(table, schema);
        self
    }

    /// Add or replace a table's schema.
    pub fn insert(&mut self, table: impl Into<String>, schema: KeySchema) {
        self.0.insert(table.into(), schema);
    }

    /// The schema registered for `table`.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&KeySchema> {
        self.0.get(table)
    }

    /// Number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no table is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode `{"table": ["pk", "sk"], ...}`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidKeySchemas`] if the text is not such an object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::decode(json, "inline JSON")
    }

    /// Read and decode a key-schema file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ReadKeySchemaFile`] or [`ConfigError::InvalidKeySchemas`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadKeySchemaFile {
            path: path.to_owned(),
            source,
        })?;
        Self::decode(&text, &path.display().to_string())
    }

    fn decode(json: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::InvalidKeySchemas {
            origin: origin.to_owned(),
            source,
        })
    }

    fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }
}

/// Filter query configuration.
///
/// # Examples
///
/// ```
/// use dynafilter_core::{DynaFilterConfig, KeySchema, KeySchemaRegistry};
///
/// let config = DynaFilterConfig::builder()
///     .key_schemas(KeySchemaRegistry::new().with_table("users", KeySchema::new(["id"])))
///     .page_limit(Some(50))
///     .build();
/// assert!(config.key_schemas.get("users").is_some());
/// assert!(!config.consistent_read);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct DynaFilterConfig {
    /// Key schema per table.
    #[builder(default)]
    #[serde(default)]
    pub key_schemas: KeySchemaRegistry,

    /// `Limit` sent with every backend call; `None` leaves paging to the
    /// backend.
    #[builder(default)]
    #[serde(default)]
    pub page_limit: Option<i32>,

    /// Request strongly consistent reads.
    #[builder(default = false)]
    #[serde(default)]
    pub consistent_read: bool,
}

impl DynaFilterConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `DYNAFILTER_KEY_SCHEMA_FILE` | path to a key-schema JSON file |
    /// | `DYNAFILTER_KEY_SCHEMAS` | inline key-schema JSON; overrides file entries |
    /// | `DYNAFILTER_PAGE_LIMIT` | positive per-call `Limit` |
    /// | `DYNAFILTER_CONSISTENT_READ` | `1`/`true` for consistent reads |
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if any variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if any variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("DYNAFILTER_KEY_SCHEMA_FILE") {
            config.key_schemas = KeySchemaRegistry::from_file(path)?;
        }
        if let Some(json) = lookup("DYNAFILTER_KEY_SCHEMAS") {
            config
                .key_schemas
                .extend(KeySchemaRegistry::decode(&json, "DYNAFILTER_KEY_SCHEMAS")?);
        }
        if let Some(v) = lookup("DYNAFILTER_PAGE_LIMIT") {
            let limit = v
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "DYNAFILTER_PAGE_LIMIT",
                    value: v.clone(),
                })?;
            config.page_limit = Some(limit);
        }
        if let Some(v) = lookup("DYNAFILTER_CONSISTENT_READ") {
            config.consistent_read = parse_bool(&v);
        }

        Ok(config)
    }

    /// The key schema for `table`, if one is registered.
    #[must_use]
    pub fn key_schema(&self, table: &str) -> Option<&KeySchema> {
        self.key_schemas.get(table)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_should_create_default_config() {
        let config = DynaFilterConfig::default();
        assert!(config.key_schemas.is_empty());
        assert_eq!(config.page_limit, None);
        assert!(!config.consistent_read);
    }

    #[test]
    fn test_should_load_from_lookup() {
        let config = DynaFilterConfig::from_lookup(lookup(&[
            ("DYNAFILTER_KEY_SCHEMAS", r#"{"users": ["id"], "orders": ["customer", "order"]}"#),
            ("DYNAFILTER_PAGE_LIMIT", "25"),
            ("DYNAFILTER_CONSISTENT_READ", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.key_schema("users"), Some(&KeySchema::new(["id"])));
        assert_eq!(
            config.key_schema("orders").unwrap().attributes(),
            ["customer", "order"]
        );
        assert!(config.key_schema("missing").is_none());
        assert_eq!(config.page_limit, Some(25));
        assert!(config.consistent_read);
    }

    #[test]
    fn test_should_reject_invalid_page_limit() {
        let err = DynaFilterConfig::from_lookup(lookup(&[("DYNAFILTER_PAGE_LIMIT", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "DYNAFILTER_PAGE_LIMIT",
                ..
            }
        ));
    }

    #[test]
    fn test_should_reject_malformed_key_schema_json() {
        let err = DynaFilterConfig::from_lookup(lookup(&[("DYNAFILTER_KEY_SCHEMAS", "[1, 2]")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKeySchemas { .. }));
    }

    #[test]
    fn test_should_merge_file_and_inline_schemas() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"users": ["id"], "orders": ["customer"]}}"#).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = DynaFilterConfig::from_lookup(lookup(&[
            ("DYNAFILTER_KEY_SCHEMA_FILE", path.as_str()),
            ("DYNAFILTER_KEY_SCHEMAS", r#"{"orders": ["customer", "order"]}"#),
        ]))
        .unwrap();

        assert_eq!(config.key_schemas.len(), 2);
        assert_eq!(config.key_schema("orders").unwrap().attributes().len(), 2);
    }

    #[test]
    fn test_should_report_missing_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KeySchemaRegistry::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadKeySchemaFile { .. }));
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = DynaFilterConfig::builder()
            .page_limit(Some(10))
            .consistent_read(true)
            .build();
        assert_eq!(config.page_limit, Some(10));
        assert!(config.consistent_read);
        assert!(config.key_schemas.is_empty());
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = DynaFilterConfig::builder()
            .key_schemas(KeySchemaRegistry::new().with_table("users", KeySchema::new(["id"])))
            .build();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keySchemas": {"users": ["id"]},
                "pageLimit": null,
                "consistentRead": false,
            })
        );
    }
}
