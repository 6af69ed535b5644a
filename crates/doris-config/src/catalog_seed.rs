use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ConfigError, read_expanded};

/// Destination tables preloaded into the in-memory catalog.
///
/// # Example
///
/// ```yaml
/// tables:
///   customers:
///     keys_type: UNIQUE_KEYS
///     columns:
///       - name: id
///         type: INT
///       - name: name
///         type: VARCHAR(765)
///         comment: display name
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    /// Database the tables live in; the connector database when absent.
    pub database: Option<String>,
    pub tables: BTreeMap<String, TableSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSeed {
    #[serde(default = "default_keys_type")]
    pub keys_type: String,
    #[serde(default)]
    pub columns: Vec<ColumnSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSeed {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub comment: String,
}

fn default_keys_type() -> String {
    "UNIQUE_KEYS".to_string()
}

pub fn load_catalog_seed(file_path: &str) -> Result<CatalogSeed, ConfigError> {
    let raw = read_expanded(file_path)?;
    let seed: CatalogSeed = serde_yaml::from_str(&raw)?;
    Ok(seed)
}
