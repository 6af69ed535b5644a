use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use thiserror::Error;
use tracing::error;

mod catalog_seed;
mod topic_cfg;

pub use catalog_seed::{CatalogSeed, ColumnSeed, TableSeed, load_catalog_seed};
pub use topic_cfg::{is_valid_table_identifier, parse_topic_to_table_map};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("expanding environment in {path}: {details}")]
    Env { path: String, details: String },

    #[error("parsing yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid topic2table map: {details}")]
    TopicMap { details: String },

    #[error("failed to get table name from topic {topic:?}")]
    TableName { topic: String },

    #[error(
        "connector configuration is missing required values or has wrong input values: {}",
        .problems.join("; ")
    )]
    Invalid { problems: Vec<String> },
}

/// How struct records are converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterMode {
    /// Struct values are rendered as plain JSON.
    #[default]
    Normal,
    /// Debezium change events: rows are extracted from before/after and the
    /// destination schema is kept in sync.
    DebeziumIngestion,
}

impl ConverterMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConverterMode::Normal => "normal",
            ConverterMode::DebeziumIngestion => "debezium_ingestion",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaEvolutionMode {
    /// Missing destination columns are an error.
    #[default]
    None,
    /// Missing destination columns are added.
    Basic,
}

/// Delete marker column injected into every change-event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteSignCfg {
    pub field: String,
    pub true_value: String,
    pub false_value: String,
}

impl Default for DeleteSignCfg {
    fn default() -> Self {
        Self {
            field: "__DORIS_DELETE_SIGN__".to_string(),
            true_value: "1".to_string(),
            false_value: "0".to_string(),
        }
    }
}

/// Sink connector configuration.
///
/// # Example
///
/// ```yaml
/// name: doris-sink
/// topics: [mysql_db.inventory.customers]
/// database: inventory
/// converter_mode: debezium_ingestion
/// schema_evolution: basic
/// topic2table: "mysql_db.inventory.customers:customers"
/// delete_sign:
///   field: __DORIS_DELETE_SIGN__
///   true_value: "1"
///   false_value: "0"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorCfg {
    /// Unique connector name.
    pub name: String,

    /// Explicit topic list. Mutually exclusive with `topics_regex`.
    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub topics_regex: Option<String>,

    /// Destination database.
    pub database: String,

    #[serde(default)]
    pub converter_mode: ConverterMode,

    #[serde(default)]
    pub schema_evolution: SchemaEvolutionMode,

    #[serde(default)]
    pub delete_sign: DeleteSignCfg,

    /// Separator between rows of one load payload.
    #[serde(default = "default_line_separator")]
    pub line_separator: String,

    /// Topic to table overrides, either a map or the compact
    /// `topic1:table1,topic2:table2` form.
    #[serde(default, deserialize_with = "topic_cfg::deserialize_topic_map")]
    pub topic2table: BTreeMap<String, String>,
}

fn default_line_separator() -> String {
    "\n".to_string()
}

impl ConnectorCfg {
    /// Minimal configuration for `database`, everything else defaulted.
    pub fn new(name: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topics: Vec::new(),
            topics_regex: None,
            database: database.into(),
            converter_mode: ConverterMode::default(),
            schema_evolution: SchemaEvolutionMode::default(),
            delete_sign: DeleteSignCfg::default(),
            line_separator: default_line_separator(),
            topic2table: BTreeMap::new(),
        }
    }

    /// Check every option; all problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.name.is_empty() || !is_valid_connector_name(&self.name) {
            problems.push(format!(
                "name {:?} is empty or invalid, expected [A-Za-z0-9_-]+",
                self.name
            ));
        }

        let has_regex = self.topics_regex.as_deref().is_some_and(|r| !r.is_empty());
        match (self.topics.is_empty(), has_regex) {
            (true, false) => {
                problems.push("topics or topics_regex cannot be empty".to_string())
            }
            (false, true) => problems.push(
                "topics and topics_regex cannot be set at the same time".to_string(),
            ),
            _ => {}
        }

        if self.database.trim().is_empty() {
            problems.push("database cannot be empty".to_string());
        }
        if self.delete_sign.field.trim().is_empty() {
            problems.push("delete_sign.field cannot be empty".to_string());
        }
        if self.line_separator.is_empty() {
            problems.push("line_separator cannot be empty".to_string());
        }
        for (topic, table) in &self.topic2table {
            if topic.trim().is_empty() || table.trim().is_empty() {
                problems.push(format!("topic2table entry {topic:?}:{table:?} is invalid"));
            }
        }

        if problems.is_empty() {
            return Ok(());
        }
        for p in &problems {
            error!(connector = %self.name, problem = %p, "invalid configuration");
        }
        Err(ConfigError::Invalid { problems })
    }

    /// Destination table for `topic`.
    ///
    /// An explicit `topic2table` entry wins; otherwise the topic itself when
    /// it is a valid table identifier, otherwise the last segment of a
    /// dotted `server.db.table` topic.
    pub fn table_for_topic(&self, topic: &str) -> Result<String, ConfigError> {
        if topic.is_empty() {
            return Err(ConfigError::TableName {
                topic: topic.to_string(),
            });
        }
        if let Some(table) = self.topic2table.get(topic) {
            return Ok(table.clone());
        }
        if is_valid_table_identifier(topic) {
            return Ok(topic.to_string());
        }
        match topic.rsplit('.').next() {
            Some(last) if topic.contains('.') && !last.is_empty() => {
                Ok(last.to_string())
            }
            _ => Err(ConfigError::TableName {
                topic: topic.to_string(),
            }),
        }
    }
}

fn is_valid_connector_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn load_from_path(file_path: &str) -> Result<ConnectorCfg, ConfigError> {
    let raw = read_expanded(file_path)?;
    let cfg: ConnectorCfg = serde_yaml::from_str(&raw)?;
    Ok(cfg)
}

/// Read `file_path` and expand `${VAR}` references.
pub(crate) fn read_expanded(file_path: &str) -> Result<String, ConfigError> {
    let raw = fs::read_to_string(file_path).map_err(|source| ConfigError::Io {
        path: file_path.to_string(),
        source,
    })?;
    let expanded = shellexpand::env(&raw).map_err(|e| ConfigError::Env {
        path: file_path.to_string(),
        details: e.to_string(),
    })?;
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ConnectorCfg {
        let mut cfg = ConnectorCfg::new("doris-sink", "inventory");
        cfg.topics = vec!["orders".into()];
        cfg
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = cfg();
        assert_eq!(cfg.converter_mode, ConverterMode::Normal);
        assert_eq!(cfg.schema_evolution, SchemaEvolutionMode::None);
        assert_eq!(cfg.delete_sign.field, "__DORIS_DELETE_SIGN__");
        assert_eq!(cfg.delete_sign.true_value, "1");
        assert_eq!(cfg.delete_sign.false_value, "0");
        assert_eq!(cfg.line_separator, "\n");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn table_name_resolution() {
        let mut cfg = cfg();
        cfg.topic2table.insert("a.b.c".into(), "mapped".into());

        assert_eq!(cfg.table_for_topic("a.b.c").unwrap(), "mapped");
        assert_eq!(cfg.table_for_topic("orders").unwrap(), "orders");
        assert_eq!(
            cfg.table_for_topic("mysql_db.inventory.customers").unwrap(),
            "customers"
        );
        assert!(matches!(
            cfg.table_for_topic("1-bad-topic"),
            Err(ConfigError::TableName { .. })
        ));
        assert!(cfg.table_for_topic("").is_err());
        assert!(cfg.table_for_topic("trailing.").is_err());
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut cfg = ConnectorCfg::new("bad name!", "");
        cfg.line_separator = String::new();

        let err = cfg.validate().unwrap_err();
        match err {
            ConfigError::Invalid { problems } => assert_eq!(problems.len(), 4),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn topics_and_regex_are_exclusive() {
        let mut cfg = cfg();
        cfg.topics_regex = Some("orders.*".into());
        assert!(cfg.validate().is_err());

        cfg.topics.clear();
        assert!(cfg.validate().is_ok());
    }
}
