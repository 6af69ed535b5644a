use std::borrow::Cow;
use std::io;
use thiserror::Error;

use crate::SchemaType;

/// Failures while transforming one record into a row payload.
///
/// Every variant names the topic or table it happened on so an operator can
/// act on the message alone. None of them are retried inside the pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to decode record from topic {topic} at offset {offset}: {details}")]
    Decode {
        topic: String,
        offset: i64,
        details: Cow<'static, str>,
    },

    #[error(
        "unsupported record category {category} on topic {topic}; exclude the schema change topic from `topics` or `topics_regex`"
    )]
    UnsupportedCategory { topic: String, category: String },

    #[error("cannot resolve destination table for topic {topic}: {details}")]
    TableName {
        topic: String,
        details: Cow<'static, str>,
    },

    #[error("table {database}.{table} does not exist, please create it manually")]
    MissingTable { database: String, table: String },

    #[error(
        "cannot alter table {table} because schema evolution is disabled (missing columns: {})",
        .fields.join(", ")
    )]
    SchemaEvolutionDisabled { table: String, fields: Vec<String> },

    #[error("failed to add column {column} to table {table}: {source}")]
    SchemaChange {
        table: String,
        column: String,
        #[source]
        source: CatalogError,
    },

    #[error("failed to read catalog for table {table}: {source}")]
    Catalog {
        table: String,
        #[source]
        source: CatalogError,
    },

    #[error("failed to process {shape} record from topic {topic}: {details}")]
    DataFormat {
        topic: String,
        shape: &'static str,
        details: Cow<'static, str>,
    },
}

impl ConvertError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Decode { .. } => "decode",
            ConvertError::UnsupportedCategory { .. } => "unsupported_category",
            ConvertError::TableName { .. } => "table_name",
            ConvertError::MissingTable { .. } => "missing_table",
            ConvertError::SchemaEvolutionDisabled { .. } => {
                "schema_evolution_disabled"
            }
            ConvertError::SchemaChange { .. } => "schema_change",
            ConvertError::Catalog { .. } => "catalog",
            ConvertError::DataFormat { .. } => "data_format",
        }
    }
}

/// Errors reported by the destination catalog and DDL collaborators.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("connection error: {details}")]
    Connect { details: Cow<'static, str> },

    #[error("table not found: {details}")]
    NotFound { details: Cow<'static, str> },

    #[error("statement rejected: {details}")]
    Rejected { details: Cow<'static, str> },

    #[error("malformed catalog response: {0}")]
    Response(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A record payload that does not agree with its declared Connect schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] serde_json::Error),

    #[error("expected a struct schema, found {found:?}")]
    NotAStruct { found: SchemaType },

    #[error("field {field}: expected {expected:?}, found {found}")]
    TypeMismatch {
        field: String,
        expected: SchemaType,
        found: &'static str,
    },

    #[error("field {field} is required but has no value and no default")]
    MissingRequired { field: String },

    #[error("unknown field {field}")]
    UnknownField { field: String },

    #[error("field {field}: invalid decimal: {details}")]
    Decimal {
        field: String,
        details: Cow<'static, str>,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("backpressure: {details}")]
    Backpressure { details: Cow<'static, str> },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SinkError {
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::Io(_) => "io error",
            SinkError::Backpressure { .. } => "backpressure",
            SinkError::Other(_) => "other error",
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
pub type SinkResult<T> = std::result::Result<T, SinkError>;
