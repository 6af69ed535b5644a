//! Doris Connect Core Types
//!
//! Record model, destination table metadata and the collaborator traits the
//! transformation pipeline talks to. Records follow the Connect data model:
//! a topic/partition/offset coordinate, an optional key and a value that is
//! either a schema-ful [`Struct`] or a schemaless JSON shape.

use std::sync::Arc;

use async_trait::async_trait;

pub mod catalog;
pub mod errors;
pub mod record;
pub mod schema;

pub use catalog::{
    ColumnDef, ColumnDescriptor, SchemaProperty, TableDescriptor, TableSchema,
};
pub use errors::{
    CatalogError, CatalogResult, ConvertError, ConvertResult, SchemaError,
    SinkError, SinkResult,
};
pub use record::{RecordValue, SinkRecord};
pub use schema::{ConnectField, ConnectSchema, SchemaType, Struct};

// ============================================================================
// Record categories
// ============================================================================

/// Debezium change events carry a value schema whose name contains this.
pub const ENVELOPE_MARKER: &str = "Envelope";

/// Debezium schema change events carry a value schema whose name contains this.
pub const SCHEMA_CHANGE_MARKER: &str = "SchemaChangeValue";

// ============================================================================
// Traits
// ============================================================================

/// Read access to the destination store's system catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn table_exists(&self, database: &str, table: &str)
    -> CatalogResult<bool>;

    async fn get_schema(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<TableSchema>;
}

/// Applies schema alterations to destination tables.
#[async_trait]
pub trait SchemaChangeService: Send + Sync {
    async fn add_column(
        &self,
        database: &str,
        table: &str,
        column: &ColumnDef,
    ) -> CatalogResult<()>;
}

/// Accepts finished row payloads for delivery.
#[async_trait]
pub trait RowSink: Send + Sync {
    fn id(&self) -> &str;

    /// `payload` is one row, or several rows joined by the line separator.
    async fn write(&self, table: &str, payload: &str) -> SinkResult<()>;
}

pub type ArcDynCatalog = Arc<dyn CatalogService>;
pub type ArcDynSchemaChange = Arc<dyn SchemaChangeService>;
pub type ArcDynRowSink = Arc<dyn RowSink>;
