//! Keeps destination tables in step with the fields records carry.

use std::sync::Arc;
use std::time::Instant;

use doris_config::SchemaEvolutionMode;
use doris_core::{
    ArcDynCatalog, ArcDynSchemaChange, ConvertError, ConvertResult, TableDescriptor,
};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::descriptor::{FieldDescriptor, RecordDescriptor};
use crate::table_cache::{CachedTable, TableCache};

pub struct SchemaCoordinator {
    database: String,
    mode: SchemaEvolutionMode,
    catalog: ArcDynCatalog,
    schema_change: ArcDynSchemaChange,
    cache: TableCache,
}

impl SchemaCoordinator {
    pub fn new(
        database: impl Into<String>,
        mode: SchemaEvolutionMode,
        catalog: ArcDynCatalog,
        schema_change: ArcDynSchemaChange,
    ) -> Self {
        Self {
            database: database.into(),
            mode,
            catalog,
            schema_change,
            cache: TableCache::new(),
        }
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Make sure `table` has a column for every field of `record`.
    ///
    /// Missing columns are added in record order when evolution is enabled,
    /// after which the table is fetched again and the cached entry replaced.
    /// If any addition fails the cached entry is left as it was, even though
    /// the destination may already carry the columns added before the
    /// failure. Returns the descriptor the record was checked against.
    pub async fn ensure_schema(
        &self,
        table: &str,
        record: &RecordDescriptor,
    ) -> ConvertResult<Arc<TableDescriptor>> {
        let mut slot = self.cache.lock(table).await;

        if slot.is_none() {
            let exists = self
                .catalog
                .table_exists(&self.database, table)
                .await
                .map_err(|source| ConvertError::Catalog {
                    table: table.to_string(),
                    source,
                })?;
            if !exists {
                warn!(database = %self.database, table = %table, "table does not exist, please create it manually");
                return Err(ConvertError::MissingTable {
                    database: self.database.clone(),
                    table: table.to_string(),
                });
            }
            *slot = Some(CachedTable::Unloaded);
        }

        let cached = match slot.as_ref() {
            Some(CachedTable::Loaded(descriptor)) => Some(descriptor.clone()),
            _ => None,
        };
        let current = match cached {
            Some(descriptor) => {
                debug!(table = %table, "table schema cache hit");
                descriptor
            }
            None => {
                let descriptor = self.load(table).await?;
                *slot = Some(CachedTable::Loaded(descriptor.clone()));
                descriptor
            }
        };

        let missing: Vec<&FieldDescriptor> = record
            .fields()
            .filter(|f| !current.has_column(f.name()))
            .collect();
        if missing.is_empty() {
            return Ok(current);
        }

        let names: Vec<String> = missing.iter().map(|f| f.name().to_string()).collect();
        info!(table = %table, missing = ?names, "found missing columns");

        if self.mode == SchemaEvolutionMode::None {
            warn!(table = %table, "table cannot be altered because schema evolution is disabled");
            return Err(ConvertError::SchemaEvolutionDisabled {
                table: table.to_string(),
                fields: names,
            });
        }

        for field in missing {
            let column = field.column_def();
            self.schema_change
                .add_column(&self.database, table, &column)
                .await
                .map_err(|source| ConvertError::SchemaChange {
                    table: table.to_string(),
                    column: column.name.clone(),
                    source,
                })?;
            counter!("doris_schema_columns_added_total", "table" => table.to_string())
                .increment(1);
            info!(table = %table, column = %column.name, column_type = %column.type_name, "added column");
        }

        let refreshed = self.load(table).await?;
        *slot = Some(CachedTable::Loaded(refreshed.clone()));
        Ok(refreshed)
    }

    async fn load(&self, table: &str) -> ConvertResult<Arc<TableDescriptor>> {
        let t0 = Instant::now();
        let schema = self
            .catalog
            .get_schema(&self.database, table)
            .await
            .map_err(|source| ConvertError::Catalog {
                table: table.to_string(),
                source,
            })?;
        let descriptor = Arc::new(TableDescriptor::from_schema(table, &schema));
        counter!("doris_table_schema_loads_total").increment(1);

        let elapsed = t0.elapsed();
        if elapsed.as_millis() > 200 {
            warn!(table = %table, ms = elapsed.as_millis(), "slow table schema load");
        } else {
            debug!(table = %table, columns = descriptor.columns.len(), ms = elapsed.as_millis(), "table schema loaded");
        }
        Ok(descriptor)
    }
}
