use async_trait::async_trait;
use doris_core::{
    CatalogError, CatalogResult, CatalogService, ColumnDef, SchemaChangeService,
    TableSchema,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

type TableKey = (String, String);

/// Catalog and DDL service over an in-process table map.
///
/// Every call is counted so callers can assert on cache behaviour.
#[derive(Default)]
pub struct MemCatalog {
    tables: RwLock<HashMap<TableKey, TableSchema>>,
    ddl: RwLock<Vec<String>>,
    failing_columns: HashSet<String>,
    exists_calls: AtomicUsize,
    schema_calls: AtomicUsize,
    add_column_calls: AtomicUsize,
}

impl MemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(
        mut self,
        database: &str,
        table: &str,
        schema: TableSchema,
    ) -> Self {
        self.tables
            .get_mut()
            .insert((database.to_string(), table.to_string()), schema);
        self
    }

    /// Make `add_column` reject the named column.
    pub fn fail_on_column(mut self, column: &str) -> Self {
        self.failing_columns.insert(column.to_string());
        self
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }

    pub fn add_column_calls(&self) -> usize {
        self.add_column_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.exists_calls() + self.schema_calls() + self.add_column_calls()
    }

    /// Statements applied so far, in order.
    pub async fn executed_ddl(&self) -> Vec<String> {
        self.ddl.read().await.clone()
    }

    /// Current column names of a table, in column order.
    pub async fn columns(&self, database: &str, table: &str) -> Option<Vec<String>> {
        let tables = self.tables.read().await;
        tables
            .get(&(database.to_string(), table.to_string()))
            .map(|s| s.properties.iter().map(|p| p.name.clone()).collect())
    }
}

#[async_trait]
impl CatalogService for MemCatalog {
    async fn table_exists(&self, database: &str, table: &str) -> CatalogResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().await;
        Ok(tables.contains_key(&(database.to_string(), table.to_string())))
    }

    async fn get_schema(
        &self,
        database: &str,
        table: &str,
    ) -> CatalogResult<TableSchema> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().await;
        tables
            .get(&(database.to_string(), table.to_string()))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                details: format!("{database}.{table}").into(),
            })
    }
}

#[async_trait]
impl SchemaChangeService for MemCatalog {
    async fn add_column(
        &self,
        database: &str,
        table: &str,
        column: &ColumnDef,
    ) -> CatalogResult<()> {
        self.add_column_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_columns.contains(&column.name) {
            return Err(CatalogError::Rejected {
                details: format!("column {} refused", column.name).into(),
            });
        }

        let mut tables = self.tables.write().await;
        let schema = tables
            .get_mut(&(database.to_string(), table.to_string()))
            .ok_or_else(|| CatalogError::NotFound {
                details: format!("{database}.{table}").into(),
            })?;
        if schema.properties.iter().any(|p| p.name == column.name) {
            return Err(CatalogError::Rejected {
                details: format!("duplicate column name '{}'", column.name).into(),
            });
        }
        schema.properties.push(column.to_property());

        let ddl = column.to_ddl(database, table);
        debug!(%ddl, "applied schema change");
        self.ddl.write().await.push(ddl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doris_core::SchemaProperty;

    fn catalog() -> MemCatalog {
        MemCatalog::new().with_table(
            "db",
            "t",
            TableSchema {
                keys_type: "UNIQUE_KEYS".into(),
                properties: vec![SchemaProperty::new("id", "INT")],
            },
        )
    }

    fn column(name: &str) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            type_name: "STRING".into(),
            comment: None,
        }
    }

    #[tokio::test]
    async fn add_column_updates_schema_and_logs_ddl() {
        let catalog = catalog();
        catalog.add_column("db", "t", &column("name")).await.unwrap();

        assert_eq!(
            catalog.columns("db", "t").await.unwrap(),
            vec!["id".to_string(), "name".to_string()]
        );
        assert_eq!(
            catalog.executed_ddl().await,
            vec!["ALTER TABLE `db`.`t` ADD COLUMN `name` STRING".to_string()]
        );
        assert_eq!(catalog.add_column_calls(), 1);
    }

    #[tokio::test]
    async fn rejects_duplicate_and_unknown_tables() {
        let catalog = catalog();
        assert!(matches!(
            catalog.add_column("db", "t", &column("id")).await,
            Err(CatalogError::Rejected { .. })
        ));
        assert!(matches!(
            catalog.add_column("db", "missing", &column("x")).await,
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.get_schema("db", "missing").await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn injected_failure_leaves_table_untouched() {
        let catalog = catalog().fail_on_column("bad");
        assert!(catalog.add_column("db", "t", &column("bad")).await.is_err());
        assert_eq!(catalog.columns("db", "t").await.unwrap(), vec!["id".to_string()]);
        assert!(catalog.executed_ddl().await.is_empty());
    }
}
