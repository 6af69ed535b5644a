//! Destination catalog collaborators.
//!
//! Only the in-memory implementation lives here; it backs the dry-run runner
//! and the pipeline tests.

use doris_config::CatalogSeed;
use doris_core::{SchemaProperty, TableSchema};

mod mem_catalog;

pub use mem_catalog::MemCatalog;

/// Build an in-memory catalog holding the seeded tables.
///
/// Tables land in the seed's database, or `default_database` when the seed
/// does not name one.
pub fn build_mem_catalog(seed: &CatalogSeed, default_database: &str) -> MemCatalog {
    let database = seed.database.as_deref().unwrap_or(default_database);
    seed.tables
        .iter()
        .fold(MemCatalog::new(), |catalog, (table, table_seed)| {
            let schema = TableSchema {
                keys_type: table_seed.keys_type.clone(),
                properties: table_seed
                    .columns
                    .iter()
                    .map(|c| SchemaProperty {
                        name: c.name.clone(),
                        type_name: c.type_name.clone(),
                        comment: c.comment.clone(),
                    })
                    .collect(),
            };
            catalog.with_table(database, table, schema)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use doris_config::{ColumnSeed, TableSeed};
    use doris_core::CatalogService;

    #[tokio::test]
    async fn seeds_tables_into_default_database() {
        let mut seed = CatalogSeed::default();
        seed.tables.insert(
            "customers".into(),
            TableSeed {
                keys_type: "UNIQUE_KEYS".into(),
                columns: vec![ColumnSeed {
                    name: "id".into(),
                    type_name: "INT".into(),
                    comment: String::new(),
                }],
            },
        );

        let catalog = build_mem_catalog(&seed, "inventory");
        assert!(catalog.table_exists("inventory", "customers").await.unwrap());
        assert!(!catalog.table_exists("other", "customers").await.unwrap());

        let schema = catalog.get_schema("inventory", "customers").await.unwrap();
        assert_eq!(schema.properties.len(), 1);
        assert_eq!(schema.properties[0].name, "id");
    }
}
