//! Destination table metadata, as reported by the store's system catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A column as reported by the destination store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub column_name: String,
    pub type_name: String,
    #[serde(default)]
    pub comment: String,
}

/// Last fetched view of a destination table. May be stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table_name: String,
    pub keys_type: String,
    pub columns: HashMap<String, ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn from_schema(table_name: impl Into<String>, schema: &TableSchema) -> Self {
        let columns = schema
            .properties
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    ColumnDescriptor {
                        column_name: p.name.clone(),
                        type_name: p.type_name.clone(),
                        comment: p.comment.clone(),
                    },
                )
            })
            .collect();
        Self {
            table_name: table_name.into(),
            keys_type: schema.keys_type.clone(),
            columns,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Catalog response body for a table schema request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(rename = "keysType", default)]
    pub keys_type: String,
    #[serde(default)]
    pub properties: Vec<SchemaProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub comment: String,
}

impl SchemaProperty {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            comment: String::new(),
        }
    }
}

/// A column to be added to a destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: String,
    pub comment: Option<String>,
}

impl ColumnDef {
    /// `ALTER TABLE ... ADD COLUMN` statement for this column.
    pub fn to_ddl(&self, database: &str, table: &str) -> String {
        let mut ddl = format!(
            "ALTER TABLE {}.{} ADD COLUMN {} {}",
            quote_ident(database),
            quote_ident(table),
            quote_ident(&self.name),
            self.type_name
        );
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            ddl.push_str(" COMMENT '");
            ddl.push_str(&comment.replace('\\', "\\\\").replace('\'', "\\'"));
            ddl.push('\'');
        }
        ddl
    }

    pub fn to_property(&self) -> SchemaProperty {
        SchemaProperty {
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            comment: self.comment.clone().unwrap_or_default(),
        }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}
