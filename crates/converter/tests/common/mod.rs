#![allow(dead_code)]

use std::sync::{Arc, Once};

use catalog::MemCatalog;
use converter::RecordService;
use doris_config::{ConnectorCfg, ConverterMode, SchemaEvolutionMode};
use doris_core::{
    ConnectField, ConnectSchema, RecordValue, SchemaProperty, SchemaType,
    SinkRecord, Struct, TableSchema,
};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .compact()
            .try_init();
    });
}

pub const DB: &str = "inventory";
pub const TOPIC: &str = "mysql_db.inventory.customers";
pub const TABLE: &str = "customers";

pub fn cfg(mode: SchemaEvolutionMode) -> ConnectorCfg {
    let mut cfg = ConnectorCfg::new("doris-sink", DB);
    cfg.topics = vec![TOPIC.to_string()];
    cfg.converter_mode = ConverterMode::DebeziumIngestion;
    cfg.schema_evolution = mode;
    cfg
}

pub fn service(cfg: ConnectorCfg, catalog: &Arc<MemCatalog>) -> RecordService {
    RecordService::new(Arc::new(cfg), catalog.clone(), catalog.clone())
}

pub fn table(columns: &[&str]) -> TableSchema {
    TableSchema {
        keys_type: "UNIQUE_KEYS".into(),
        properties: columns
            .iter()
            .map(|c| SchemaProperty::new(*c, "STRING"))
            .collect(),
    }
}

pub fn catalog_with(columns: &[&str]) -> Arc<MemCatalog> {
    Arc::new(MemCatalog::new().with_table(DB, TABLE, table(columns)))
}

pub fn int32(name: &str) -> ConnectField {
    ConnectField::new(name, ConnectSchema::new(SchemaType::Int32))
}

pub fn opt_string(name: &str) -> ConnectField {
    ConnectField::new(name, ConnectSchema::new(SchemaType::String).optional())
}

/// `id:int32` key plus a `name:string?` column.
pub fn customer_fields() -> Vec<ConnectField> {
    vec![int32("id"), opt_string("name")]
}

/// Debezium change event for `TOPIC`, keyed by `id`.
pub fn change_event(
    offset: i64,
    row_fields: Vec<ConnectField>,
    before: Value,
    after: Value,
) -> SinkRecord {
    let row = ConnectSchema::structure(
        "mysql_db.inventory.customers.Value",
        row_fields.clone(),
    )
    .optional();
    let envelope = Arc::new(ConnectSchema::structure(
        "mysql_db.inventory.customers.Envelope",
        vec![
            ConnectField::new("before", row.clone()),
            ConnectField::new("after", row),
            ConnectField::new("op", ConnectSchema::new(SchemaType::String)),
        ],
    ));
    let op = match (&before, &after) {
        (_, Value::Null) => "d",
        (Value::Null, _) => "c",
        _ => "u",
    };
    let value = Struct::new(
        envelope.clone(),
        json!({"before": before, "after": after, "op": op}),
    )
    .expect("valid envelope");

    let key_schema = Arc::new(ConnectSchema::structure(
        "mysql_db.inventory.customers.Key",
        row_fields.into_iter().filter(|f| f.name == "id").collect(),
    ));
    let image = if after.is_null() { &before } else { &after };
    let key = Struct::new(key_schema.clone(), json!({"id": image["id"]}))
        .expect("valid key");

    SinkRecord::new(TOPIC, 0, offset, Some(envelope), RecordValue::Struct(value))
        .with_key(Some(key_schema), RecordValue::Struct(key))
}
