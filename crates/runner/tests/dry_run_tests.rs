use std::sync::Arc;

use catalog::MemCatalog;
use converter::RecordService;
use doris_config::{ConnectorCfg, ConverterMode, SchemaEvolutionMode};
use doris_core::{SchemaProperty, TableSchema};
use pretty_assertions::assert_eq;
use runner::{DryRun, RunReport};
use serde_json::{Value, json};
use sinks::WriterSink;

const DB: &str = "inventory";

fn customers_table() -> TableSchema {
    TableSchema {
        keys_type: "UNIQUE_KEYS".into(),
        properties: vec![SchemaProperty::new("id", "INT")],
    }
}

fn dry_run(mode: SchemaEvolutionMode, catalog: &Arc<MemCatalog>) -> DryRun {
    let mut cfg = ConnectorCfg::new("doris-sink", DB);
    cfg.topics = vec!["mysql_db.inventory.customers".into()];
    cfg.converter_mode = ConverterMode::DebeziumIngestion;
    cfg.schema_evolution = mode;
    let cfg = Arc::new(cfg);
    let service = RecordService::new(cfg.clone(), catalog.clone(), catalog.clone());
    DryRun::new(cfg, service)
}

fn row_schema() -> Value {
    json!({
        "type": "struct",
        "optional": true,
        "name": "mysql_db.inventory.customers.Value",
        "fields": [
            {"field": "id", "type": "int32"},
            {"field": "name", "type": "string", "optional": true}
        ]
    })
}

fn change_line(offset: i64, before: Value, after: Value) -> String {
    let image = if after.is_null() { &before } else { &after };
    let line = json!({
        "topic": "mysql_db.inventory.customers",
        "offset": offset,
        "key": {
            "schema": {
                "type": "struct",
                "name": "mysql_db.inventory.customers.Key",
                "fields": [{"field": "id", "type": "int32"}]
            },
            "payload": {"id": image["id"]}
        },
        "value": {
            "schema": {
                "type": "struct",
                "name": "mysql_db.inventory.customers.Envelope",
                "fields": [
                    {"field": "before", "type": "struct", "optional": true, "fields": row_schema()["fields"]},
                    {"field": "after", "type": "struct", "optional": true, "fields": row_schema()["fields"]},
                    {"field": "op", "type": "string"}
                ]
            },
            "payload": {"before": before, "after": after, "op": "c"}
        }
    });
    line.to_string()
}

#[tokio::test]
async fn evolves_schema_and_writes_rows() {
    let catalog = Arc::new(MemCatalog::new().with_table(DB, "customers", customers_table()));
    let run = dry_run(SchemaEvolutionMode::Basic, &catalog);

    let input = [
        change_line(1, Value::Null, json!({"id": 1, "name": "alice"})),
        String::new(),
        r#"{"topic":"mysql_db.inventory.customers","offset":2}"#.to_string(),
        change_line(3, json!({"id": 1, "name": "alice"}), Value::Null),
    ]
    .join("\n");

    let sink = WriterSink::new("mem", Vec::<u8>::new());
    let report = run.run(input.as_bytes(), &sink).await.unwrap();

    assert_eq!(
        report,
        RunReport {
            records: 3,
            rows: 2,
            skipped: 1,
            failures: Default::default(),
        }
    );
    assert_eq!(
        catalog.executed_ddl().await,
        vec!["ALTER TABLE `inventory`.`customers` ADD COLUMN `name` STRING".to_string()]
    );

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(
        out,
        concat!(
            "-- customers\n",
            "{\"name\":\"alice\",\"__DORIS_DELETE_SIGN__\":\"0\"}\n",
            "{\"name\":\"alice\",\"__DORIS_DELETE_SIGN__\":\"1\"}\n",
        )
    );
}

#[tokio::test]
async fn failures_are_counted_by_kind() {
    let catalog = Arc::new(MemCatalog::new().with_table(DB, "customers", customers_table()));
    let run = dry_run(SchemaEvolutionMode::None, &catalog);

    let input = [
        change_line(1, Value::Null, json!({"id": 1, "name": "alice"})),
        "{broken".to_string(),
        r#"{"topic":"plain","value":{"k":"v"}}"#.to_string(),
    ]
    .join("\n");

    let sink = WriterSink::new("mem", Vec::<u8>::new());
    let report = run.run(input.as_bytes(), &sink).await.unwrap();

    assert_eq!(report.records, 3);
    assert_eq!(report.rows, 1);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.failures.get("schema_evolution_disabled"), Some(&1));
    assert_eq!(report.failures.get("input"), Some(&1));
    assert!(catalog.executed_ddl().await.is_empty());

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, "-- plain\n{\"k\":\"v\"}\n");
}

#[tokio::test]
async fn small_flush_threshold_writes_each_row() {
    let catalog = Arc::new(MemCatalog::new());
    let run = dry_run(SchemaEvolutionMode::Basic, &catalog).with_flush_bytes(1);

    let input = r#"{"topic":"plain","value":"a"}
{"topic":"plain","value":"b"}"#;

    let sink = WriterSink::new("mem", Vec::<u8>::new());
    let report = run.run(input.as_bytes(), &sink).await.unwrap();
    assert_eq!(report.rows, 2);

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, "-- plain\na\n-- plain\nb\n");
}
