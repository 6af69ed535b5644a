use doris_config::{
    ConfigError, ConverterMode, SchemaEvolutionMode, load_catalog_seed,
    load_from_path,
};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;

fn write_temp(contents: &str) -> tempfile::TempPath {
    let mut f = tempfile::NamedTempFile::new().expect("temp file");
    f.write_all(contents.as_bytes()).expect("write");
    f.into_temp_path()
}

// ============================================================================
// Connector Parsing
// ============================================================================

#[test]
#[serial]
#[allow(unsafe_code)]
fn parses_debezium_connector_with_env_expansion() {
    unsafe {
        std::env::set_var("DORIS_TEST_DATABASE", "inventory");
    }

    let yaml = r#"
name: doris-sink
topics:
  - mysql_db.inventory.customers
  - mysql_db.inventory.orders
database: ${DORIS_TEST_DATABASE}
converter_mode: debezium_ingestion
schema_evolution: basic
topic2table: "mysql_db.inventory.orders:orders_v2"
"#;

    let path = write_temp(yaml);
    let cfg = load_from_path(path.to_str().unwrap()).expect("parse yaml");

    assert_eq!(cfg.name, "doris-sink");
    assert_eq!(cfg.database, "inventory");
    assert_eq!(cfg.converter_mode, ConverterMode::DebeziumIngestion);
    assert_eq!(cfg.schema_evolution, SchemaEvolutionMode::Basic);
    assert_eq!(cfg.delete_sign.field, "__DORIS_DELETE_SIGN__");
    assert_eq!(cfg.line_separator, "\n");
    assert!(cfg.validate().is_ok());

    assert_eq!(
        cfg.table_for_topic("mysql_db.inventory.orders").unwrap(),
        "orders_v2"
    );
    assert_eq!(
        cfg.table_for_topic("mysql_db.inventory.customers").unwrap(),
        "customers"
    );
}

#[test]
fn parses_map_form_and_custom_delete_sign() {
    let yaml = r#"
name: sink_2
topics_regex: "orders.*"
database: shop
delete_sign:
  field: is_deleted
  true_value: "true"
  false_value: "false"
line_separator: "\u0001"
topic2table:
  orders_eu: orders
  orders_us: orders
"#;

    let path = write_temp(yaml);
    let cfg = load_from_path(path.to_str().unwrap()).expect("parse yaml");

    assert_eq!(cfg.converter_mode, ConverterMode::Normal);
    assert_eq!(cfg.schema_evolution, SchemaEvolutionMode::None);
    assert_eq!(cfg.delete_sign.field, "is_deleted");
    assert_eq!(cfg.delete_sign.true_value, "true");
    assert_eq!(cfg.line_separator, "\u{1}");
    assert_eq!(cfg.topic2table.len(), 2);
    assert_eq!(cfg.table_for_topic("orders_us").unwrap(), "orders");
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_duplicate_topic_in_compact_map() {
    let yaml = r#"
name: sink
topics: [a]
database: db
topic2table: "a:t1,a:t2"
"#;
    let path = write_temp(yaml);
    let err = load_from_path(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "got {err}");
    assert!(err.to_string().contains("duplicated"));
}

#[test]
fn rejects_unknown_converter_mode() {
    let yaml = r#"
name: sink
topics: [a]
database: db
converter_mode: avro
"#;
    let path = write_temp(yaml);
    assert!(matches!(
        load_from_path(path.to_str().unwrap()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn missing_file_reports_path() {
    let err = load_from_path("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}

// ============================================================================
// Catalog Seed
// ============================================================================

#[test]
fn parses_catalog_seed() {
    let yaml = r#"
tables:
  customers:
    columns:
      - name: id
        type: INT
      - name: name
        type: VARCHAR(765)
        comment: display name
  orders:
    keys_type: DUP_KEYS
"#;
    let path = write_temp(yaml);
    let seed = load_catalog_seed(path.to_str().unwrap()).expect("parse seed");

    assert!(seed.database.is_none());
    assert_eq!(seed.tables.len(), 2);
    let customers = &seed.tables["customers"];
    assert_eq!(customers.keys_type, "UNIQUE_KEYS");
    assert_eq!(customers.columns.len(), 2);
    assert_eq!(customers.columns[1].comment, "display name");
    assert_eq!(seed.tables["orders"].keys_type, "DUP_KEYS");
    assert!(seed.tables["orders"].columns.is_empty());
}
