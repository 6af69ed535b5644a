//! Record transformation entry point.

use std::sync::Arc;

use doris_config::{ConnectorCfg, ConverterMode};
use doris_core::{
    ArcDynCatalog, ArcDynSchemaChange, ConvertError, ConvertResult, RecordValue,
    SCHEMA_CHANGE_MARKER, SinkRecord, Struct,
};
use indexmap::IndexMap;
use metrics::counter;
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::descriptor::RecordDescriptor;
use crate::schema_evolution::SchemaCoordinator;
use crate::types::{TypeRegistry, text_of};

static NULL: Value = Value::Null;

/// Turns records into row payloads for the destination load.
///
/// One instance is shared by every record of a connector task; it owns the
/// table metadata cache.
pub struct RecordService {
    cfg: Arc<ConnectorCfg>,
    registry: TypeRegistry,
    coordinator: SchemaCoordinator,
}

impl RecordService {
    pub fn new(
        cfg: Arc<ConnectorCfg>,
        catalog: ArcDynCatalog,
        schema_change: ArcDynSchemaChange,
    ) -> Self {
        let coordinator = SchemaCoordinator::new(
            cfg.database.clone(),
            cfg.schema_evolution,
            catalog,
            schema_change,
        );
        Self {
            cfg,
            registry: TypeRegistry::new(),
            coordinator,
        }
    }

    /// Replace the built-in type registry.
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn coordinator(&self) -> &SchemaCoordinator {
        &self.coordinator
    }

    /// Transform one record into a row payload.
    ///
    /// `Ok(None)` means the record is a tombstone and was skipped.
    pub async fn transform(&self, record: &SinkRecord) -> ConvertResult<Option<String>> {
        let result = self.dispatch(record).await;
        match &result {
            Ok(Some(_)) => {
                counter!("doris_records_transformed_total", "mode" => self.mode_label(record))
                    .increment(1);
            }
            Ok(None) => {}
            Err(e) => {
                counter!("doris_transform_errors_total", "kind" => e.kind()).increment(1);
            }
        }
        result
    }

    async fn dispatch(&self, record: &SinkRecord) -> ConvertResult<Option<String>> {
        if record.is_tombstone() {
            warn!(topic = %record.topic, offset = record.offset, "record value and schema are null, skipping");
            counter!("doris_tombstones_skipped_total").increment(1);
            return Ok(None);
        }

        match &record.value {
            RecordValue::Struct(_) | RecordValue::Null => self.process_struct(record).await,
            RecordValue::List(items) => self.process_list(record, items).map(Some),
            RecordValue::Map(map) => self.process_map(record, map).map(Some),
            RecordValue::Scalar(value) => Ok(Some(scalar_text(value))),
        }
    }

    fn mode_label(&self, record: &SinkRecord) -> &'static str {
        match &record.value {
            RecordValue::Struct(_) | RecordValue::Null => self.cfg.converter_mode.as_str(),
            other => other.shape(),
        }
    }

    async fn process_struct(&self, record: &SinkRecord) -> ConvertResult<Option<String>> {
        match self.cfg.converter_mode {
            ConverterMode::DebeziumIngestion => self.process_change_event(record).await,
            ConverterMode::Normal => match &record.value {
                RecordValue::Struct(value) => serialize_struct(record, value).map(Some),
                other => Err(ConvertError::Decode {
                    topic: record.topic.clone(),
                    offset: record.offset,
                    details: format!("{} value carries a schema", other.shape()).into(),
                }),
            },
        }
    }

    async fn process_change_event(&self, record: &SinkRecord) -> ConvertResult<Option<String>> {
        reject_schema_change(record)?;

        let descriptor = RecordDescriptor::build(record, &self.registry)?;

        let table = self
            .cfg
            .table_for_topic(descriptor.topic())
            .map_err(|e| ConvertError::TableName {
                topic: record.topic.clone(),
                details: e.to_string().into(),
            })?;
        self.coordinator.ensure_schema(&table, &descriptor).await?;

        let (source, is_delete) = match (descriptor.is_delete(), descriptor.before(), descriptor.after()) {
            (true, Some(before), _) => (before, true),
            (false, _, Some(after)) => (after, false),
            _ => {
                return Err(ConvertError::Decode {
                    topic: record.topic.clone(),
                    offset: record.offset,
                    details: "change event has no row image".into(),
                });
            }
        };
        self.build_row(record, &descriptor, source, is_delete).map(Some)
    }

    /// Extract the non-key fields of `source` and append the delete sign.
    fn build_row(
        &self,
        record: &SinkRecord,
        descriptor: &RecordDescriptor,
        source: &Struct,
        is_delete: bool,
    ) -> ConvertResult<String> {
        let names = descriptor.non_key_field_names();
        let mut row: IndexMap<&str, Value> = IndexMap::with_capacity(names.len() + 1);

        for name in names {
            let field = descriptor.field(name).ok_or_else(|| ConvertError::Decode {
                topic: record.topic.clone(),
                offset: record.offset,
                details: format!("no descriptor for field {name}").into(),
            })?;
            // optional fields must not pick up the source default
            let raw = if field.is_optional() {
                source.get_without_default(name)
            } else {
                source.get(name)
            }
            .unwrap_or(&NULL);

            let handle = field.type_handle();
            let converted = handle
                .get_value(raw, field.schema())
                .map_err(|e| ConvertError::Decode {
                    topic: record.topic.clone(),
                    offset: record.offset,
                    details: format!("field {name}: {e}").into(),
                })?;
            let value = if handle.is_number() {
                converted
            } else {
                text_of(converted)
            };
            row.insert(name.as_str(), value);
        }

        let sign = &self.cfg.delete_sign;
        let marker = if is_delete { &sign.true_value } else { &sign.false_value };
        row.insert(sign.field.as_str(), Value::String(marker.clone()));

        serde_json::to_string(&row).map_err(|e| {
            error!(topic = %record.topic, offset = record.offset, error = %e, "failed to serialize row");
            ConvertError::DataFormat {
                topic: record.topic.clone(),
                shape: "struct",
                details: e.to_string().into(),
            }
        })
    }

    /// Each item serialized on its own, joined by the line separator.
    fn process_list(&self, record: &SinkRecord, items: &[Value]) -> ConvertResult<String> {
        let rows = items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                error!(topic = %record.topic, offset = record.offset, error = %e, "process list record failed");
                ConvertError::DataFormat {
                    topic: record.topic.clone(),
                    shape: "list",
                    details: e.to_string().into(),
                }
            })?;
        Ok(rows.join(self.cfg.line_separator.as_str()))
    }

    fn process_map(&self, record: &SinkRecord, map: &Map<String, Value>) -> ConvertResult<String> {
        serde_json::to_string(map).map_err(|e| {
            error!(topic = %record.topic, offset = record.offset, error = %e, "process map record failed");
            ConvertError::DataFormat {
                topic: record.topic.clone(),
                shape: "map",
                details: e.to_string().into(),
            }
        })
    }
}

fn reject_schema_change(record: &SinkRecord) -> ConvertResult<()> {
    let is_schema_change = record
        .value_schema
        .as_deref()
        .is_some_and(|s| s.name_contains(SCHEMA_CHANGE_MARKER));
    if is_schema_change {
        warn!(topic = %record.topic, "schema change records are not supported, exclude the schema change topic from topics or topics_regex");
        return Err(ConvertError::UnsupportedCategory {
            topic: record.topic.clone(),
            category: SCHEMA_CHANGE_MARKER.to_string(),
        });
    }
    Ok(())
}

/// Plain JSON rendering of a struct, schema dropped.
fn serialize_struct(record: &SinkRecord, value: &Struct) -> ConvertResult<String> {
    value.to_json_string().map_err(|e| ConvertError::DataFormat {
        topic: record.topic.clone(),
        shape: "struct",
        details: e.to_string().into(),
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
