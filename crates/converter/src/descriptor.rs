//! Normalized per-record view used by the schema coordinator and the row
//! extractor.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use doris_core::{
    ColumnDef, ConnectSchema, ConvertError, ConvertResult, ENVELOPE_MARKER,
    RecordValue, SchemaType, SinkRecord, Struct,
};

use crate::types::{TypeHandle, TypeRegistry};

/// One field of a record, resolved against the type registry.
///
/// Two descriptors are equal when their names are equal.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    schema: ConnectSchema,
    type_handle: TypeHandle,
    is_key: bool,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ConnectSchema {
        &self.schema
    }

    pub fn type_handle(&self) -> &TypeHandle {
        &self.type_handle
    }

    pub fn is_optional(&self) -> bool {
        self.schema.optional
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    /// Column to add when the destination table lacks this field.
    pub fn column_def(&self) -> ColumnDef {
        ColumnDef {
            name: self.name.clone(),
            type_name: self.type_handle.type_name(&self.schema),
            comment: self.schema.doc.clone(),
        }
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FieldDescriptor {}

impl Hash for FieldDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type", &self.type_handle.name())
            .field("optional", &self.schema.optional)
            .field("is_key", &self.is_key)
            .finish()
    }
}

#[derive(Debug)]
pub struct RecordDescriptor {
    topic: String,
    fields: HashMap<String, FieldDescriptor>,
    /// All field names, in record order
    field_names: Vec<String>,
    non_key_field_names: Vec<String>,
    before: Option<Struct>,
    after: Option<Struct>,
    is_delete: bool,
}

impl RecordDescriptor {
    /// Build the descriptor for one record.
    ///
    /// Debezium envelopes (value schema name containing `Envelope`) are read
    /// through their `before`/`after` members; any other struct value is
    /// treated as the after image of an upsert. Tombstones are skipped
    /// before this point and fail here like any other non-struct value.
    pub fn build(record: &SinkRecord, registry: &TypeRegistry) -> ConvertResult<Self> {
        let value = match &record.value {
            RecordValue::Struct(s) => s,
            other => {
                return Err(decode_error(
                    record,
                    format!("expected a struct value, found {}", other.shape()),
                ));
            }
        };

        let (before, after, row_schema) = if value.schema().name_contains(ENVELOPE_MARKER) {
            let row_schema = value
                .schema()
                .field("after")
                .or_else(|| value.schema().field("before"))
                .map(|f| f.schema.clone())
                .ok_or_else(|| {
                    decode_error(record, "envelope has neither before nor after field")
                })?;
            let before = value
                .get_struct("before")
                .map_err(|e| decode_error(record, e.to_string()))?;
            let after = value
                .get_struct("after")
                .map_err(|e| decode_error(record, e.to_string()))?;
            (before, after, row_schema)
        } else {
            (None, Some(value.clone()), value.schema().clone())
        };

        if row_schema.kind != SchemaType::Struct {
            return Err(decode_error(record, "row schema is not a struct"));
        }

        let key_names: HashSet<&str> = match record.key_schema.as_deref() {
            Some(key) if key.kind == SchemaType::Struct => {
                key.fields.iter().map(|f| f.name.as_str()).collect()
            }
            _ => HashSet::new(),
        };

        let mut fields = HashMap::with_capacity(row_schema.fields.len());
        let mut field_names = Vec::with_capacity(row_schema.fields.len());
        let mut non_key_field_names = Vec::new();

        for field in &row_schema.fields {
            let is_key = key_names.contains(field.name.as_str());
            let descriptor = resolve_field(record, registry, &field.name, &field.schema, is_key)?;
            if !is_key {
                non_key_field_names.push(field.name.clone());
            }
            field_names.push(field.name.clone());
            fields.insert(field.name.clone(), descriptor);
        }

        // key columns the row image does not carry
        if let Some(key) = record.key_schema.as_deref() {
            let extra: Vec<_> = key
                .fields
                .iter()
                .filter(|f| !fields.contains_key(&f.name))
                .collect();
            for field in extra {
                let descriptor = resolve_field(record, registry, &field.name, &field.schema, true)?;
                field_names.push(field.name.clone());
                fields.insert(field.name.clone(), descriptor);
            }
        }

        let is_delete = before.is_some() && after.is_none();
        if !is_delete && after.is_none() {
            return Err(decode_error(record, "change event has neither before nor after image"));
        }

        Ok(Self {
            topic: record.topic.clone(),
            fields,
            field_names,
            non_key_field_names,
            before,
            after,
            is_delete,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// All field descriptors, key fields included, in record order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.field_names.iter().filter_map(|n| self.fields.get(n))
    }

    pub fn non_key_field_names(&self) -> &[String] {
        &self.non_key_field_names
    }

    pub fn before(&self) -> Option<&Struct> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&Struct> {
        self.after.as_ref()
    }

    pub fn is_delete(&self) -> bool {
        self.is_delete
    }
}

fn resolve_field(
    record: &SinkRecord,
    registry: &TypeRegistry,
    name: &str,
    schema: &ConnectSchema,
    is_key: bool,
) -> ConvertResult<FieldDescriptor> {
    let type_handle = registry.resolve(schema).ok_or_else(|| {
        decode_error(
            record,
            format!(
                "field {name} has unsupported type {}{}",
                schema.kind.as_str(),
                schema.name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default()
            ),
        )
    })?;
    Ok(FieldDescriptor {
        name: name.to_string(),
        schema: schema.clone(),
        type_handle,
        is_key,
    })
}

fn decode_error(record: &SinkRecord, details: impl Into<String>) -> ConvertError {
    let details: String = details.into();
    ConvertError::Decode {
        topic: record.topic.clone(),
        offset: record.offset,
        details: details.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doris_core::ConnectField;
    use serde_json::json;
    use std::sync::Arc;

    fn row_schema() -> ConnectSchema {
        ConnectSchema::structure(
            "server.db.customers.Value",
            vec![
                ConnectField::new("id", ConnectSchema::new(SchemaType::Int32)),
                ConnectField::new("name", ConnectSchema::new(SchemaType::String).optional()),
            ],
        )
        .optional()
    }

    fn envelope_schema() -> Arc<ConnectSchema> {
        Arc::new(ConnectSchema::structure(
            "server.db.customers.Envelope",
            vec![
                ConnectField::new("before", row_schema()),
                ConnectField::new("after", row_schema()),
                ConnectField::new("op", ConnectSchema::new(SchemaType::String)),
            ],
        ))
    }

    fn key_schema() -> Arc<ConnectSchema> {
        Arc::new(ConnectSchema::structure(
            "server.db.customers.Key",
            vec![ConnectField::new("id", ConnectSchema::new(SchemaType::Int32))],
        ))
    }

    fn record(payload: serde_json::Value) -> SinkRecord {
        let schema = envelope_schema();
        let value = Struct::new(schema.clone(), payload).unwrap();
        SinkRecord::new("server.db.customers", 0, 1, Some(schema), RecordValue::Struct(value))
            .with_key(
                Some(key_schema()),
                RecordValue::Struct(Struct::new(key_schema(), json!({"id": 1})).unwrap()),
            )
    }

    #[test]
    fn upsert_descriptor() {
        let rec = record(json!({"before": null, "after": {"id": 1, "name": "a"}, "op": "c"}));
        let d = RecordDescriptor::build(&rec, &TypeRegistry::new()).unwrap();

        assert!(!d.is_delete());
        assert_eq!(d.non_key_field_names(), ["name".to_string()]);
        assert!(d.field("id").unwrap().is_key());
        assert!(d.field("name").unwrap().is_optional());
        let names: Vec<&str> = d.fields().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn delete_descriptor() {
        let rec = record(json!({"before": {"id": 1, "name": "a"}, "after": null, "op": "d"}));
        let d = RecordDescriptor::build(&rec, &TypeRegistry::new()).unwrap();
        assert!(d.is_delete());
        assert!(d.before().is_some());
        assert!(d.after().is_none());
    }

    #[test]
    fn null_value_is_decode_error() {
        let rec = SinkRecord::new("t", 0, 5, None, RecordValue::Null);
        let err = RecordDescriptor::build(&rec, &TypeRegistry::new()).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn key_fields_missing_from_row_are_appended() {
        let key = Arc::new(ConnectSchema::structure(
            "server.db.customers.Key",
            vec![
                ConnectField::new("id", ConnectSchema::new(SchemaType::Int32)),
                ConnectField::new("tenant", ConnectSchema::new(SchemaType::String)),
            ],
        ));
        let schema = envelope_schema();
        let value = Struct::new(
            schema.clone(),
            json!({"before": null, "after": {"id": 1, "name": "a"}, "op": "c"}),
        )
        .unwrap();
        let rec = SinkRecord::new("server.db.customers", 0, 2, Some(schema), RecordValue::Struct(value))
            .with_key(
                Some(key.clone()),
                RecordValue::Struct(Struct::new(key, json!({"id": 1, "tenant": "eu"})).unwrap()),
            );

        let d = RecordDescriptor::build(&rec, &TypeRegistry::new()).unwrap();
        let names: Vec<&str> = d.fields().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "name", "tenant"]);
        assert!(d.field("tenant").unwrap().is_key());
        assert_eq!(d.field("tenant").unwrap().column_def().type_name, "STRING");
        assert_eq!(d.non_key_field_names(), ["name".to_string()]);
    }

    #[test]
    fn unresolvable_field_is_decode_error() {
        let nested = ConnectSchema::structure(
            "row",
            vec![ConnectField::new(
                "inner",
                ConnectSchema::structure("inner", vec![]).optional(),
            )],
        );
        let schema = Arc::new(nested);
        let value = Struct::new(schema.clone(), json!({"inner": null})).unwrap();
        let rec = SinkRecord::new("t", 0, 9, Some(schema), RecordValue::Struct(value));

        let err = RecordDescriptor::build(&rec, &TypeRegistry::new()).unwrap_err();
        assert_eq!(err.kind(), "decode");
        assert!(err.to_string().contains("inner"));
        assert!(err.to_string().contains("offset 9"));
    }

    #[test]
    fn field_equality_is_by_name() {
        let rec = record(json!({"before": null, "after": {"id": 1, "name": "a"}, "op": "c"}));
        let d = RecordDescriptor::build(&rec, &TypeRegistry::new()).unwrap();
        let mut other = d.field("name").unwrap().clone();
        other.is_key = true;
        assert_eq!(&other, d.field("name").unwrap());
    }

    #[test]
    fn column_def_uses_destination_type_and_doc() {
        let schema = Arc::new(ConnectSchema::structure(
            "row",
            vec![ConnectField::new(
                "total",
                ConnectSchema::new(SchemaType::Int64).with_doc("order total"),
            )],
        ));
        let value = Struct::new(schema.clone(), json!({"total": 3})).unwrap();
        let rec = SinkRecord::new("t", 0, 0, Some(schema), RecordValue::Struct(value));
        let d = RecordDescriptor::build(&rec, &TypeRegistry::new()).unwrap();

        let col = d.field("total").unwrap().column_def();
        assert_eq!(col.type_name, "BIGINT");
        assert_eq!(col.comment.as_deref(), Some("order total"));
    }
}
