//! Records as delivered by the streaming platform.
//!
//! The value shape is decided once, when the record is built, and carried as
//! a closed [`RecordValue`] variant so nothing downstream has to inspect
//! JSON types again.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::SchemaError;
use crate::schema::{ConnectSchema, SchemaType, Struct};

/// Shape of a record value.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Null,
    /// Schema-ful structured value.
    Struct(Struct),
    /// Ordered sequence of items (schemaless).
    List(Vec<Value>),
    /// Key-value mapping (schemaless).
    Map(Map<String, Value>),
    /// Anything else: strings, numbers, booleans.
    Scalar(Value),
}

impl RecordValue {
    pub const fn shape(&self) -> &'static str {
        match self {
            RecordValue::Null => "null",
            RecordValue::Struct(_) => "struct",
            RecordValue::List(_) => "list",
            RecordValue::Map(_) => "map",
            RecordValue::Scalar(_) => "scalar",
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, RecordValue::Null)
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            RecordValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Classify a schemaless JSON value.
    pub fn schemaless(value: Value) -> Self {
        match value {
            Value::Null => RecordValue::Null,
            Value::Array(items) => RecordValue::List(items),
            Value::Object(map) => RecordValue::Map(map),
            other => RecordValue::Scalar(other),
        }
    }
}

/// One record read from a topic partition.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key_schema: Option<Arc<ConnectSchema>>,
    pub key: RecordValue,
    pub value_schema: Option<Arc<ConnectSchema>>,
    pub value: RecordValue,
}

impl SinkRecord {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        value_schema: Option<Arc<ConnectSchema>>,
        value: RecordValue,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key_schema: None,
            key: RecordValue::Null,
            value_schema,
            value,
        }
    }

    pub fn with_key(
        mut self,
        key_schema: Option<Arc<ConnectSchema>>,
        key: RecordValue,
    ) -> Self {
        self.key_schema = key_schema;
        self.key = key;
        self
    }

    /// No value and no value schema.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_null() && self.value_schema.is_none()
    }

    /// Build a record from JSON converter output.
    ///
    /// `{"schema": ..., "payload": ...}` objects are decoded as schema-ful;
    /// everything else is treated as a schemaless value.
    pub fn from_connect_json(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        key: Option<&Value>,
        value: &Value,
    ) -> Result<Self, SchemaError> {
        let (value_schema, value) = decode_envelope(value)?;
        let (key_schema, key) = match key {
            Some(k) => decode_envelope(k)?,
            None => (None, RecordValue::Null),
        };
        Ok(Self {
            topic: topic.into(),
            partition,
            offset,
            key_schema,
            key,
            value_schema,
            value,
        })
    }
}

fn decode_envelope(
    raw: &Value,
) -> Result<(Option<Arc<ConnectSchema>>, RecordValue), SchemaError> {
    let envelope = match raw {
        Value::Object(obj)
            if obj.len() == 2
                && obj.contains_key("payload")
                && obj.get("schema").is_some_and(|s| !s.is_null()) =>
        {
            obj
        }
        other => return Ok((None, RecordValue::schemaless(other.clone()))),
    };

    let schema: ConnectSchema = serde_json::from_value(envelope["schema"].clone())?;
    let schema = Arc::new(schema);
    let payload = envelope["payload"].clone();

    let value = match (schema.kind, payload) {
        (_, Value::Null) => RecordValue::Null,
        (SchemaType::Struct, payload) => {
            RecordValue::Struct(Struct::new(schema.clone(), payload)?)
        }
        (_, payload) => RecordValue::schemaless(payload),
    };
    Ok((Some(schema), value))
}
