//! Type registry: maps a field's Connect schema to a value converter.
//!
//! Lookup goes by logical type name first (e.g. `io.debezium.time.Date`),
//! then by primitive type. Each converter also knows the destination
//! column type used when the field has to be added to a table.

use std::collections::HashMap;
use std::sync::Arc;

use doris_core::{ConnectSchema, SchemaError};
use serde_json::Value;
use thiserror::Error;

mod logical;
mod primitive;

pub use logical::{
    DateType, DecimalType, JsonType, TextType, TimeType, TimestampType,
    VariableScaleDecimalType, ZonedTimestampType,
};
pub use primitive::{
    BooleanType, BytesType, ContainerType, FloatType, IntType, StringType,
};

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("{type_name}: cannot convert {found} value")]
    Unexpected {
        type_name: &'static str,
        found: &'static str,
    },

    #[error("{type_name}: value {value} is out of range")]
    OutOfRange {
        type_name: &'static str,
        value: String,
    },

    #[error("{type_name}: {details}")]
    Invalid {
        type_name: &'static str,
        details: String,
    },

    #[error(transparent)]
    Decimal(#[from] SchemaError),
}

/// Converts raw field values of one source type into row values.
pub trait ConnectType: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Registry keys this type answers to.
    fn registry_keys(&self) -> &'static [&'static str];

    /// Convert a raw value. Null stays null.
    fn get_value(
        &self,
        value: &Value,
        schema: &ConnectSchema,
    ) -> Result<Value, TypeError>;

    /// Numeric values keep their JSON number form in the row payload.
    fn is_number(&self) -> bool {
        false
    }

    /// Destination column type for a field with this schema.
    fn type_name(&self, schema: &ConnectSchema) -> String;
}

pub type TypeHandle = Arc<dyn ConnectType>;

#[derive(Clone)]
pub struct TypeRegistry {
    types: HashMap<&'static str, TypeHandle>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry with every built-in type.
    pub fn new() -> Self {
        let builtins: Vec<TypeHandle> = vec![
            Arc::new(IntType::INT8),
            Arc::new(IntType::INT16),
            Arc::new(IntType::INT32),
            Arc::new(IntType::INT64),
            Arc::new(FloatType::FLOAT32),
            Arc::new(FloatType::FLOAT64),
            Arc::new(BooleanType),
            Arc::new(StringType),
            Arc::new(BytesType),
            Arc::new(ContainerType),
            Arc::new(DecimalType),
            Arc::new(VariableScaleDecimalType),
            Arc::new(DateType),
            Arc::new(TimeType::MILLIS),
            Arc::new(TimeType::MICROS),
            Arc::new(TimeType::NANOS),
            Arc::new(TimestampType::MILLIS),
            Arc::new(TimestampType::MICROS),
            Arc::new(TimestampType::NANOS),
            Arc::new(ZonedTimestampType),
            Arc::new(JsonType),
            Arc::new(TextType),
        ];

        let mut registry = Self {
            types: HashMap::new(),
        };
        for handle in builtins {
            registry.register(handle);
        }
        registry
    }

    /// Register `handle` under all of its keys, replacing earlier entries.
    pub fn register(&mut self, handle: TypeHandle) {
        for key in handle.registry_keys() {
            self.types.insert(*key, handle.clone());
        }
    }

    pub fn resolve(&self, schema: &ConnectSchema) -> Option<TypeHandle> {
        schema
            .name
            .as_deref()
            .and_then(|name| self.types.get(name))
            .or_else(|| self.types.get(schema.kind.as_str()))
            .cloned()
    }
}

/// Text form of a converted value, as placed in the row payload.
pub(crate) fn text_of(value: Value) -> Value {
    match value {
        Value::String(_) | Value::Null => value,
        other => Value::String(other.to_string()),
    }
}
