//! Connect-style schemas and structured values.
//!
//! Schema-ful records from the streaming platform carry a schema next to
//! their payload, in the shape emitted by the Connect JSON converter:
//!
//! ```json
//! {
//!   "type": "struct",
//!   "name": "server.inventory.customers.Value",
//!   "optional": false,
//!   "fields": [
//!     {"field": "id", "type": "int32", "optional": false},
//!     {"field": "name", "type": "string", "optional": true}
//!   ]
//! }
//! ```
//!
//! [`Struct`] pairs such a schema with a validated JSON object and exposes
//! the two read paths the row extractor needs: with and without the
//! schema-declared default.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::errors::SchemaError;

pub const DECIMAL_LOGICAL_NAME: &str = "org.apache.kafka.connect.data.Decimal";
pub const DECIMAL_SCALE_PARAM: &str = "scale";
/// Largest decimal scale the destination can store.
pub const MAX_DECIMAL_SCALE: u32 = 38;

static NULL: Value = Value::Null;

/// Connect primitive and container types.
///
/// Serializes to the lowercase names used by the JSON converter; the two
/// floating point types are `float` and `double` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "float")]
    Float32,
    #[serde(rename = "double")]
    Float64,
    Boolean,
    String,
    Bytes,
    Array,
    Map,
    Struct,
}

impl SchemaType {
    /// Upper-case type name, as used for type registry keys.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Int8 => "INT8",
            SchemaType::Int16 => "INT16",
            SchemaType::Int32 => "INT32",
            SchemaType::Int64 => "INT64",
            SchemaType::Float32 => "FLOAT32",
            SchemaType::Float64 => "FLOAT64",
            SchemaType::Boolean => "BOOLEAN",
            SchemaType::String => "STRING",
            SchemaType::Bytes => "BYTES",
            SchemaType::Array => "ARRAY",
            SchemaType::Map => "MAP",
            SchemaType::Struct => "STRUCT",
        }
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            SchemaType::Int8
                | SchemaType::Int16
                | SchemaType::Int32
                | SchemaType::Int64
        )
    }
}

/// A Connect schema as carried by the JSON converter envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectSchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,

    #[serde(default)]
    pub optional: bool,

    /// Logical type or record name (e.g. `io.debezium.time.Date`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(
        default,
        rename = "default",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,

    /// Struct fields in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ConnectField>,

    /// Array element schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ConnectSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Box<ConnectSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Box<ConnectSchema>>,
}

/// A named struct member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectField {
    #[serde(rename = "field")]
    pub name: String,

    #[serde(flatten)]
    pub schema: ConnectSchema,
}

impl ConnectSchema {
    pub fn new(kind: SchemaType) -> Self {
        Self {
            kind,
            optional: false,
            name: None,
            version: None,
            doc: None,
            default_value: None,
            parameters: BTreeMap::new(),
            fields: Vec::new(),
            items: None,
            keys: None,
            values: None,
        }
    }

    /// Struct schema with the given fields.
    pub fn structure(name: impl Into<String>, fields: Vec<ConnectField>) -> Self {
        let mut schema = Self::new(SchemaType::Struct);
        schema.name = Some(name.into());
        schema.fields = fields;
        schema
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&ConnectField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// True when the schema name contains `needle`.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.as_deref().is_some_and(|n| n.contains(needle))
    }
}

impl ConnectField {
    pub fn new(name: impl Into<String>, schema: ConnectSchema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

// ============================================================================
// Struct
// ============================================================================

/// A JSON object validated against a struct schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    schema: Arc<ConnectSchema>,
    values: Map<String, Value>,
}

impl Struct {
    /// Validate `payload` against `schema`.
    ///
    /// Payload keys that the schema does not declare are ignored; declared
    /// fields must have a compatible JSON type, and required fields without
    /// a default must be present.
    pub fn new(
        schema: Arc<ConnectSchema>,
        payload: Value,
    ) -> Result<Self, SchemaError> {
        if schema.kind != SchemaType::Struct {
            return Err(SchemaError::NotAStruct { found: schema.kind });
        }
        let values = match payload {
            Value::Object(values) => values,
            other => {
                return Err(SchemaError::TypeMismatch {
                    field: schema.name.clone().unwrap_or_default(),
                    expected: SchemaType::Struct,
                    found: json_kind(&other),
                });
            }
        };
        for field in &schema.fields {
            validate(&field.name, &field.schema, values.get(&field.name))?;
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &ConnectSchema {
        &self.schema
    }

    /// Read a field, substituting the schema default for a null value.
    ///
    /// Returns `None` only for names the schema does not declare.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let field = self.schema.field(name)?;
        match self.values.get(name) {
            Some(v) if !v.is_null() => Some(v),
            _ => Some(field.schema.default_value.as_ref().unwrap_or(&NULL)),
        }
    }

    /// Read a field exactly as it arrived, never applying a default.
    pub fn get_without_default(&self, name: &str) -> Option<&Value> {
        self.schema.field(name)?;
        Some(self.values.get(name).unwrap_or(&NULL))
    }

    /// Read a nested struct field; `Ok(None)` when the field is null.
    pub fn get_struct(&self, name: &str) -> Result<Option<Struct>, SchemaError> {
        let field =
            self.schema
                .field(name)
                .ok_or_else(|| SchemaError::UnknownField {
                    field: name.to_string(),
                })?;
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => {
                Struct::new(Arc::new(field.schema.clone()), v.clone()).map(Some)
            }
        }
    }

    /// Schemaless JSON text of this struct.
    ///
    /// Only declared fields are kept, in schema order. Decimals are written
    /// as exact JSON numbers.
    pub fn to_json_string(&self) -> Result<String, SchemaError> {
        let rendered = render_fields(&self.schema, &self.values)?;
        Ok(serde_json::to_string(&rendered)?)
    }
}

/// Value tree ready for serialization.
enum Rendered {
    Plain(Value),
    Decimal(Box<RawValue>),
    Seq(Vec<Rendered>),
    Fields(IndexMap<String, Rendered>),
}

impl Serialize for Rendered {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rendered::Plain(value) => value.serialize(serializer),
            Rendered::Decimal(raw) => raw.serialize(serializer),
            Rendered::Seq(items) => items.serialize(serializer),
            Rendered::Fields(fields) => fields.serialize(serializer),
        }
    }
}

fn render_fields(
    schema: &ConnectSchema,
    obj: &Map<String, Value>,
) -> Result<Rendered, SchemaError> {
    let mut out = IndexMap::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let v = obj.get(&field.name).unwrap_or(&NULL);
        let rendered = render(&field.schema, v).map_err(|e| match e {
            SchemaError::Decimal { field: f, details } if f.is_empty() => {
                SchemaError::Decimal {
                    field: field.name.clone(),
                    details,
                }
            }
            other => other,
        })?;
        out.insert(field.name.clone(), rendered);
    }
    Ok(Rendered::Fields(out))
}

fn render(schema: &ConnectSchema, value: &Value) -> Result<Rendered, SchemaError> {
    let rendered = match (schema.kind, value) {
        (_, Value::Null) => Rendered::Plain(Value::Null),
        (SchemaType::Struct, Value::Object(obj)) => render_fields(schema, obj)?,
        (SchemaType::Array, Value::Array(items)) => match &schema.items {
            Some(item_schema) => Rendered::Seq(
                items
                    .iter()
                    .map(|i| render(item_schema, i))
                    .collect::<Result<_, _>>()?,
            ),
            None => Rendered::Plain(value.clone()),
        },
        (SchemaType::Bytes, Value::String(_))
            if schema.name.as_deref() == Some(DECIMAL_LOGICAL_NAME) =>
        {
            let text = decode_decimal(value, decimal_scale(schema)?)?;
            let raw = RawValue::from_string(text).map_err(|e| SchemaError::Decimal {
                field: String::new(),
                details: e.to_string().into(),
            })?;
            Rendered::Decimal(raw)
        }
        _ => Rendered::Plain(value.clone()),
    };
    Ok(rendered)
}

fn validate(
    path: &str,
    schema: &ConnectSchema,
    value: Option<&Value>,
) -> Result<(), SchemaError> {
    let value = match value {
        None | Some(Value::Null) => {
            if schema.optional || schema.default_value.is_some() {
                return Ok(());
            }
            return Err(SchemaError::MissingRequired {
                field: path.to_string(),
            });
        }
        Some(v) => v,
    };

    let compatible = match schema.kind {
        k if k.is_integer() => value.is_i64() || value.is_u64(),
        SchemaType::Float32 | SchemaType::Float64 => value.is_number(),
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::String => value.is_string(),
        // base64 text, or a plain number for numerically encoded decimals
        SchemaType::Bytes => value.is_string() || value.is_number(),
        SchemaType::Array => value.is_array(),
        // maps with non-string keys arrive as arrays of [key, value] pairs
        SchemaType::Map => value.is_object() || value.is_array(),
        SchemaType::Struct => value.is_object(),
        _ => false,
    };
    if !compatible {
        return Err(SchemaError::TypeMismatch {
            field: path.to_string(),
            expected: schema.kind,
            found: json_kind(value),
        });
    }

    match (schema.kind, value) {
        (SchemaType::Struct, Value::Object(obj)) => {
            for field in &schema.fields {
                let child = format!("{path}.{}", field.name);
                validate(&child, &field.schema, obj.get(&field.name))?;
            }
        }
        (SchemaType::Array, Value::Array(items)) => {
            if let Some(item_schema) = &schema.items {
                for (i, item) in items.iter().enumerate() {
                    validate(&format!("{path}[{i}]"), item_schema, Some(item))?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Decimals
// ============================================================================

/// Scale declared on a Connect `Decimal` schema (0 when absent).
pub fn decimal_scale(schema: &ConnectSchema) -> Result<u32, SchemaError> {
    let Some(raw) = schema.parameter(DECIMAL_SCALE_PARAM) else {
        return Ok(0);
    };
    raw.trim()
        .parse::<u32>()
        .map_err(|_| SchemaError::Decimal {
            field: String::new(),
            details: format!("invalid scale parameter {raw:?}").into(),
        })
}

/// Render a Connect decimal as plain decimal text.
///
/// Accepts the two converter encodings: base64 of the big-endian two's
/// complement unscaled value, or an already numeric JSON value.
///
/// Scales above [`MAX_DECIMAL_SCALE`] are rejected.
pub fn decode_decimal(value: &Value, scale: u32) -> Result<String, SchemaError> {
    if scale > MAX_DECIMAL_SCALE {
        return Err(SchemaError::Decimal {
            field: String::new(),
            details: format!("scale {scale} exceeds {MAX_DECIMAL_SCALE}").into(),
        });
    }
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(encoded) => {
            let bytes = STANDARD.decode(encoded).map_err(|e| {
                SchemaError::Decimal {
                    field: String::new(),
                    details: format!("base64: {e}").into(),
                }
            })?;
            let unscaled = unscaled_from_be_bytes(&bytes)?;
            Ok(format_scaled(unscaled, scale))
        }
        other => Err(SchemaError::Decimal {
            field: String::new(),
            details: format!("unexpected {} value", json_kind(other)).into(),
        }),
    }
}

fn unscaled_from_be_bytes(bytes: &[u8]) -> Result<i128, SchemaError> {
    if bytes.len() > 16 {
        return Err(SchemaError::Decimal {
            field: String::new(),
            details: format!("{} byte unscaled value exceeds 128 bits", bytes.len())
                .into(),
        });
    }
    let negative = bytes.first().is_some_and(|b| b & 0x80 != 0);
    let mut buf = if negative { [0xFF; 16] } else { [0u8; 16] };
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buf))
}

fn format_scaled(unscaled: i128, scale: u32) -> String {
    let sign = if unscaled < 0 { "-" } else { "" };
    let digits = unscaled.unsigned_abs().to_string();
    if scale == 0 {
        return format!("{sign}{digits}");
    }
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{digits}", "0".repeat(scale - digits.len() + 1))
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}
