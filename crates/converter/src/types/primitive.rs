use doris_core::ConnectSchema;
use doris_core::schema::json_kind;
use serde_json::Value;

use super::{ConnectType, TypeError};

/// Column length propagated by Debezium when `column.propagate.source.type`
/// is enabled.
pub const SOURCE_COLUMN_LENGTH: &str = "__debezium.source.column.length";

/// Largest VARCHAR length the destination accepts, in bytes.
const MAX_VARCHAR_SIZE: u64 = 65533;

fn unexpected(type_name: &'static str, value: &Value) -> TypeError {
    TypeError::Unexpected {
        type_name,
        found: json_kind(value),
    }
}

pub struct IntType {
    name: &'static str,
    keys: &'static [&'static str],
    min: i64,
    max: i64,
    column_type: &'static str,
}

impl IntType {
    pub const INT8: IntType = IntType {
        name: "int8",
        keys: &["INT8"],
        min: i8::MIN as i64,
        max: i8::MAX as i64,
        column_type: "TINYINT",
    };
    pub const INT16: IntType = IntType {
        name: "int16",
        keys: &["INT16"],
        min: i16::MIN as i64,
        max: i16::MAX as i64,
        column_type: "SMALLINT",
    };
    pub const INT32: IntType = IntType {
        name: "int32",
        keys: &["INT32"],
        min: i32::MIN as i64,
        max: i32::MAX as i64,
        column_type: "INT",
    };
    pub const INT64: IntType = IntType {
        name: "int64",
        keys: &["INT64"],
        min: i64::MIN,
        max: i64::MAX,
        column_type: "BIGINT",
    };
}

impl ConnectType for IntType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        self.keys
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Number(n) => match n.as_i64() {
                Some(v) if (self.min..=self.max).contains(&v) => Ok(value.clone()),
                _ => Err(TypeError::OutOfRange {
                    type_name: self.name,
                    value: n.to_string(),
                }),
            },
            other => Err(unexpected(self.name, other)),
        }
    }

    fn is_number(&self) -> bool {
        true
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        self.column_type.to_string()
    }
}

pub struct FloatType {
    name: &'static str,
    keys: &'static [&'static str],
    column_type: &'static str,
}

impl FloatType {
    pub const FLOAT32: FloatType = FloatType {
        name: "float32",
        keys: &["FLOAT32"],
        column_type: "FLOAT",
    };
    pub const FLOAT64: FloatType = FloatType {
        name: "float64",
        keys: &["FLOAT64"],
        column_type: "DOUBLE",
    };
}

impl ConnectType for FloatType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        self.keys
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        match value {
            Value::Null | Value::Number(_) => Ok(value.clone()),
            other => Err(unexpected(self.name, other)),
        }
    }

    fn is_number(&self) -> bool {
        true
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        self.column_type.to_string()
    }
}

pub struct BooleanType;

impl ConnectType for BooleanType {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["BOOLEAN"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        match value {
            Value::Null | Value::Bool(_) => Ok(value.clone()),
            other => Err(unexpected(self.name(), other)),
        }
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "BOOLEAN".to_string()
    }
}

pub struct StringType;

impl ConnectType for StringType {
    fn name(&self) -> &'static str {
        "string"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["STRING"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        match value {
            Value::Null | Value::String(_) => Ok(value.clone()),
            other => Err(unexpected(self.name(), other)),
        }
    }

    /// VARCHAR sized for UTF-8 (3 bytes per character) when the source
    /// length is known and fits, STRING otherwise.
    fn type_name(&self, schema: &ConnectSchema) -> String {
        schema
            .parameter(SOURCE_COLUMN_LENGTH)
            .and_then(|l| l.parse::<u64>().ok())
            .map(|len| len.saturating_mul(3))
            .filter(|size| *size > 0 && *size <= MAX_VARCHAR_SIZE)
            .map(|size| format!("VARCHAR({size})"))
            .unwrap_or_else(|| "STRING".to_string())
    }
}

/// Raw bytes, carried as base64 text.
pub struct BytesType;

impl ConnectType for BytesType {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["BYTES"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        match value {
            Value::Null | Value::String(_) => Ok(value.clone()),
            other => Err(unexpected(self.name(), other)),
        }
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "STRING".to_string()
    }
}

/// Arrays and maps, emitted as JSON text.
pub struct ContainerType;

impl ConnectType for ContainerType {
    fn name(&self) -> &'static str {
        "container"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["ARRAY", "MAP"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        match value {
            Value::Null | Value::Array(_) | Value::Object(_) => Ok(value.clone()),
            other => Err(unexpected(self.name(), other)),
        }
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "STRING".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doris_core::SchemaType;
    use serde_json::json;

    #[test]
    fn ints_are_range_checked() {
        let schema = ConnectSchema::new(SchemaType::Int8);
        assert_eq!(IntType::INT8.get_value(&json!(42), &schema).unwrap(), json!(42));
        assert!(matches!(
            IntType::INT8.get_value(&json!(300), &schema),
            Err(TypeError::OutOfRange { .. })
        ));
        assert!(IntType::INT64.get_value(&json!("1"), &schema).is_err());
        assert_eq!(IntType::INT64.get_value(&Value::Null, &schema).unwrap(), Value::Null);
    }

    #[test]
    fn string_column_type_follows_source_length() {
        let sized = ConnectSchema::new(SchemaType::String)
            .with_parameter(SOURCE_COLUMN_LENGTH, "255");
        assert_eq!(StringType.type_name(&sized), "VARCHAR(765)");

        let huge = ConnectSchema::new(SchemaType::String)
            .with_parameter(SOURCE_COLUMN_LENGTH, "30000");
        assert_eq!(StringType.type_name(&huge), "STRING");

        assert_eq!(StringType.type_name(&ConnectSchema::new(SchemaType::String)), "STRING");
    }

    #[test]
    fn destination_types() {
        let s = ConnectSchema::new(SchemaType::Int32);
        assert_eq!(IntType::INT16.type_name(&s), "SMALLINT");
        assert_eq!(IntType::INT32.type_name(&s), "INT");
        assert_eq!(FloatType::FLOAT64.type_name(&s), "DOUBLE");
        assert_eq!(BooleanType.type_name(&s), "BOOLEAN");
        assert_eq!(ContainerType.type_name(&s), "STRING");
    }
}
