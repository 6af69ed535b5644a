use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use doris_core::ConnectSchema;
use doris_core::schema::{
    DECIMAL_LOGICAL_NAME, MAX_DECIMAL_SCALE, decimal_scale, decode_decimal,
    json_kind,
};
use serde_json::Value;

use super::{ConnectType, TypeError};

const PRECISION_PARAM: &str = "connect.decimal.precision";
const MAX_DECIMAL_PRECISION: u32 = 38;

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn unexpected(type_name: &'static str, value: &Value) -> TypeError {
    TypeError::Unexpected {
        type_name,
        found: json_kind(value),
    }
}

fn out_of_range(type_name: &'static str, value: impl ToString) -> TypeError {
    TypeError::OutOfRange {
        type_name,
        value: value.to_string(),
    }
}

fn as_i64(type_name: &'static str, value: &Value) -> Result<i64, TypeError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| out_of_range(type_name, n)),
        other => Err(unexpected(type_name, other)),
    }
}

/// Split an epoch offset counted in `1 / units_per_sec` seconds.
fn split_epoch(value: i64, units_per_sec: i64) -> (i64, u32) {
    let secs = value.div_euclid(units_per_sec);
    let nanos = value.rem_euclid(units_per_sec) * (1_000_000_000 / units_per_sec);
    (secs, nanos as u32)
}

// ============================================================================
// Decimals
// ============================================================================

/// `org.apache.kafka.connect.data.Decimal`: fixed scale in the schema.
pub struct DecimalType;

impl ConnectType for DecimalType {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &[DECIMAL_LOGICAL_NAME]
    }

    fn get_value(&self, value: &Value, schema: &ConnectSchema) -> Result<Value, TypeError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::String(decode_decimal(value, decimal_scale(schema)?)?))
    }

    fn type_name(&self, schema: &ConnectSchema) -> String {
        let precision = schema
            .parameter(PRECISION_PARAM)
            .and_then(|p| p.parse::<u32>().ok());
        match (precision, decimal_scale(schema)) {
            (Some(p), Ok(scale)) if p > 0 && p <= MAX_DECIMAL_PRECISION => {
                format!("DECIMAL({p},{})", scale.min(p))
            }
            _ => "STRING".to_string(),
        }
    }
}

/// `io.debezium.data.VariableScaleDecimal`: a `{scale, value}` struct.
pub struct VariableScaleDecimalType;

impl ConnectType for VariableScaleDecimalType {
    fn name(&self) -> &'static str {
        "variable_scale_decimal"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["io.debezium.data.VariableScaleDecimal"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        let obj = match value {
            Value::Null => return Ok(Value::Null),
            Value::Object(obj) => obj,
            other => return Err(unexpected(self.name(), other)),
        };
        let scale = obj
            .get("scale")
            .and_then(Value::as_u64)
            .and_then(|s| u32::try_from(s).ok())
            .ok_or_else(|| TypeError::Invalid {
                type_name: self.name(),
                details: "missing or negative scale".to_string(),
            })?;
        if scale > MAX_DECIMAL_SCALE {
            return Err(TypeError::Invalid {
                type_name: self.name(),
                details: format!("scale {scale} exceeds {MAX_DECIMAL_SCALE}"),
            });
        }
        let unscaled = obj.get("value").ok_or_else(|| TypeError::Invalid {
            type_name: self.name(),
            details: "missing value".to_string(),
        })?;
        Ok(Value::String(decode_decimal(unscaled, scale)?))
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "STRING".to_string()
    }
}

// ============================================================================
// Temporal
// ============================================================================

/// Days since the epoch, rendered `YYYY-MM-DD`.
pub struct DateType;

impl ConnectType for DateType {
    fn name(&self) -> &'static str {
        "date"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["org.apache.kafka.connect.data.Date", "io.debezium.time.Date"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let days = as_i64(self.name(), value)?;
        let date = i32::try_from(days)
            .ok()
            .and_then(|d| d.checked_add(UNIX_EPOCH_DAYS_FROM_CE))
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .ok_or_else(|| out_of_range(self.name(), days))?;
        Ok(Value::String(date.format("%Y-%m-%d").to_string()))
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "DATE".to_string()
    }
}

/// Time of day, rendered `HH:MM:SS[.fraction]`.
pub struct TimeType {
    name: &'static str,
    keys: &'static [&'static str],
    units_per_sec: i64,
}

impl TimeType {
    pub const MILLIS: TimeType = TimeType {
        name: "time",
        keys: &["org.apache.kafka.connect.data.Time", "io.debezium.time.Time"],
        units_per_sec: 1_000,
    };
    pub const MICROS: TimeType = TimeType {
        name: "micro_time",
        keys: &["io.debezium.time.MicroTime"],
        units_per_sec: 1_000_000,
    };
    pub const NANOS: TimeType = TimeType {
        name: "nano_time",
        keys: &["io.debezium.time.NanoTime"],
        units_per_sec: 1_000_000_000,
    };
}

impl ConnectType for TimeType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        self.keys
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let raw = as_i64(self.name, value)?;
        let (secs, nanos) = split_epoch(raw, self.units_per_sec);
        let time = u32::try_from(secs)
            .ok()
            .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, nanos))
            .ok_or_else(|| out_of_range(self.name, raw))?;
        Ok(Value::String(time.format("%H:%M:%S%.f").to_string()))
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "STRING".to_string()
    }
}

/// Epoch offset, rendered `YYYY-MM-DD HH:MM:SS[.fraction]` in UTC.
pub struct TimestampType {
    name: &'static str,
    keys: &'static [&'static str],
    units_per_sec: i64,
    column_type: &'static str,
}

impl TimestampType {
    pub const MILLIS: TimestampType = TimestampType {
        name: "timestamp",
        keys: &[
            "org.apache.kafka.connect.data.Timestamp",
            "io.debezium.time.Timestamp",
        ],
        units_per_sec: 1_000,
        column_type: "DATETIME(3)",
    };
    pub const MICROS: TimestampType = TimestampType {
        name: "micro_timestamp",
        keys: &["io.debezium.time.MicroTimestamp"],
        units_per_sec: 1_000_000,
        column_type: "DATETIME(6)",
    };
    pub const NANOS: TimestampType = TimestampType {
        name: "nano_timestamp",
        keys: &["io.debezium.time.NanoTimestamp"],
        units_per_sec: 1_000_000_000,
        column_type: "DATETIME(6)",
    };
}

impl ConnectType for TimestampType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        self.keys
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let raw = as_i64(self.name, value)?;
        let (secs, nanos) = split_epoch(raw, self.units_per_sec);
        let ts: NaiveDateTime = DateTime::<Utc>::from_timestamp(secs, nanos)
            .ok_or_else(|| out_of_range(self.name, raw))?
            .naive_utc();
        Ok(Value::String(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        self.column_type.to_string()
    }
}

/// ISO-8601 text with an offset, normalized to UTC.
pub struct ZonedTimestampType;

impl ConnectType for ZonedTimestampType {
    fn name(&self) -> &'static str {
        "zoned_timestamp"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["io.debezium.time.ZonedTimestamp"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        let text = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) => s,
            other => return Err(unexpected(self.name(), other)),
        };
        let ts = DateTime::parse_from_rfc3339(text).map_err(|e| TypeError::Invalid {
            type_name: self.name(),
            details: format!("{text:?}: {e}"),
        })?;
        Ok(Value::String(
            ts.with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
        ))
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "DATETIME(6)".to_string()
    }
}

// ============================================================================
// Textual
// ============================================================================

/// `io.debezium.data.Json`
pub struct JsonType;

impl ConnectType for JsonType {
    fn name(&self) -> &'static str {
        "json"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &["io.debezium.data.Json"]
    }

    fn get_value(&self, value: &Value, _: &ConnectSchema) -> Result<Value, TypeError> {
        match value {
            Value::Null | Value::String(_) => Ok(value.clone()),
            other => Err(unexpected(self.name(), other)),
        }
    }

    fn type_name(&self, _: &ConnectSchema) -> String {
        "JSON".to_string()
    }
}

/// String-backed logical types without special handling.
pub struct TextType;

impl ConnectType for TextType {
    fn name(&self) -> &'static str {
        "text"
    }

    fn registry_keys(&self) -> &'static [&'static str] {
        &[
            "io.debezium.data.Enum",
            "io.debezium.data.EnumSet",
            "io.debezium.data.Uuid",
            "io.debezium.data.Xml",
        ]
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
