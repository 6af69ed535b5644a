//! JSON-lines record input.

use anyhow::{Context, Result};
use doris_core::SinkRecord;
use serde::Deserialize;
use serde_json::Value;

/// One input line: `{"topic", "partition", "offset", "key", "value"}`.
///
/// `key` and `value` are JSON converter output, either plain JSON or a
/// `{"schema", "payload"}` object. A missing value is a tombstone.
#[derive(Debug, Clone, Deserialize)]
pub struct InputRecord {
    pub topic: String,
    #[serde(default)]
    pub partition: i32,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub key: Option<Value>,
    #[serde(default)]
    pub value: Value,
}

impl InputRecord {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("parse input line")
    }

    pub fn into_sink_record(self) -> Result<SinkRecord> {
        SinkRecord::from_connect_json(
            self.topic,
            self.partition,
            self.offset,
            self.key.as_ref(),
            &self.value,
        )
        .context("decode record")
    }
}
