use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use tracing::error;

use crate::ConfigError;

/// `^[a-zA-Z][a-zA-Z0-9_]*$`
pub fn is_valid_table_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse `topic1:table1,topic2:table2`.
///
/// Every pair needs a non-empty topic and table; a topic may appear once.
pub fn parse_topic_to_table_map(
    input: &str,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut map = BTreeMap::new();
    for pair in input.split(',') {
        let parts: Vec<&str> = pair.split(':').collect();
        let (topic, table) = match parts.as_slice() {
            [topic, table] if !topic.trim().is_empty() && !table.trim().is_empty() => {
                (topic.trim(), table.trim())
            }
            _ => {
                error!(input = %input, "invalid topic2table format");
                return Err(ConfigError::TopicMap {
                    details: format!("malformed pair {pair:?}"),
                });
            }
        };
        if map.insert(topic.to_string(), table.to_string()).is_some() {
            error!(topic = %topic, "duplicated topic in topic2table");
            return Err(ConfigError::TopicMap {
                details: format!("topic {topic} is duplicated"),
            });
        }
    }
    Ok(map)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TopicMapRepr {
    Compact(String),
    Map(BTreeMap<String, String>),
}

pub(crate) fn deserialize_topic_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<TopicMapRepr>::deserialize(deserializer)? {
        None => Ok(BTreeMap::new()),
        Some(TopicMapRepr::Map(map)) => Ok(map),
        Some(TopicMapRepr::Compact(s)) if s.trim().is_empty() => Ok(BTreeMap::new()),
        Some(TopicMapRepr::Compact(s)) => {
            parse_topic_to_table_map(&s).map_err(serde::de::Error::custom)
        }
    }
}
