use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Presets keyed by their unique name.
pub type PresetMap = BTreeMap<String, PresetRecord>;

/// A stored preset. Early versions of the node saved a bare positive string,
/// so both shapes are accepted on read and written back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PresetRecord {
    Legacy(String),
    Detailed(PresetDetails),
}

/// Positive/negative prompt texts plus the bookkeeping shown in the browser.
///
/// Fields are read leniently: a missing or `null` field takes its default and
/// an unreadable timestamp is treated as absent. Fields this type does not
/// know are kept in `extra` and written back on save.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PresetDetails {
    #[serde(deserialize_with = "null_as_default")]
    pub positive: String,
    #[serde(deserialize_with = "null_as_default")]
    pub negative: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub usage_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub favorite: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339 text or epoch milliseconds; anything else reads as `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(millis)) => millis.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

impl PresetDetails {
    /// A fresh record stamped with `now` for both timestamps.
    pub fn new(positive: String, negative: String, now: DateTime<Utc>) -> Self {
        Self {
            positive,
            negative,
            created: Some(now),
            modified: Some(now),
            ..Default::default()
        }
    }
}

impl PresetRecord {
    pub fn positive(&self) -> &str {
        match self {
            PresetRecord::Legacy(text) => text,
            PresetRecord::Detailed(details) => &details.positive,
        }
    }

    pub fn negative(&self) -> &str {
        match self {
            PresetRecord::Legacy(_) => "",
            PresetRecord::Detailed(details) => &details.negative,
        }
    }

    pub fn details(&self) -> Option<&PresetDetails> {
        match self {
            PresetRecord::Legacy(_) => None,
            PresetRecord::Detailed(details) => Some(details),
        }
    }

    pub fn details_mut(&mut self) -> Option<&mut PresetDetails> {
        match self {
            PresetRecord::Legacy(_) => None,
            PresetRecord::Detailed(details) => Some(details),
        }
    }

    pub fn usage_count(&self) -> u64 {
        self.details().map_or(0, |d| d.usage_count)
    }

    pub fn favorite(&self) -> bool {
        self.details().is_some_and(|d| d.favorite)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.details().and_then(|d| d.created)
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.details().and_then(|d| d.modified)
    }

    /// The record as detailed fields. A legacy string becomes the positive
    /// text of a record stamped with `now`.
    pub fn into_details(self, now: DateTime<Utc>) -> PresetDetails {
        match self {
            PresetRecord::Legacy(positive) => PresetDetails::new(positive, String::new(), now),
            PresetRecord::Detailed(details) => details,
        }
    }
}

/// A preset map read one entry at a time.
#[derive(Debug, Default)]
pub struct DecodedPresets {
    pub presets: PresetMap,
    /// Entries that are not a preset, kept verbatim under their names.
    pub rejected: Map<String, Value>,
}

/// Parses a JSON object of presets. A malformed entry is logged and set
/// aside in [`DecodedPresets::rejected`] instead of failing the whole map;
/// only a document that is not a JSON object is an error.
pub fn decode_presets(contents: &str) -> serde_json::Result<DecodedPresets> {
    let entries: Map<String, Value> = serde_json::from_str(contents)?;
    let mut decoded = DecodedPresets::default();
    for (name, value) in entries {
        match PresetRecord::deserialize(&value) {
            Ok(record) => {
                decoded.presets.insert(name, record);
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Skipping unreadable preset");
                decoded.rejected.insert(name, value);
            }
        }
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_legacy_and_detailed_records() {
        let json = r#"{
            "old": "a cat",
            "partial": {"positive": "p", "negative": "n"},
            "full": {
                "positive": "x",
                "negative": "y",
                "created": "2024-03-01T10:00:00.000Z",
                "modified": "2024-03-02T10:00:00.000Z",
                "usageCount": 3,
                "description": "d",
                "tags": ["t1"],
                "favorite": true
            }
        }"#;
        let map: PresetMap = serde_json::from_str(json).unwrap();

        assert_eq!(map["old"], PresetRecord::Legacy("a cat".to_string()));
        assert_eq!(map["old"].negative(), "");

        let partial = map["partial"].details().unwrap();
        assert_eq!(partial.positive, "p");
        assert_eq!(partial.usage_count, 0);
        assert!(partial.created.is_none());

        let full = &map["full"];
        assert_eq!(full.usage_count(), 3);
        assert!(full.favorite());
        assert_eq!(full.details().unwrap().tags, vec!["t1".to_string()]);
        assert!(full.created().unwrap() < full.modified().unwrap());
    }

    #[test]
    fn test_writes_camel_case_fields() {
        let now = Utc::now();
        let record = PresetRecord::Detailed(PresetDetails::new("a".into(), "b".into(), now));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["usageCount"], 0);
        assert_eq!(value["favorite"], false);
        assert!(value.get("usage_count").is_none());
    }

    #[test]
    fn test_into_details_keeps_positive_text() {
        let now = Utc::now();
        let details = PresetRecord::Legacy("legacy text".to_string()).into_details(now);
        assert_eq!(details.positive, "legacy text");
        assert_eq!(details.negative, "");
        assert_eq!(details.created, Some(now));

        let detailed = PresetRecord::Detailed(PresetDetails::new("a".into(), "b".into(), now));
        assert_eq!(detailed.clone().into_details(Utc::now()), *detailed.details().unwrap());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let json = r#"{"positive": "p", "negative": null, "tags": null, "usageCount": null,
            "favorite": null, "description": null, "created": null, "modified": "not a date"}"#;
        let record: PresetRecord = serde_json::from_str(json).unwrap();
        let details = record.details().unwrap();
        assert_eq!(details.positive, "p");
        assert_eq!(details.negative, "");
        assert!(details.tags.is_empty());
        assert_eq!(details.usage_count, 0);
        assert!(!details.favorite);
        assert!(details.created.is_none());
        assert!(details.modified.is_none());
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let record: PresetRecord = serde_json::from_str(r#"{"created": 1700000000000}"#).unwrap();
        assert_eq!(record.created().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_unknown_fields_survive_a_round_trip() {
        let json = r#"{"positive": "p", "seed": 42, "thumbnail": {"w": 64}}"#;
        let record: PresetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.details().unwrap().extra["seed"], 42);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["thumbnail"]["w"], 64);
        assert_eq!(value["positive"], "p");
    }

    #[test]
    fn test_decode_sets_aside_bad_entries() {
        let json = r#"{"keep1": "legacy text",
            "keep2": {"positive": "p", "negative": "n", "tags": null},
            "bad": 7, "worse": {"usageCount": "lots"}}"#;
        let decoded = decode_presets(json).unwrap();
        assert_eq!(decoded.presets.len(), 2);
        assert_eq!(decoded.presets["keep1"].positive(), "legacy text");
        assert_eq!(decoded.presets["keep2"].negative(), "n");
        assert_eq!(decoded.rejected["bad"], 7);
        assert!(decoded.rejected.contains_key("worse"));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(decode_presets("[1, 2, 3]").is_err());
        assert!(decode_presets("{\"broken\": ").is_err());
    }
}
