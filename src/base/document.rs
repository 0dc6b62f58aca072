//! Firestore document model, as it appears in REST payloads and trigger events.
//!
//! Firestore encodes every field as a single-key object naming its type
//! (`{"stringValue": "hi"}`, `{"booleanValue": true}`, ...), which maps onto
//! serde's externally tagged enums.

use std::collections::BTreeMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as, skip_serializing_none};

use super::types::{EventParams, Res};

/// A typed Firestore value.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    /// `null`.
    NullValue(()),
    /// A boolean.
    BooleanValue(bool),
    /// 64-bit integers travel as strings; bare numbers are accepted too.
    IntegerValue(#[serde_as(as = "PickFirst<(DisplayFromStr, _)>")] i64),
    /// Non-finite values travel as `"NaN"`, `"Infinity"` or `"-Infinity"`.
    DoubleValue(#[serde_as(as = "PickFirst<(_, DisplayFromStr)>")] f64),
    /// An RFC 3339 timestamp.
    TimestampValue(DateTime<Utc>),
    /// A UTF-8 string.
    StringValue(String),
    /// Base64-encoded bytes.
    BytesValue(String),
    /// Resource name of another document.
    ReferenceValue(String),
    /// A point on the globe.
    GeoPointValue(LatLng),
    /// An ordered list of values.
    ArrayValue(ArrayValue),
    /// Nested fields.
    MapValue(MapValue),
}

/// Latitude and longitude, in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Degrees north.
    #[serde(default)]
    pub latitude: f64,
    /// Degrees east.
    #[serde(default)]
    pub longitude: f64,
}

/// Body of an `arrayValue`; empty arrays omit `values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    /// The elements.
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

/// Body of a `mapValue`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    /// The nested fields, by name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl FieldValue {
    /// An array of `values`.
    pub fn array(values: impl IntoIterator<Item = FieldValue>) -> Self {
        Self::ArrayValue(ArrayValue { values: values.into_iter().collect() })
    }

    /// The string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::StringValue(value.to_string())
    }
}

/// A Firestore document resource.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name: `projects/{p}/databases/{d}/documents/{path}`.
    pub name: Option<String>,
    /// Top-level fields, by name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Set by the server; absent on writes.
    pub create_time: Option<DateTime<Utc>>,
    /// Set by the server; absent on writes.
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The string value of `field`; `None` if it is missing or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_str)
    }
}

/// Payload of a Firestore document trigger.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEventData {
    /// The document after the change; the created document for create events.
    pub value: Option<Document>,
    /// The document before the change; absent for create events.
    pub old_value: Option<Document>,
    /// Fields touched by an update.
    pub update_mask: Option<DocumentMask>,
}

/// A set of field paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    /// Dotted field paths.
    #[serde(default)]
    pub field_paths: Vec<String>,
}

// Paths.

/// Collection path holding a group's messages.
pub fn message_collection_path(class_code: &str, group_id: &str) -> String {
    format!("classes/{class_code}/groups/{group_id}/messages")
}

impl EventParams {
    /// Parse the parameters out of a message document path.
    ///
    /// Accepts a full resource name, a `documents/`-prefixed path, or a bare
    /// `classes/{c}/groups/{g}/messages/{m}` path.
    pub fn from_document_path(path: &str) -> Res<Self> {
        let relative = path
            .split_once("/documents/")
            .map(|(_, rest)| rest)
            .or_else(|| path.strip_prefix("documents/"))
            .unwrap_or(path);

        let segments = relative.split('/').collect::<Vec<_>>();

        match segments.as_slice() {
            ["classes", class_code, "groups", group_id, "messages", message_id] if !class_code.is_empty() && !group_id.is_empty() && !message_id.is_empty() => Ok(Self {
                class_code: class_code.to_string(),
                group_id: group_id.to_string(),
                message_id: message_id.to_string(),
            }),
            _ => Err(anyhow!("Document path `{path}` is not a group message.")),
        }
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_trigger_payload() {
        let payload = json!({
            "value": {
                "name": "projects/demo/databases/(default)/documents/classes/CS101/groups/g1/messages/m1",
                "fields": {
                    "text": { "stringValue": "@gemini what is 2+2?" },
                    "senderId": { "stringValue": "user123" },
                    "createdAt": { "timestampValue": "2024-03-01T10:00:00.123456Z" },
                    "deletedBy": { "arrayValue": {} },
                    "likes": { "integerValue": "3" },
                    "edited": { "booleanValue": false },
                    "meta": { "mapValue": { "fields": { "pinned": { "nullValue": null } } } }
                },
                "createTime": "2024-03-01T10:00:00.123456Z",
                "updateTime": "2024-03-01T10:00:00.123456Z"
            },
            "updateMask": {}
        });

        let data: DocumentEventData = serde_json::from_value(payload).unwrap();
        let document = data.value.unwrap();

        assert!(data.old_value.is_none());
        assert_eq!(document.get_str("text"), Some("@gemini what is 2+2?"));
        assert_eq!(document.get_str("senderId"), Some("user123"));
        assert_eq!(document.get_str("likes"), None);
        assert_eq!(document.fields.get("likes"), Some(&FieldValue::IntegerValue(3)));
        assert_eq!(document.fields.get("deletedBy"), Some(&FieldValue::array([])));
        assert!(matches!(document.fields.get("createdAt"), Some(FieldValue::TimestampValue(_))));
        assert!(matches!(document.fields.get("meta"), Some(FieldValue::MapValue(m)) if m.fields.get("pinned") == Some(&FieldValue::NullValue(()))));
    }

    #[test]
    fn test_integer_encodes_as_string() {
        let encoded = serde_json::to_value(FieldValue::IntegerValue(42)).unwrap();
        assert_eq!(encoded, json!({ "integerValue": "42" }));

        let decoded: FieldValue = serde_json::from_value(json!({ "integerValue": 42 })).unwrap();
        assert_eq!(decoded, FieldValue::IntegerValue(42));
    }

    #[test]
    fn test_double_accepts_non_finite_strings() {
        let decoded: FieldValue = serde_json::from_value(json!({ "doubleValue": "NaN" })).unwrap();
        assert!(matches!(decoded, FieldValue::DoubleValue(v) if v.is_nan()));

        let decoded: FieldValue = serde_json::from_value(json!({ "doubleValue": "-Infinity" })).unwrap();
        assert_eq!(decoded, FieldValue::DoubleValue(f64::NEG_INFINITY));

        let decoded: FieldValue = serde_json::from_value(json!({ "doubleValue": 2.5 })).unwrap();
        assert_eq!(decoded, FieldValue::DoubleValue(2.5));
    }

    #[test]
    fn test_document_omits_missing_metadata() {
        let document = Document {
            name: Some("projects/p/databases/(default)/documents/classes/c/groups/g/messages/m".to_string()),
            ..Default::default()
        };

        let encoded = serde_json::to_value(&document).unwrap();
        assert_eq!(encoded, json!({ "name": "projects/p/databases/(default)/documents/classes/c/groups/g/messages/m", "fields": {} }));
    }

    #[test]
    fn test_event_params_from_paths() {
        let expected = EventParams {
            class_code: "CS101".to_string(),
            group_id: "g1".to_string(),
            message_id: "m1".to_string(),
        };

        assert_eq!(EventParams::from_document_path("projects/demo/databases/(default)/documents/classes/CS101/groups/g1/messages/m1").unwrap(), expected);
        assert_eq!(EventParams::from_document_path("documents/classes/CS101/groups/g1/messages/m1").unwrap(), expected);
        assert_eq!(EventParams::from_document_path("classes/CS101/groups/g1/messages/m1").unwrap(), expected);
    }

    #[test]
    fn test_event_params_rejects_other_paths() {
        assert!(EventParams::from_document_path("classes/CS101/groups/g1").is_err());
        assert!(EventParams::from_document_path("users/u1/messages/m1").is_err());
        assert!(EventParams::from_document_path("classes/CS101/groups/g1/messages/m1/reactions/r1").is_err());
        assert!(EventParams::from_document_path("classes//groups/g1/messages/m1").is_err());
    }

    #[test]
    fn test_message_collection_path() {
        assert_eq!(message_collection_path("CS101", "g1"), "classes/CS101/groups/g1/messages");
    }
}
