// logsink/src/storage/record.rs
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

/// Ingest payload shape. Legacy bodies carry flat request/response fields;
/// structured bodies describe an event with nested `request`, `response`,
/// `actor` and `metadata` objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Legacy,
    Structured,
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordShape::Legacy => write!(f, "legacy"),
            RecordShape::Structured => write!(f, "structured"),
        }
    }
}

/// One ingested log entry, normalized for persistence. Every field except the
/// timestamp is optional; absent fields are stored as NULL (or BSON null) so
/// both shapes share a single schema.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub shape: RecordShape,
    pub timestamp: DateTime<Utc>,
    pub api_url: Option<String>,
    pub headers: Option<Value>,
    pub request_body: Option<Value>,
    pub response_body: Option<Value>,
    pub user_id: Option<String>,
    pub event: Option<String>,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub actor: Option<Value>,
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub metadata: Option<Value>,
}

/// A body is structured when any of these keys is present with a non-null
/// value; otherwise it is legacy.
const STRUCTURED_KEYS: &[&str] = &["event", "entity", "request", "response", "metadata", "actor"];

pub fn classify(body: &Value) -> RecordShape {
    let structured = STRUCTURED_KEYS
        .iter()
        .any(|key| body.get(key).is_some_and(|v| !v.is_null()));
    if structured {
        RecordShape::Structured
    } else {
        RecordShape::Legacy
    }
}

impl LogRecord {
    /// Builds a record from an arbitrary ingest body. Never fails: fields of
    /// an unexpected type are treated as absent rather than rejected.
    pub fn from_ingest(body: &Value, timestamp: DateTime<Utc>) -> LogRecord {
        match classify(body) {
            RecordShape::Legacy => LogRecord {
                shape: RecordShape::Legacy,
                timestamp,
                api_url: string_field(body, "apiUrl"),
                headers: json_field(body, "headers"),
                request_body: json_field(body, "requestBody"),
                response_body: json_field(body, "responseBody"),
                user_id: string_field(body, "userId"),
                event: None,
                entity: None,
                entity_id: None,
                actor: None,
                request: None,
                response: None,
                metadata: None,
            },
            // The flat compatibility columns are derived from the nested
            // objects; any flat fields supplied alongside them are ignored.
            RecordShape::Structured => LogRecord {
                shape: RecordShape::Structured,
                timestamp,
                api_url: nested_string(body, "request", "path"),
                headers: nested_json(body, "request", "headers"),
                request_body: nested_json(body, "request", "body"),
                response_body: nested_json(body, "response", "body"),
                user_id: nested_string(body, "actor", "id"),
                event: string_field(body, "event"),
                entity: string_field(body, "entity"),
                entity_id: string_field(body, "entityId"),
                actor: json_field(body, "actor"),
                request: json_field(body, "request"),
                response: json_field(body, "response"),
                metadata: json_field(body, "metadata"),
            },
        }
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn json_field(body: &Value, key: &str) -> Option<Value> {
    body.get(key).filter(|v| !v.is_null()).cloned()
}

fn nested_string(body: &Value, key: &str, sub: &str) -> Option<String> {
    body.get(key)
        .and_then(|v| v.get(sub))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn nested_json(body: &Value, key: &str, sub: &str) -> Option<Value> {
    body.get(key)
        .and_then(|v| v.get(sub))
        .filter(|v| !v.is_null())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_legacy_body() {
        let body = json!({
            "apiUrl": "/api/orders",
            "userId": "u-1",
            "requestBody": {"qty": 2}
        });
        assert_eq!(classify(&body), RecordShape::Legacy);
    }

    #[test]
    fn test_classify_structured_body() {
        assert_eq!(classify(&json!({"event": "order.created"})), RecordShape::Structured);
        assert_eq!(classify(&json!({"metadata": {"k": "v"}})), RecordShape::Structured);
        assert_eq!(classify(&json!({"actor": {"id": "u-1"}})), RecordShape::Structured);
    }

    #[test]
    fn test_classify_null_marker_keys_stay_legacy() {
        let body = json!({"event": null, "request": null, "apiUrl": "/x"});
        assert_eq!(classify(&body), RecordShape::Legacy);
    }

    #[test]
    fn test_classify_entity_id_alone_stays_legacy() {
        // entityId is not a marker key on its own.
        assert_eq!(classify(&json!({"entityId": "42"})), RecordShape::Legacy);
    }

    #[test]
    fn test_legacy_record_fields() {
        let body = json!({
            "apiUrl": "/api/orders",
            "headers": {"x-request-id": "abc"},
            "requestBody": {"qty": 2},
            "responseBody": {"ok": true},
            "userId": "u-1"
        });
        let record = LogRecord::from_ingest(&body, Utc::now());

        assert_eq!(record.shape, RecordShape::Legacy);
        assert_eq!(record.api_url.as_deref(), Some("/api/orders"));
        assert_eq!(record.headers, Some(json!({"x-request-id": "abc"})));
        assert_eq!(record.request_body, Some(json!({"qty": 2})));
        assert_eq!(record.response_body, Some(json!({"ok": true})));
        assert_eq!(record.user_id.as_deref(), Some("u-1"));
        assert!(record.event.is_none());
        assert!(record.request.is_none());
        assert!(record.metadata.is_none());
    }

    #[test]
    fn test_legacy_partial_body_leaves_rest_absent() {
        let body = json!({"apiUrl": "/health"});
        let record = LogRecord::from_ingest(&body, Utc::now());

        assert_eq!(record.api_url.as_deref(), Some("/health"));
        assert!(record.headers.is_none());
        assert!(record.request_body.is_none());
        assert!(record.response_body.is_none());
        assert!(record.user_id.is_none());
    }

    #[test]
    fn test_structured_record_derives_flat_fields() {
        let body = json!({
            "event": "order.created",
            "entity": "order",
            "entityId": "o-77",
            "actor": {"id": "u-9", "role": "admin"},
            "request": {
                "path": "/api/orders",
                "headers": {"x-request-id": "abc"},
                "body": {"qty": 2}
            },
            "response": {"status": 201, "body": {"id": "o-77"}},
            "metadata": {"region": "eu"}
        });
        let record = LogRecord::from_ingest(&body, Utc::now());

        assert_eq!(record.shape, RecordShape::Structured);
        assert_eq!(record.event.as_deref(), Some("order.created"));
        assert_eq!(record.entity.as_deref(), Some("order"));
        assert_eq!(record.entity_id.as_deref(), Some("o-77"));
        // Flat columns come from the nested objects.
        assert_eq!(record.api_url.as_deref(), Some("/api/orders"));
        assert_eq!(record.headers, Some(json!({"x-request-id": "abc"})));
        assert_eq!(record.request_body, Some(json!({"qty": 2})));
        assert_eq!(record.response_body, Some(json!({"id": "o-77"})));
        assert_eq!(record.user_id.as_deref(), Some("u-9"));
    }

    #[test]
    fn test_structured_absent_subfields_derive_null() {
        let body = json!({
            "event": "user.login",
            "response": {"status": 204}
        });
        let record = LogRecord::from_ingest(&body, Utc::now());

        assert_eq!(record.shape, RecordShape::Structured);
        assert!(record.api_url.is_none());
        assert!(record.headers.is_none());
        assert!(record.request_body.is_none());
        assert!(record.response_body.is_none());
        assert!(record.user_id.is_none());
        assert_eq!(record.response, Some(json!({"status": 204})));
    }

    #[test]
    fn test_structured_ignores_flat_fields_in_body() {
        // A structured body that also carries legacy flat fields: the nested
        // objects win, even when that means deriving nothing.
        let body = json!({
            "apiUrl": "/should-be-ignored",
            "userId": "ignored",
            "event": "ping",
            "request": {"headers": {"h": "1"}}
        });
        let record = LogRecord::from_ingest(&body, Utc::now());

        assert_eq!(record.shape, RecordShape::Structured);
        assert!(record.api_url.is_none());
        assert!(record.user_id.is_none());
        assert_eq!(record.headers, Some(json!({"h": "1"})));
    }

    #[test]
    fn test_non_string_scalars_treated_as_absent() {
        let body = json!({"apiUrl": 42, "userId": {"nested": true}});
        let record = LogRecord::from_ingest(&body, Utc::now());
        assert!(record.api_url.is_none());
        assert!(record.user_id.is_none());

        let body = json!({"event": "x", "actor": {"id": 7}});
        let record = LogRecord::from_ingest(&body, Utc::now());
        assert!(record.user_id.is_none());
        assert_eq!(record.actor, Some(json!({"id": 7})));
    }

    #[test]
    fn test_empty_body_is_legacy_with_all_fields_absent() {
        let record = LogRecord::from_ingest(&json!({}), Utc::now());
        assert_eq!(record.shape, RecordShape::Legacy);
        assert!(record.api_url.is_none());
        assert!(record.user_id.is_none());
        assert!(record.event.is_none());
    }

    #[test]
    fn test_non_object_body_is_legacy_with_all_fields_absent() {
        for body in [json!(5), json!("log line"), json!([1, 2, 3]), json!(null)] {
            let record = LogRecord::from_ingest(&body, Utc::now());
            assert_eq!(record.shape, RecordShape::Legacy, "body: {body}");
            assert!(record.api_url.is_none());
            assert!(record.headers.is_none());
            assert!(record.request_body.is_none());
            assert!(record.user_id.is_none());
            assert!(record.event.is_none());
        }
    }

    #[test]
    fn test_false_marker_value_is_structured() {
        // Only null marker values count as absent; `false` does not.
        let body = json!({"actor": false});
        assert_eq!(classify(&body), RecordShape::Structured);

        let record = LogRecord::from_ingest(&body, Utc::now());
        assert_eq!(record.shape, RecordShape::Structured);
        assert_eq!(record.actor, Some(json!(false)));
        assert!(record.api_url.is_none());
        assert!(record.user_id.is_none());
    }
}
