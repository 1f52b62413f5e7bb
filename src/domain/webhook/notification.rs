//! Normalization of heterogeneous notification payloads.
//!
//! The provider sends the same information in several shapes: JSON or form
//! bodies, query strings, nested `data.id`, or only a `resource` URL. This
//! module reduces all of them to a topic and an id.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::errors::WebhookError;

/// Topic assumed when a notification carries an id but no topic.
pub const DEFAULT_TOPIC: &str = "payment";

/// Raw extraction result. Either part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawNotification {
    pub topic: Option<String>,
    pub id: Option<String>,
}

/// How a notification is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "topic", rename_all = "snake_case")]
pub enum NotificationKind {
    Payment,
    MerchantOrder,
    Unsupported(String),
}

/// A notification ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub topic: String,
    pub id: String,
    pub kind: NotificationKind,
}

impl Notification {
    /// Builds a payment notification, used when re-entering the payment
    /// path from a merchant order, a status poll or a sweep.
    pub fn payment(topic: impl Into<String>, payment_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            id: payment_id.into(),
            kind: NotificationKind::Payment,
        }
    }
}

impl RawNotification {
    /// Resolves the dispatch kind; fails with `MissingId` when no id was found.
    pub fn into_notification(self) -> Result<Notification, WebhookError> {
        let id = self.id.ok_or(WebhookError::MissingId)?;
        let topic = self.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let lowered = topic.to_ascii_lowercase();
        let kind = if lowered.starts_with("merchant_order") {
            NotificationKind::MerchantOrder
        } else if lowered == "payment" || lowered.starts_with("payment.") {
            NotificationKind::Payment
        } else {
            NotificationKind::Unsupported(topic.clone())
        };
        Ok(Notification { topic, id, kind })
    }
}

/// Extracts topic and id.
///
/// Id precedence: `payment_id`, `data.id`, `id`, query `id`, last segment
/// of `resource` (query first, then body). Topic precedence: query `topic`,
/// body `topic`, body `type`, query `type`.
pub fn normalize(body: &Value, query: &HashMap<String, String>) -> RawNotification {
    let query_value = |key: &str| query.get(key).and_then(|v| non_empty(v));
    let body_value = |key: &str| body.get(key).and_then(scalar_text);

    let id = body_value("payment_id")
        .or_else(|| body.get("data").and_then(|d| d.get("id")).and_then(scalar_text))
        .or_else(|| body_value("id"))
        .or_else(|| query_value("id"))
        .or_else(|| query_value("resource").and_then(|r| id_from_resource(&r)))
        .or_else(|| body_value("resource").and_then(|r| id_from_resource(&r)));

    let topic = query_value("topic")
        .or_else(|| body_value("topic"))
        .or_else(|| body_value("type"))
        .or_else(|| query_value("type"));

    RawNotification { topic, id }
}

/// Last non-empty path segment of a resource URL, ignoring any query string.
pub fn id_from_resource(resource: &str) -> Option<String> {
    let path = resource.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .rev()
        .find(|segment| !segment.trim().is_empty())
        .map(|segment| segment.trim().to_string())
}

/// Parses a request body as JSON or form data.
///
/// Form keys `data.id` and `data[id]` are folded into a nested `data`
/// object so both encodings normalize identically. An empty body is `Null`.
pub fn parse_body(content_type: Option<&str>, raw: &[u8]) -> Result<Value, WebhookError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    let is_form = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        return Ok(parse_form(raw));
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(value) => Ok(value),
        Err(err) if content_type.is_none() && raw.contains(&b'=') => {
            tracing::debug!(error = %err, "body is not JSON, reading as form data");
            Ok(parse_form(raw))
        }
        Err(err) => Err(WebhookError::MalformedPayload(err.to_string())),
    }
}

fn parse_form(raw: &[u8]) -> Value {
    let mut root = Map::new();
    let mut data = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw) {
        let value = Value::String(value.into_owned());
        match &*key {
            "data.id" | "data[id]" => {
                data.insert("id".to_string(), value);
            }
            other => {
                root.insert(other.to_string(), value);
            }
        }
    }
    if !data.is_empty() {
        root.insert("data".to_string(), Value::Object(data));
    }
    Value::Object(root)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ══════════════════════════════════════════════════════════════
    // Id precedence
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn payment_id_wins_over_everything() {
        let body = json!({"payment_id": "1", "data": {"id": "2"}, "id": "3"});
        let raw = normalize(&body, &query(&[("id", "4")]));
        assert_eq!(raw.id.as_deref(), Some("1"));
    }

    #[test]
    fn nested_data_id_wins_over_top_level_id() {
        let body = json!({"type": "payment", "data": {"id": 123}, "id": 999});
        let raw = normalize(&body, &HashMap::new());
        assert_eq!(raw.id.as_deref(), Some("123"));
        assert_eq!(raw.topic.as_deref(), Some("payment"));
    }

    #[test]
    fn query_id_used_when_body_has_none() {
        let raw = normalize(&Value::Null, &query(&[("topic", "payment"), ("id", "77")]));
        assert_eq!(raw.id.as_deref(), Some("77"));
    }

    #[test]
    fn resource_url_is_last_resort() {
        let body = json!({
            "topic": "merchant_order",
            "resource": "https://api.mercadolibre.com/merchant_orders/555?foo=bar"
        });
        let raw = normalize(&body, &HashMap::new());
        assert_eq!(raw.id.as_deref(), Some("555"));
    }

    #[test]
    fn blank_values_are_skipped() {
        let body = json!({"payment_id": "  ", "id": "8"});
        assert_eq!(normalize(&body, &HashMap::new()).id.as_deref(), Some("8"));
    }

    #[test]
    fn resource_segment_ignores_trailing_slash() {
        assert_eq!(id_from_resource("/v1/payments/42/").as_deref(), Some("42"));
        assert_eq!(id_from_resource(""), None);
    }

    // ══════════════════════════════════════════════════════════════
    // Topic and dispatch
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn query_topic_wins_over_body_type() {
        let body = json!({"type": "payment", "id": "1"});
        let raw = normalize(&body, &query(&[("topic", "merchant_order")]));
        assert_eq!(raw.topic.as_deref(), Some("merchant_order"));
    }

    #[test]
    fn merchant_order_prefix_dispatches_to_merchant_order() {
        let raw = RawNotification {
            topic: Some("merchant_order_wh".into()),
            id: Some("9".into()),
        };
        assert_eq!(
            raw.into_notification().unwrap().kind,
            NotificationKind::MerchantOrder
        );
    }

    #[test]
    fn missing_topic_defaults_to_payment() {
        let raw = RawNotification {
            topic: None,
            id: Some("9".into()),
        };
        let notification = raw.into_notification().unwrap();
        assert_eq!(notification.topic, "payment");
        assert_eq!(notification.kind, NotificationKind::Payment);
    }

    #[test]
    fn unknown_topics_are_unsupported() {
        let raw = RawNotification {
            topic: Some("self-test".into()),
            id: Some("1".into()),
        };
        assert_eq!(
            raw.into_notification().unwrap().kind,
            NotificationKind::Unsupported("self-test".into())
        );
    }

    #[test]
    fn no_id_is_missing_id() {
        let raw = normalize(&json!({"type": "payment"}), &HashMap::new());
        assert!(matches!(raw.into_notification(), Err(WebhookError::MissingId)));
    }

    // ══════════════════════════════════════════════════════════════
    // Body parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn form_body_matches_json_body() {
        let form = parse_body(
            Some("application/x-www-form-urlencoded"),
            b"type=payment&data.id=123",
        )
        .unwrap();
        let json = parse_body(Some("application/json"), br#"{"type":"payment","data":{"id":"123"}}"#)
            .unwrap();
        assert_eq!(normalize(&form, &HashMap::new()), normalize(&json, &HashMap::new()));
    }

    #[test]
    fn bracketed_form_keys_are_folded() {
        let form = parse_body(
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            b"topic=payment&data%5Bid%5D=321",
        )
        .unwrap();
        assert_eq!(normalize(&form, &HashMap::new()).id.as_deref(), Some("321"));
    }

    #[test]
    fn empty_body_is_null() {
        assert_eq!(parse_body(Some("application/json"), b"  ").unwrap(), Value::Null);
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            parse_body(Some("application/json"), b"{oops"),
            Err(WebhookError::MalformedPayload(_))
        ));
    }
}
