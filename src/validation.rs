use serde_json::{Map, Value};

use crate::error::ApiError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const DEFAULT_RECENT_LIMIT: u64 = 10;

/// Largest ingestion body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The required part of an ingestion body, checked for shape.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookBody {
    pub source: String,
    pub event_type: String,
    pub payload: Map<String, Value>,
}

/// Parse a raw request body into a `WebhookBody`.
/// The body must be a JSON object with non-empty string `source` and
/// `eventType` and an object `payload`. Other fields are ignored.
pub fn parse_webhook_body(body: &[u8]) -> Result<WebhookBody, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("body must be valid JSON: {e}")))?;
    validate_webhook_body(value)
}

pub fn validate_webhook_body(value: Value) -> Result<WebhookBody, ApiError> {
    let Value::Object(mut body) = value else {
        return Err(ApiError::Validation("body must be object".to_string()));
    };

    let source = required_string(&mut body, "source")?;
    let event_type = required_string(&mut body, "eventType")?;
    let payload = match body.remove("payload") {
        Some(Value::Object(payload)) => payload,
        Some(_) => return Err(ApiError::Validation("payload must be object".to_string())),
        None => {
            return Err(ApiError::Validation(
                "body must have required property 'payload'".to_string(),
            ))
        }
    };

    Ok(WebhookBody {
        source,
        event_type,
        payload,
    })
}

fn required_string(body: &mut Map<String, Value>, field: &str) -> Result<String, ApiError> {
    match body.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(ApiError::Validation(format!("{field} must not be empty"))),
        Some(_) => Err(ApiError::Validation(format!("{field} must be string"))),
        None => Err(ApiError::Validation(format!(
            "body must have required property '{field}'"
        ))),
    }
}

/// Parse a positive integer query value, returning `default` for anything
/// missing, malformed, zero or negative.
pub fn parse_or_default(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Value of the first occurrence of `key` in a decoded query string. Later
/// repeats are ignored.
pub fn first_param(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}
