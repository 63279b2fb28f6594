use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Request headers captured alongside an event, keyed by lowercase name.
pub type Headers = BTreeMap<String, String>;

/// Identifier assigned to a webhook event when it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A stored webhook delivery. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub id: EventId,
    pub source: String,
    pub event_type: String,
    pub payload: Map<String, Value>,
    pub headers: Option<Headers>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated webhook waiting to be written. The store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookEvent {
    pub source: String,
    pub event_type: String,
    pub payload: Map<String, Value>,
    pub headers: Option<Headers>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Dashboard projection of an event without payload or request metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: EventId,
    pub source: String,
    pub event_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<&WebhookEvent> for EventSummary {
    fn from(event: &WebhookEvent) -> Self {
        Self {
            id: event.id,
            source: event.source.clone(),
            event_type: event.event_type.clone(),
            created_at: event.created_at,
        }
    }
}

/// Equality filter for event listings. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub source: Option<String>,
    pub event_type: Option<String>,
}

impl EventFilter {
    /// Builds a filter from raw query values, treating empty strings as absent.
    pub fn from_query(source: Option<String>, event_type: Option<String>) -> Self {
        Self {
            source: source.filter(|s| !s.is_empty()),
            event_type: event_type.filter(|s| !s.is_empty()),
        }
    }

    pub fn matches(&self, event: &WebhookEvent) -> bool {
        self.source.as_deref().map_or(true, |s| event.source == s)
            && self
                .event_type
                .as_deref()
                .map_or(true, |t| event.event_type == t)
    }
}

/// Categorical column used by the dashboard aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Source,
    EventType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub name: String,
    pub count: u64,
}

/// Requested page window. Both fields are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Number of records preceding this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn with_total(self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: total.div_ceil(self.limit.max(1)),
        }
    }
}

/// Page window echoed back with every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(source: &str, event_type: &str) -> WebhookEvent {
        WebhookEvent {
            id: EventId::new(),
            source: source.to_string(),
            event_type: event_type.to_string(),
            payload: Map::new(),
            headers: None,
            ip: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    fn window(page: u64, limit: u64) -> PageRequest {
        PageRequest { page, limit }
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(window(1, 20).with_total(0).pages, 0);
        assert_eq!(window(1, 20).with_total(1).pages, 1);
        assert_eq!(window(1, 20).with_total(20).pages, 1);
        assert_eq!(window(1, 20).with_total(21).pages, 2);
        assert_eq!(window(1, 3).with_total(10).pages, 4);
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(window(1, 20).offset(), 0);
        assert_eq!(window(3, 20).offset(), 40);
        assert_eq!(window(u64::MAX, u64::MAX).offset(), u64::MAX);
    }

    #[test]
    fn pagination_echoes_request() {
        let pagination = window(2, 5).with_total(12);
        assert_eq!(
            pagination,
            Pagination { page: 2, limit: 5, total: 12, pages: 3 }
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = EventFilter::from_query(Some(String::new()), None);
        assert_eq!(filter, EventFilter::default());
        assert!(filter.matches(&event("github", "push")));
    }

    #[test]
    fn filter_requires_every_supplied_field() {
        let filter = EventFilter::from_query(Some("github".into()), Some("push".into()));
        assert!(filter.matches(&event("github", "push")));
        assert!(!filter.matches(&event("github", "issues")));
        assert!(!filter.matches(&event("stripe", "push")));
    }

    #[test]
    fn event_serializes_camel_case_with_nulls() {
        let value = serde_json::to_value(event("github", "push")).unwrap();
        assert_eq!(value["eventType"], json!("push"));
        assert_eq!(value["userAgent"], Value::Null);
        assert_eq!(value["headers"], Value::Null);
        assert!(value["createdAt"].is_string());
        assert!(value["id"].is_string());
    }

    #[test]
    fn event_id_parses_uuid_text() {
        let id = EventId::new();
        assert_eq!(id.to_string().parse::<EventId>().unwrap(), id);
        assert!("not-a-uuid".parse::<EventId>().is_err());
    }
}
