use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::EventStore;
use crate::error::StoreResult;
use crate::types::{
    EventFilter, EventId, EventSummary, GroupCount, GroupField, NewWebhookEvent, WebhookEvent,
};

/// In-process event store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Insertion order.
    events: Vec<WebhookEvent>,
    by_id: HashMap<EventId, usize>,
    last_created: Option<DateTime<Utc>>,
}

impl Inner {
    /// Matching events, newest first. Ties on `created_at` keep the later
    /// insertion first.
    fn newest_first<'a>(&'a self, filter: &'a EventFilter) -> Vec<&'a WebhookEvent> {
        let mut items: Vec<&WebhookEvent> =
            self.events.iter().rev().filter(|e| filter.matches(e)).collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already-built event, keeping its id and timestamp. Returns
    /// `false` and leaves the store untouched if the id is already taken.
    pub async fn insert(&self, event: WebhookEvent) -> bool {
        let mut inner = self.inner.write().await;
        if inner.by_id.contains_key(&event.id) {
            return false;
        }
        inner.last_created = Some(match inner.last_created {
            Some(last) => last.max(event.created_at),
            None => event.created_at,
        });
        let index = inner.events.len();
        inner.by_id.insert(event.id, index);
        inner.events.push(event);
        true
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(&self, event: NewWebhookEvent) -> StoreResult<WebhookEvent> {
        let mut inner = self.inner.write().await;

        let now = Utc::now();
        let created_at = match inner.last_created {
            Some(last) if last > now => last,
            _ => now,
        };

        let mut id = EventId::new();
        while inner.by_id.contains_key(&id) {
            id = EventId::new();
        }

        let stored = WebhookEvent {
            id,
            source: event.source,
            event_type: event.event_type,
            payload: event.payload,
            headers: event.headers,
            ip: event.ip,
            user_agent: event.user_agent,
            created_at,
        };

        let index = inner.events.len();
        inner.by_id.insert(id, index);
        inner.events.push(stored.clone());
        inner.last_created = Some(created_at);

        Ok(stored)
    }

    async fn find_by_id(&self, id: EventId) -> StoreResult<Option<WebhookEvent>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(&id).map(|&i| inner.events[i].clone()))
    }

    async fn find_many(
        &self,
        filter: &EventFilter,
        skip: u64,
        take: u64,
    ) -> StoreResult<Vec<WebhookEvent>> {
        let inner = self.inner.read().await;
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);
        Ok(inner
            .newest_first(filter)
            .into_iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &EventFilter) -> StoreResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.events.iter().filter(|e| filter.matches(e)).count() as u64)
    }

    async fn count_by(&self, field: GroupField) -> StoreResult<Vec<GroupCount>> {
        let inner = self.inner.read().await;
        let mut groups: BTreeMap<&str, u64> = BTreeMap::new();
        for event in &inner.events {
            let key = match field {
                GroupField::Source => event.source.as_str(),
                GroupField::EventType => event.event_type.as_str(),
            };
            *groups.entry(key).or_default() += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(name, count)| GroupCount {
                name: name.to_string(),
                count,
            })
            .collect())
    }

    async fn recent(&self, limit: u64) -> StoreResult<Vec<EventSummary>> {
        let inner = self.inner.read().await;
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let filter = EventFilter::default();
        Ok(inner
            .newest_first(&filter)
            .into_iter()
            .take(take)
            .map(EventSummary::from)
            .collect())
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let removed = inner.events.len() as u64;
        inner.events.clear();
        inner.by_id.clear();
        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
