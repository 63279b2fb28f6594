//! Persistence for webhook events.
//!
//! Handlers depend only on the `EventStore` trait and receive a shared
//! handle at router construction. `PgEventStore` is the production
//! implementation; `MemoryEventStore` backs tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    EventFilter, EventId, EventSummary, GroupCount, GroupField, NewWebhookEvent, WebhookEvent,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

/// Shared store handle held in router state.
pub type SharedStore = Arc<dyn EventStore>;

/// Append-only store of webhook events.
///
/// Every method is a single statement against the backing store, so a
/// cancelled caller never leaves a partially written record behind.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Write one new event, assigning its id and creation time.
    async fn create(&self, event: NewWebhookEvent) -> StoreResult<WebhookEvent>;

    async fn find_by_id(&self, id: EventId) -> StoreResult<Option<WebhookEvent>>;

    /// Events matching `filter`, newest first, skipping `skip` and returning
    /// at most `take`.
    async fn find_many(
        &self,
        filter: &EventFilter,
        skip: u64,
        take: u64,
    ) -> StoreResult<Vec<WebhookEvent>>;

    async fn count(&self, filter: &EventFilter) -> StoreResult<u64>;

    /// Count of events per distinct value of `field`, ordered by name.
    async fn count_by(&self, field: GroupField) -> StoreResult<Vec<GroupCount>>;

    /// The `limit` newest events as summaries.
    async fn recent(&self, limit: u64) -> StoreResult<Vec<EventSummary>>;

    /// Remove every event. Administrative reset only; not routed over HTTP.
    async fn delete_all(&self) -> StoreResult<u64>;

    async fn ping(&self) -> StoreResult<()>;
}
