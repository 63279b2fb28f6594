//! Webhook ingestion service with a query and dashboard API.
//!
//! Inbound webhooks are validated and written to an append-only
//! `EventStore`; read endpoints page through, look up and aggregate the
//! stored events.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod http_server;
pub mod store;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, StoreError};
pub use http_server::{create_router, start_server, AppState};
pub use store::{EventStore, MemoryEventStore, PgEventStore, SharedStore};
pub use types::{EventId, EventSummary, NewWebhookEvent, WebhookEvent};
