//! PostgreSQL-backed event store.
//!
//! Events live in a single `webhook_events` table. `payload` and `headers`
//! are JSONB columns stored verbatim; `created_at` is assigned by the
//! database so ordering follows the server clock.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::EventStore;
use crate::error::StoreResult;
use crate::types::{
    EventFilter, EventId, EventSummary, GroupCount, GroupField, Headers, NewWebhookEvent,
    WebhookEvent,
};

const MAX_CONNECT_RETRIES: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

const EVENT_COLUMNS: &str =
    "id, source, event_type, payload, headers, ip, user_agent, created_at";

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    source: String,
    event_type: String,
    payload: Json<Map<String, Value>>,
    headers: Option<Json<Headers>>,
    ip: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for WebhookEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId(row.id),
            source: row.source,
            event_type: row.event_type,
            payload: row.payload.0,
            headers: row.headers.map(|h| h.0),
            ip: row.ip,
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`, retrying while the database comes
    /// up, and verify it with a trivial query.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let mut retries = 0;

        loop {
            match PgPoolOptions::new()
                .max_connections(max_connections)
                .min_connections(1)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    let store = Self::new(pool);
                    store.ping().await?;
                    return Ok(store);
                }
                Err(e) if retries < MAX_CONNECT_RETRIES => {
                    retries += 1;
                    warn!(
                        attempt = retries,
                        max_retries = MAX_CONNECT_RETRIES,
                        error = %e,
                        "Database connection failed, retrying"
                    );
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Create the events table and its indexes if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS webhook_events (
                id UUID PRIMARY KEY,
                source TEXT NOT NULL,
                event_type TEXT NOT NULL,
                payload JSONB NOT NULL,
                headers JSONB,
                ip TEXT,
                user_agent TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_webhook_events_created_at ON webhook_events (created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_webhook_events_source ON webhook_events (source)",
            "CREATE INDEX IF NOT EXISTS idx_webhook_events_event_type ON webhook_events (event_type)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("webhook_events schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn to_u64(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create(&self, event: NewWebhookEvent) -> StoreResult<WebhookEvent> {
        let id = EventId::new();
        let sql = format!(
            "INSERT INTO webhook_events (id, source, event_type, payload, headers, ip, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {EVENT_COLUMNS}"
        );

        let row: EventRow = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(&event.source)
            .bind(&event.event_type)
            .bind(Json(&event.payload))
            .bind(event.headers.as_ref().map(Json))
            .bind(&event.ip)
            .bind(&event.user_agent)
            .fetch_one(&self.pool)
            .await?;

        debug!(event_id = %id, "Inserted webhook event");
        Ok(row.into())
    }

    async fn find_by_id(&self, id: EventId) -> StoreResult<Option<WebhookEvent>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM webhook_events WHERE id = $1");
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(WebhookEvent::from))
    }

    async fn find_many(
        &self,
        filter: &EventFilter,
        skip: u64,
        take: u64,
    ) -> StoreResult<Vec<WebhookEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM webhook_events \
             WHERE ($1::text IS NULL OR source = $1) \
               AND ($2::text IS NULL OR event_type = $2) \
             ORDER BY created_at DESC, id DESC \
             OFFSET $3 LIMIT $4"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(filter.source.as_deref())
            .bind(filter.event_type.as_deref())
            .bind(to_i64(skip))
            .bind(to_i64(take))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(WebhookEvent::from).collect())
    }

    async fn count(&self, filter: &EventFilter) -> StoreResult<u64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM webhook_events
            WHERE ($1::text IS NULL OR source = $1)
              AND ($2::text IS NULL OR event_type = $2)
            "#,
        )
        .bind(filter.source.as_deref())
        .bind(filter.event_type.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(to_u64(total))
    }

    async fn count_by(&self, field: GroupField) -> StoreResult<Vec<GroupCount>> {
        let sql = match field {
            GroupField::Source => {
                "SELECT source, COUNT(*) FROM webhook_events GROUP BY source ORDER BY source"
            }
            GroupField::EventType => {
                "SELECT event_type, COUNT(*) FROM webhook_events GROUP BY event_type ORDER BY event_type"
            }
        };
        let rows: Vec<(String, i64)> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(name, count)| GroupCount {
                name,
                count: to_u64(count),
            })
            .collect())
    }

    async fn recent(&self, limit: u64) -> StoreResult<Vec<EventSummary>> {
        let rows: Vec<(Uuid, String, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, source, event_type, created_at FROM webhook_events
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(to_i64(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, source, event_type, created_at)| EventSummary {
                id: EventId(id),
                source,
                event_type,
                created_at,
            })
            .collect())
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM webhook_events")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
