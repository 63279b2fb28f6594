//! Dashboard aggregates and the recent-activity feed.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use tracing::instrument;

use super::internal;
use crate::error::ApiError;
use crate::http_server::AppState;
use crate::types::{EventFilter, EventSummary, GroupCount, GroupField};
use crate::validation::{first_param, parse_or_default, DEFAULT_RECENT_LIMIT};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_events: u64,
    pub sources: Vec<GroupCount>,
    pub event_types: Vec<GroupCount>,
}

#[derive(Debug, Default)]
pub struct RecentQuery {
    pub limit: Option<String>,
}

impl RecentQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            limit: first_param(pairs, "limit"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecentEvents {
    pub events: Vec<EventSummary>,
}

/// `GET /api/dashboard/stats`
#[instrument(name = "dashboard_stats", skip_all)]
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    let everything = EventFilter::default();
    let (total_events, sources, event_types) = tokio::try_join!(
        state.store.count(&everything),
        state.store.count_by(GroupField::Source),
        state.store.count_by(GroupField::EventType),
    )
    .map_err(internal("Failed to fetch stats"))?;

    Ok(Json(DashboardStats {
        total_events,
        sources,
        event_types,
    }))
}

/// `GET /api/dashboard/recent`
#[instrument(name = "recent_events", skip_all)]
pub async fn recent_events(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<RecentEvents>, ApiError> {
    let query = RecentQuery::from_pairs(&pairs);
    let limit = parse_or_default(query.limit.as_deref(), DEFAULT_RECENT_LIMIT);

    let events = state
        .store
        .recent(limit)
        .await
        .map_err(internal("Failed to fetch recent events"))?;

    Ok(Json(RecentEvents { events }))
}
