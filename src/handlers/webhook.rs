//! Webhook ingestion and event lookup.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, FromRequestParts, Path, Query, State},
    http::{header::USER_AGENT, request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::internal;
use crate::error::ApiError;
use crate::http_server::AppState;
use crate::types::{
    EventFilter, EventId, Headers, NewWebhookEvent, PageRequest, Pagination, WebhookEvent,
};
use crate::validation::{
    first_param, parse_or_default, parse_webhook_body, DEFAULT_LIMIT, DEFAULT_PAGE,
};

/// Peer address of the connection, if the server was started with connect
/// info. In-process requests (tests) have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string()),
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveResponse {
    pub success: bool,
    pub event_id: EventId,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub source: Option<String>,
    pub event_type: Option<String>,
}

impl ListQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            page: first_param(pairs, "page"),
            limit: first_param(pairs, "limit"),
            source: first_param(pairs, "source"),
            event_type: first_param(pairs, "eventType"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventList {
    pub events: Vec<WebhookEvent>,
    pub pagination: Pagination,
}

/// Capture request headers as a string map. Repeated headers are joined
/// with `", "` in arrival order; values that are not visible ASCII are dropped.
pub fn capture_headers(headers: &HeaderMap) -> Headers {
    let mut captured = Headers::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !values.is_empty() {
            captured.insert(name.to_string(), values.join(", "));
        }
    }
    captured
}

fn body_error(rejection: BytesRejection) -> ApiError {
    warn!(error = %rejection, "Failed to read webhook body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::Validation(rejection.body_text())
    }
}

/// `POST /api/webhook`
#[instrument(name = "receive_webhook", skip_all)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ReceiveResponse>, ApiError> {
    let body = body.map_err(body_error)?;
    let body = parse_webhook_body(&body)
        .inspect_err(|e| warn!(error = %e, "Rejected webhook body"))?;

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let event = NewWebhookEvent {
        source: body.source,
        event_type: body.event_type,
        payload: body.payload,
        headers: Some(capture_headers(&headers)),
        ip,
        user_agent,
    };

    let stored = state
        .store
        .create(event)
        .await
        .map_err(internal("Failed to process webhook"))?;

    info!(
        id = %stored.id,
        source = %stored.source,
        event_type = %stored.event_type,
        ip = stored.ip.as_deref().unwrap_or("unknown"),
        "Webhook received"
    );

    Ok(Json(ReceiveResponse {
        success: true,
        event_id: stored.id,
        message: "Webhook received successfully".to_string(),
    }))
}

/// `GET /api/webhook/events`
#[instrument(name = "list_events", skip_all)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<EventList>, ApiError> {
    let query = ListQuery::from_pairs(&pairs);
    let window = PageRequest {
        page: parse_or_default(query.page.as_deref(), DEFAULT_PAGE),
        limit: parse_or_default(query.limit.as_deref(), DEFAULT_LIMIT),
    };
    let filter = EventFilter::from_query(query.source, query.event_type);
    debug!(?window, ?filter, "Listing events");

    let (events, total) = tokio::try_join!(
        state.store.find_many(&filter, window.offset(), window.limit),
        state.store.count(&filter),
    )
    .map_err(internal("Failed to fetch events"))?;

    Ok(Json(EventList {
        events,
        pagination: window.with_total(total),
    }))
}

/// `GET /api/webhook/events/{id}`
#[instrument(name = "get_event", skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WebhookEvent>, ApiError> {
    let Ok(id) = id.parse::<EventId>() else {
        return Err(ApiError::NotFound("Event not found"));
    };

    state
        .store
        .find_by_id(id)
        .await
        .map_err(internal("Failed to fetch event"))?
        .map(Json)
        .ok_or(ApiError::NotFound("Event not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_capture_keeps_visible_values() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("x-github-event", "push".parse().unwrap());
        headers.insert(
            "x-binary",
            axum::http::HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap(),
        );

        let captured = capture_headers(&headers);

        assert_eq!(captured.get("content-type").unwrap(), "application/json");
        assert_eq!(captured.get("x-github-event").unwrap(), "push");
        assert!(!captured.contains_key("x-binary"));
    }

    #[test]
    fn repeated_headers_are_joined_in_order() {
        let mut headers = HeaderMap::new();
        headers.append("x-multi", "a".parse().unwrap());
        headers.append("x-multi", "b".parse().unwrap());
        headers.insert("x-single", "only".parse().unwrap());

        let captured = capture_headers(&headers);

        assert_eq!(captured.get("x-multi").unwrap(), "a, b");
        assert_eq!(captured.get("x-single").unwrap(), "only");
    }

    #[test]
    fn list_query_keeps_first_value_of_each_key() {
        let pairs: Vec<(String, String)> = [
            ("page", "1"),
            ("page", "2"),
            ("eventType", "push"),
            ("source", "github"),
            ("source", "stripe"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let query = ListQuery::from_pairs(&pairs);

        assert_eq!(query.page.as_deref(), Some("1"));
        assert_eq!(query.limit, None);
        assert_eq!(query.source.as_deref(), Some("github"));
        assert_eq!(query.event_type.as_deref(), Some("push"));
    }
}
