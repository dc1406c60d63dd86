// HTTP request handlers
use crate::infrastructure::event_stream::stream_from_broadcast;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Chunk format of `/events`. `?chunks=br` selects length-prefixed Brotli
/// frames; anything else gets newline-delimited JSON.
#[derive(Debug, Default, Deserialize)]
pub struct EventStreamQuery {
    pub chunks: Option<String>,
}

impl EventStreamQuery {
    fn brotli_chunks(&self) -> bool {
        self.chunks.as_deref() == Some("br")
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Recent readings, newest first
pub async fn recent_readings(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let readings = state.monitor.recent();
    match json_response(&readings, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

pub async fn latest_reading(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.monitor.latest() {
        Some(reading) => Json(reading).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Current state of the in-process dashboard
pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.dashboard {
        Some(rx) => {
            let snapshot = rx.borrow().clone();
            Json(snapshot).into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Live push events (battery updates and notifications)
pub async fn events(
    Query(query): Query<EventStreamQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.monitor.subscribe();
    let compress = query.brotli_chunks();
    tracing::info!(compress, "Event stream subscriber connected");
    stream_from_broadcast(rx, compress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::monitor_service::MonitorService;
    use crate::application::reading_source::ReadingSource;
    use crate::domain::reading::{sample_reading, Reading, Thresholds};
    use async_trait::async_trait;
    use axum::http::header;

    struct FixedSource;

    #[async_trait]
    impl ReadingSource for FixedSource {
        async fn read(&self) -> anyhow::Result<Reading> {
            Ok(sample_reading(3.95, Some(33.0)))
        }
    }

    fn state() -> Arc<AppState> {
        let monitor = MonitorService::new(Arc::new(FixedSource), Thresholds::default(), 20, 8);
        Arc::new(AppState {
            monitor,
            dashboard: None,
        })
    }

    #[tokio::test]
    async fn test_latest_reading_404_before_first_sample() {
        let state = state();
        let response = latest_reading(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        state.monitor.tick().await;
        let response = latest_reading(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dashboard_unavailable_without_local_client() {
        let response = dashboard(State(state())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_recent_readings_json() {
        let state = state();
        state.monitor.tick().await;
        state.monitor.tick().await;

        let response = recent_readings(HeaderMap::new(), State(state)).await.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["status"], "normal");
    }

    #[tokio::test]
    async fn test_events_default_to_ndjson() {
        // Accept-Encoding has no say in the chunk format
        let response = events(Query(EventStreamQuery::default()), State(state()))
            .await
            .into_response();

        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-ndjson");
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_events_brotli_chunks_on_request() {
        let query = EventStreamQuery {
            chunks: Some("br".to_string()),
        };
        let response = events(Query(query), State(state())).await.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-bms-chunks");

        let query = EventStreamQuery {
            chunks: Some("brotli".to_string()),
        };
        let response = events(Query(query), State(state())).await.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-ndjson");
    }

    #[test]
    fn test_event_query_parses_chunks() {
        let uri: axum::http::Uri = "/events?chunks=br".parse().unwrap();
        let Query(query) = Query::<EventStreamQuery>::try_from_uri(&uri).unwrap();
        assert!(query.brotli_chunks());

        let uri: axum::http::Uri = "/events".parse().unwrap();
        let Query(query) = Query::<EventStreamQuery>::try_from_uri(&uri).unwrap();
        assert!(!query.brotli_chunks());
    }

    #[tokio::test]
    async fn test_recent_readings_brotli() {
        let state = state();
        state.monitor.tick().await;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_ENCODING, "gzip, br".parse().unwrap());
        let response = recent_readings(headers, State(state)).await.into_response();
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "br");
    }
}
