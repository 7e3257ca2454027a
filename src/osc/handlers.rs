use super::registry::SubscriberRegistry;
use super::server::{IngestSnapshot, IngestStats};
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by the OSC HTTP handlers
#[derive(Clone)]
pub struct OscState {
    pub registry: SubscriberRegistry,
    pub stats: Arc<IngestStats>,
    pub start_time: Instant,
}

impl OscState {
    pub fn new(registry: SubscriberRegistry, stats: Arc<IngestStats>) -> Self {
        Self {
            registry,
            stats,
            start_time: Instant::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub subscribers: usize,
    pub uptime_seconds: u64,
    pub ingest: IngestSnapshot,
}

/// Routes of the OSC renderer service
pub fn router(state: OscState) -> Router {
    Router::new()
        .route("/render", get(render_stream).post(render_stream))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// SSE stream of every frame received while the client stays connected
///
/// The request body (a show payload when the worker calls us) is ignored.
pub async fn render_stream(
    State(state): State<OscState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.registry.subscribe();
    info!(subscriber = %subscription.id(), "New HTTP connection for /render");

    // Dropping the stream drops the subscription, which deregisters it
    let stream = async_stream::stream! {
        loop {
            let frame = subscription.next_frame().await;
            yield Ok(Event::default().event("screen_update").data(&*frame));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Health check endpoint
pub async fn health_check(State(state): State<OscState>) -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscribers: state.registry.subscriber_count(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        ingest: state.stats.snapshot(),
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use futures::StreamExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> OscState {
        OscState::new(SubscriberRegistry::new(), Arc::new(IngestStats::default()))
    }

    #[tokio::test]
    async fn test_render_stream_registers_and_deregisters() {
        let state = state();
        let app = router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/render")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(state.registry.subscriber_count(), 1);

        state.registry.broadcast(Arc::from("QUJD"));

        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: screen_update"));
        assert!(text.contains("data: QUJD"));

        drop(body);
        assert_eq!(state.registry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_subscribers() {
        let state = state();
        let _sub = state.registry.subscribe();

        let response = router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.subscribers, 1);
        assert_eq!(health.ingest.packets_received, 0);
    }
}
