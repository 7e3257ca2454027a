use super::{ShowId, ShowRecord, ShowService, ShowServiceError, ShowServiceResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct AllShowsResponse {
    shows: Vec<ShowListEntry>,
}

// Only the id matters here; the record is fetched again right before playback
#[derive(Debug, Deserialize)]
struct ShowListEntry {
    id: ShowId,
}

/// `ShowService` backed by the web service's internal API
#[derive(Clone)]
pub struct HttpShowService {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpShowService {
    /// `request_timeout` bounds the list/get calls; the long-lived event
    /// feed shares the client but not the timeout.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> ShowServiceResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn events_url(&self) -> String {
        format!("{}/internalapi/events", self.base_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/internalapi/{}", self.base_url, path)
    }
}

#[async_trait]
impl ShowService for HttpShowService {
    async fn list_show_ids(&self) -> ShowServiceResult<Vec<ShowId>> {
        let url = self.url("get_all_shows");
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShowServiceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body: AllShowsResponse = response.json().await?;
        debug!("Show service listed {} shows", body.shows.len());
        Ok(body.shows.into_iter().map(|s| s.id).collect())
    }

    async fn get_show(&self, id: ShowId) -> ShowServiceResult<ShowRecord> {
        let url = self.url(&format!("get_show/{}", id));
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ShowServiceError::NotFound(id)),
            status if !status.is_success() => Err(ShowServiceError::Status {
                status: status.as_u16(),
                url,
            }),
            _ => Ok(response.json().await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shows::ShowType;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};

    async fn get_all_shows() -> Json<Value> {
        Json(json!({
            "shows": [
                {"id": 4, "show_type": "text", "payload": {"text": "hi"}},
                {"id": 2, "show_type": "hologram", "payload": {}},
            ]
        }))
    }

    async fn get_show(Path(id): Path<i64>) -> Result<Json<Value>, StatusCode> {
        match id {
            4 => Ok(Json(json!({"show_type": "text", "payload": {"text": "hi"}}))),
            5 => Err(StatusCode::INTERNAL_SERVER_ERROR),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    async fn spawn_service() -> HttpShowService {
        let app = Router::new()
            .route("/internalapi/get_all_shows", get(get_all_shows))
            .route("/internalapi/get_show/{id}", get(get_show));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HttpShowService::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_keeps_order_and_ignores_types() {
        let service = spawn_service().await;
        assert_eq!(service.list_show_ids().await.unwrap(), vec![4, 2]);
    }

    #[tokio::test]
    async fn test_get_show_maps_statuses() {
        let service = spawn_service().await;

        let record = service.get_show(4).await.unwrap();
        assert_eq!(record.show_type, ShowType::Text);
        assert_eq!(record.payload, json!({"text": "hi"}));

        assert!(matches!(
            service.get_show(9).await,
            Err(ShowServiceError::NotFound(9))
        ));
        assert!(matches!(
            service.get_show(5).await,
            Err(ShowServiceError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let service = HttpShowService::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            service.list_show_ids().await,
            Err(ShowServiceError::Http(_))
        ));
    }

    #[test]
    fn test_events_url_strips_trailing_slash() {
        let service = HttpShowService::new("http://web:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(service.events_url(), "http://web:8000/internalapi/events");
    }
}
