use super::{FrameStream, RendererClient, RendererError};
use crate::shows::ShowType;
use crate::sse::{self, SseEvent, StreamError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Base URLs of the renderers, keyed by show type
#[derive(Debug, Clone, Default)]
pub struct RendererEndpoints {
    hosts: HashMap<ShowType, String>,
}

impl RendererEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, show_type: ShowType, host: impl Into<String>) -> Self {
        self.insert(show_type, host);
        self
    }

    pub fn insert(&mut self, show_type: ShowType, host: impl Into<String>) {
        self.hosts.insert(show_type, host.into());
    }

    /// The `/render` URL for a show type, if that renderer is deployed
    pub fn render_url(&self, show_type: ShowType) -> Option<String> {
        self.hosts
            .get(&show_type)
            .map(|host| format!("{}/render", host.trim_end_matches('/')))
    }

    pub fn configured(&self) -> impl Iterator<Item = ShowType> + '_ {
        self.hosts.keys().copied()
    }
}

/// `RendererClient` speaking HTTP + server-sent events
#[derive(Clone)]
pub struct HttpRendererClient {
    client: reqwest::Client,
    endpoints: RendererEndpoints,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpRendererClient {
    pub fn new(
        endpoints: RendererEndpoints,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, RendererError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoints,
            connect_timeout,
            read_timeout,
        })
    }

    async fn open(
        client: &reqwest::Client,
        url: &str,
        payload: &serde_json::Value,
        response_timeout: Duration,
    ) -> Result<reqwest::Response, RendererError> {
        let request = client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send();

        let response = tokio::time::timeout(response_timeout, request)
            .await
            .map_err(|_| RendererError::Timeout(response_timeout))??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RendererError::Status { status, body });
        }

        Ok(response)
    }
}

impl RendererClient for HttpRendererClient {
    fn stream(&self, show_type: ShowType, payload: serde_json::Value) -> FrameStream {
        let Some(url) = self.endpoints.render_url(show_type) else {
            warn!("{}", RendererError::NotConfigured(show_type));
            return Box::pin(stream::empty());
        };

        let client = self.client.clone();
        let read_timeout = self.read_timeout;
        // Connecting and waiting for the response head each get their own budget
        let response_timeout = self.connect_timeout + self.read_timeout;

        Box::pin(async_stream::stream! {
            let response = match Self::open(&client, &url, &payload, response_timeout).await {
                Ok(response) => response,
                Err(e) => {
                    error!(renderer = %show_type, "Renderer request failed: {}", e);
                    return;
                }
            };
            debug!(renderer = %show_type, "Renderer stream opened");

            let events = sse::events(response.bytes_stream(), read_timeout);
            futures_util::pin_mut!(events);

            let mut frames = 0usize;
            while let Some(event) = events.next().await {
                let event: SseEvent = match event {
                    Ok(event) => event,
                    Err(e @ StreamError::Idle(_)) => {
                        warn!(renderer = %show_type, "Renderer went silent: {}", e);
                        break;
                    }
                    Err(e @ StreamError::Body(_)) => {
                        debug!(renderer = %show_type, "Renderer stream broke off: {}", e);
                        break;
                    }
                };

                match event.event.as_str() {
                    "screen_update" => match STANDARD.decode(event.data.trim()) {
                        Ok(bitmap) => {
                            frames += 1;
                            yield bitmap;
                        }
                        Err(e) => warn!(renderer = %show_type, "Skipping undecodable frame: {}", e),
                    },
                    "end" => break,
                    _ => {}
                }
            }

            info!(renderer = %show_type, frames, "Renderer stream finished");
        })
    }
}
