// Live event listener
//
// Holds the show-management event feed open for the life of the process and
// turns `show_immediately` events into preemptions. Any failure, at connect
// time or mid-stream, is followed by a fixed backoff and a reconnect. A feed
// that sends nothing at all, not even keep-alives, for `idle_timeout` counts
// as failed, which catches connections that died without a FIN.

use super::state::PlaybackState;
use crate::shows::{ShowId, ShowServiceError};
use crate::sse::{self, SseEvent, StreamError};
use futures::stream::StreamExt;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const KEEP_ALIVE_EVENT: &str = "keep-alive";
const SHOW_IMMEDIATELY_EVENT: &str = "show_immediately";

#[derive(Debug, Deserialize)]
struct ShowImmediately {
    show_id: ShowId,
}

pub struct EventListener {
    client: reqwest::Client,
    events_url: String,
    state: PlaybackState,
    reconnect_backoff: Duration,
    idle_timeout: Duration,
}

impl EventListener {
    pub fn new(
        client: reqwest::Client,
        events_url: impl Into<String>,
        state: PlaybackState,
        reconnect_backoff: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            client,
            events_url: events_url.into(),
            state,
            reconnect_backoff,
            idle_timeout,
        }
    }

    /// Run on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Consume the feed forever
    pub async fn run(self) {
        info!("Listening for live events on {}", self.events_url);
        loop {
            match self.consume().await {
                Ok(()) => info!("Event feed closed by server"),
                Err(e) => warn!("Event feed failed: {}", e),
            }

            debug!("Reconnecting to event feed in {:?}", self.reconnect_backoff);
            tokio::time::sleep(self.reconnect_backoff).await;
        }
    }

    async fn consume(&self) -> Result<(), ShowServiceError> {
        let response = self
            .client
            .get(&self.events_url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShowServiceError::Status {
                status: response.status().as_u16(),
                url: self.events_url.clone(),
            });
        }
        info!("Connected to event feed");

        let events = sse::events(response.bytes_stream(), self.idle_timeout);
        futures_util::pin_mut!(events);

        while let Some(event) = events.next().await {
            match event {
                Ok(event) => self.handle_event(&event),
                Err(StreamError::Idle(timeout)) => {
                    return Err(ShowServiceError::Idle {
                        url: self.events_url.clone(),
                        timeout,
                    })
                }
                Err(StreamError::Body(e)) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Apply one feed event to the shared playback state
    pub fn handle_event(&self, event: &SseEvent) {
        match event.event.as_str() {
            KEEP_ALIVE_EVENT => {}
            SHOW_IMMEDIATELY_EVENT => match serde_json::from_str::<ShowImmediately>(&event.data) {
                Ok(request) => {
                    info!(show_id = request.show_id, "Show requested immediately");
                    self.state.preempt_with(request.show_id);
                }
                Err(e) => warn!("Malformed show_immediately event {:?}: {}", event.data, e),
            },
            other => debug!("Ignoring event {:?}", other),
        }
    }
}
