use std::time::Duration;
use tracing::{debug, warn};

/// Tells the show-management service that live OSC input wants the display
///
/// Fire-and-forget: implementations must not block the caller and must not
/// report failure back.
pub trait TakeoverNotifier: Send + Sync {
    fn request_display(&self);
}

/// Calls `GET /internalapi/set_immediately_show_osc` on a spawned task
pub struct HttpTakeoverNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpTakeoverNotifier {
    pub fn new(web_service_host: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!(
                "{}/internalapi/set_immediately_show_osc",
                web_service_host.trim_end_matches('/')
            ),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TakeoverNotifier for HttpTakeoverNotifier {
    fn request_display(&self) {
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Show service acknowledged OSC takeover");
                }
                Ok(response) => warn!("OSC takeover request returned {}", response.status()),
                Err(e) => warn!("OSC takeover request failed: {}", e),
            }
        });
    }
}
