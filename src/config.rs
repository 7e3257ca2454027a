use crate::osc::BroadcastFormat;
use crate::renderer::RendererEndpoints;
use crate::shows::ShowType;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Where frames go
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// UDP address of the panel controller
    pub addr: SocketAddr,
    /// Paint frames on the console instead of sending them (DO_NOT_SEND_TO_RITER)
    pub console: bool,
}

/// Worker configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the show-management web service
    pub web_service_host: String,
    /// Renderer base URLs; show types without one are skipped
    pub renderers: RendererEndpoints,
    pub display: DisplayConfig,
    pub renderer_connect_timeout: Duration,
    pub renderer_read_timeout: Duration,
    /// Timeout for show list / show record requests
    pub service_request_timeout: Duration,
    /// Pause between shows
    pub show_pacing: Duration,
    /// Pause before asking again when there are no shows
    pub empty_queue_retry: Duration,
    /// Pause before reconnecting to the event feed
    pub events_reconnect_backoff: Duration,
    /// Longest silence tolerated on the event feed, keep-alives included
    pub events_idle_timeout: Duration,
}

/// OSC service configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct OscConfig {
    pub web_service_host: String,
    /// Where OSC datagrams arrive
    pub udp_addr: SocketAddr,
    /// Where `/render` and `/health` are served
    pub http_addr: SocketAddr,
    /// Frames buffered per subscriber before the oldest is dropped
    pub subscriber_queue_capacity: usize,
    pub broadcast_format: BroadcastFormat,
    /// Timeout for the takeover notification
    pub notify_timeout: Duration,
}

impl DisplayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            addr: parse_or(lookup, "DISPLAY_ADDR", SocketAddr::from(([10, 0, 0, 42], 6450)))?,
            console: flag(lookup, "DO_NOT_SEND_TO_RITER"),
        })
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut renderers = RendererEndpoints::new();
        for show_type in ShowType::ALL {
            let key = format!("RENDERER_{}_HOST", show_type.as_str().to_uppercase());
            if let Some(host) = lookup(&key).filter(|h| !h.trim().is_empty()) {
                renderers.insert(show_type, host.trim().to_string());
            }
        }

        Ok(Self {
            web_service_host: required(lookup, "WEB_SERVICE_HOST")?,
            renderers,
            display: DisplayConfig::from_lookup(lookup)?,
            renderer_connect_timeout: millis_or(lookup, "RENDERER_CONNECT_TIMEOUT_MS", 5000)?,
            renderer_read_timeout: millis_or(lookup, "RENDERER_READ_TIMEOUT_MS", 5000)?,
            service_request_timeout: millis_or(lookup, "SERVICE_REQUEST_TIMEOUT_MS", 10_000)?,
            show_pacing: millis_or(lookup, "SHOW_PACING_MS", 1000)?,
            empty_queue_retry: millis_or(lookup, "EMPTY_QUEUE_RETRY_MS", 1000)?,
            events_reconnect_backoff: millis_or(lookup, "EVENTS_RECONNECT_BACKOFF_MS", 1000)?,
            events_idle_timeout: millis_or(lookup, "EVENTS_IDLE_TIMEOUT_MS", 60_000)?,
        })
    }
}

impl OscConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let subscriber_queue_capacity = parse_or(lookup, "OSC_SUBSCRIBER_QUEUE_CAPACITY", 16usize)?;
        if subscriber_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "OSC_SUBSCRIBER_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            web_service_host: required(lookup, "WEB_SERVICE_HOST")?,
            udp_addr: parse_or(lookup, "OSC_UDP_ADDR", SocketAddr::from(([0, 0, 0, 0], 12000)))?,
            http_addr: parse_or(lookup, "OSC_HTTP_ADDR", SocketAddr::from(([0, 0, 0, 0], 80)))?,
            subscriber_queue_capacity,
            broadcast_format: parse_or(lookup, "OSC_BROADCAST_FORMAT", BroadcastFormat::Raw)?,
            notify_timeout: millis_or(lookup, "OSC_NOTIFY_TIMEOUT_MS", 2000)?,
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn required(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_or<T: FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, raw))),
        None => Ok(default),
    }
}

fn millis_or(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    parse_or(lookup, key, default_ms).map(Duration::from_millis)
}

fn flag(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|v| v.trim().to_lowercase() == "true")
        .unwrap_or(false)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_worker_defaults() {
        let config = WorkerConfig::from_lookup(&lookup(&[
            ("WEB_SERVICE_HOST", "http://web"),
            ("RENDERER_TEXT_HOST", "http://renderertext"),
            ("RENDERER_P5_HOST", " "),
        ]))
        .unwrap();

        assert_eq!(config.web_service_host, "http://web");
        assert_eq!(
            config.renderers.render_url(ShowType::Text).as_deref(),
            Some("http://renderertext/render")
        );
        assert_eq!(config.renderers.render_url(ShowType::P5), None);
        assert_eq!(config.display.addr, "10.0.0.42:6450".parse().unwrap());
        assert!(!config.display.console);
        assert_eq!(config.renderer_connect_timeout, Duration::from_secs(5));
        assert_eq!(config.renderer_read_timeout, Duration::from_secs(5));
        assert_eq!(config.show_pacing, Duration::from_secs(1));
        assert_eq!(config.events_reconnect_backoff, Duration::from_secs(1));
        assert_eq!(config.events_idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_worker_overrides() {
        let config = WorkerConfig::from_lookup(&lookup(&[
            ("WEB_SERVICE_HOST", "http://web"),
            ("DO_NOT_SEND_TO_RITER", "TRUE"),
            ("DISPLAY_ADDR", "127.0.0.1:7000"),
            ("SHOW_PACING_MS", "250"),
        ]))
        .unwrap();

        assert!(config.display.console);
        assert_eq!(config.display.addr.port(), 7000);
        assert_eq!(config.show_pacing, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_web_service_host() {
        let err = WorkerConfig::from_lookup(&lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "WEB_SERVICE_HOST"));
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = WorkerConfig::from_lookup(&lookup(&[
            ("WEB_SERVICE_HOST", "http://web"),
            ("RENDERER_READ_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("RENDERER_READ_TIMEOUT_MS"));
    }

    #[test]
    fn test_osc_config() {
        let config = OscConfig::from_lookup(&lookup(&[
            ("WEB_SERVICE_HOST", "http://web"),
            ("OSC_BROADCAST_FORMAT", "wire"),
        ]))
        .unwrap();

        assert_eq!(config.udp_addr.port(), 12000);
        assert_eq!(config.http_addr.port(), 80);
        assert_eq!(config.subscriber_queue_capacity, 16);
        assert_eq!(config.broadcast_format, BroadcastFormat::Wire);

        assert!(OscConfig::from_lookup(&lookup(&[
            ("WEB_SERVICE_HOST", "http://web"),
            ("OSC_SUBSCRIBER_QUEUE_CAPACITY", "0"),
        ]))
        .is_err());
    }
}
