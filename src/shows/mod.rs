// Show-management service boundary
//
// Shows are owned by the web service; the worker only reads them, either as
// the ordered list of enabled ids or one record at a time.

mod http;

pub use http::HttpShowService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a show in the web service
pub type ShowId = i64;

/// Result type for show-service calls
pub type ShowServiceResult<T> = Result<T, ShowServiceError>;

/// Errors from the show-management service
#[derive(Debug, thiserror::Error)]
pub enum ShowServiceError {
    #[error("Show not found: {0}")]
    NotFound(ShowId),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("No data from {url} within {timeout:?}")]
    Idle { url: String, timeout: std::time::Duration },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Which renderer a show needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowType {
    Text,
    P5,
    Shader,
    Wasm,
    Osc,
    Noise,
    Image,
}

impl ShowType {
    pub const ALL: [ShowType; 7] = [
        ShowType::Text,
        ShowType::P5,
        ShowType::Shader,
        ShowType::Wasm,
        ShowType::Osc,
        ShowType::Noise,
        ShowType::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShowType::Text => "text",
            ShowType::P5 => "p5",
            ShowType::Shader => "shader",
            ShowType::Wasm => "wasm",
            ShowType::Osc => "osc",
            ShowType::Noise => "noise",
            ShowType::Image => "image",
        }
    }
}

impl fmt::Display for ShowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShowType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown show type: {}", s))
    }
}

/// A show as returned by `get_show/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowRecord {
    pub show_type: ShowType,
    /// Opaque to the worker, forwarded to the renderer as-is
    pub payload: serde_json::Value,
}

/// Read access to the show-management service
#[async_trait]
pub trait ShowService: Send + Sync {
    /// Ids of all enabled shows, in playback order
    async fn list_show_ids(&self) -> ShowServiceResult<Vec<ShowId>>;

    /// Full record of one show
    async fn get_show(&self, id: ShowId) -> ShowServiceResult<ShowRecord>;
}
