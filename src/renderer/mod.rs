// Renderer stream client
//
// Every renderer is a black box behind `POST /render` that answers with a
// stream of `screen_update` events. The client turns one such response into a
// lazy, finite stream of raw bitmaps. Renderer failures never surface as
// errors: the stream just ends, and a truncated show looks the same as one
// that finished with `end`.

mod http;

pub use http::{HttpRendererClient, RendererEndpoints};

use crate::shows::ShowType;
use futures::stream::Stream;
use std::pin::Pin;

/// Raw bitmaps in the renderer representation, in production order
pub type FrameStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Errors that end a renderer stream before the first frame
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("No renderer configured for show type {0}")]
    NotConfigured(ShowType),

    #[error("Renderer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Renderer did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Source of per-show frame streams
pub trait RendererClient: Send + Sync {
    /// Start rendering `payload` with the renderer for `show_type`
    ///
    /// Nothing happens until the stream is polled. The stream is not
    /// restartable; call again for a fresh one.
    fn stream(&self, show_type: ShowType, payload: serde_json::Value) -> FrameStream;
}
