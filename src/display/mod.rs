// Display transmitters
//
// A transmitter takes finished frames and gets them onto the panel. The real
// one fires UDP datagrams at the panel controller; the console one repaints
// the terminal so the worker can be run without hardware.

mod console;
mod udp;

pub use console::{render_ascii, ConsoleTransmitter};
pub use udp::UdpTransmitter;

use crate::config::DisplayConfig;
use crate::frame::Frame;
use std::sync::Arc;
use tracing::info;

/// Sink for frames headed to the panel
///
/// `send` never blocks and never reports failure: a lost frame is simply
/// replaced by the next one.
pub trait Transmitter: Send + Sync {
    fn send(&self, frame: &Frame);
}

/// Build the transmitter selected by the configuration
pub async fn from_config(config: &DisplayConfig) -> std::io::Result<Arc<dyn Transmitter>> {
    if config.console {
        info!("Display output goes to the console (DO_NOT_SEND_TO_RITER=true)");
        return Ok(Arc::new(ConsoleTransmitter::new()));
    }

    let transmitter = UdpTransmitter::bind(config.addr).await?;
    info!("Display output goes to udp://{}", config.addr);
    Ok(Arc::new(transmitter))
}
