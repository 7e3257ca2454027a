pub mod cli;
pub mod config;
pub mod display;
pub mod frame;
pub mod osc;
pub mod playback;
pub mod renderer;
pub mod shows;
pub mod sse;

pub use config::{ConfigError, DisplayConfig, OscConfig, WorkerConfig};
pub use frame::{Frame, FormatError, DISPLAY_HEIGHT, DISPLAY_WIDTH, WIRE_FRAME_LEN};
pub use playback::{PlaybackEngine, PlaybackState};
