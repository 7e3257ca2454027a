mod engine;
mod listener;
mod state;

pub use engine::{EngineTiming, PlaybackEngine, PlaybackStep, ShowOutcome};
pub use listener::EventListener;
pub use state::{PlaybackState, PreemptionFlag, ShowQueue};
