// Playback engine
//
// One sequential loop: refill the queue when it runs dry, play the next
// show frame by frame, and after every frame check whether a preemption came
// in. A preempting show plays to completion without being interruptible
// itself, and the interrupted show is abandoned rather than resumed.
//
// Nothing here is fatal. Service outages, renderer failures and malformed
// frames are logged and skipped.

use super::state::PlaybackState;
use crate::display::Transmitter;
use crate::frame::{Frame, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::renderer::RendererClient;
use crate::shows::{ShowId, ShowRecord, ShowService};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delays used by the engine loop
#[derive(Debug, Clone, Copy)]
pub struct EngineTiming {
    /// Pause after a show that ran without preemption
    pub show_pacing: Duration,
    /// Pause before asking again when the service has no shows
    pub empty_queue_retry: Duration,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            show_pacing: Duration::from_secs(1),
            empty_queue_retry: Duration::from_secs(1),
        }
    }
}

/// How a single show ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// The renderer stream ended (normally or not)
    Completed,
    /// A priority show took over
    ///
    /// `by` is the id taken from the queue head, whether or not its record
    /// could be fetched; `None` only if the queue was empty.
    Preempted { by: Option<ShowId> },
    /// The show could not be fetched
    Skipped,
}

/// Result of one pass through the engine loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStep {
    /// No show was available
    Idle,
    Played { show_id: ShowId, outcome: ShowOutcome },
}

pub struct PlaybackEngine {
    shows: Arc<dyn ShowService>,
    renderer: Arc<dyn RendererClient>,
    display: Arc<dyn Transmitter>,
    state: PlaybackState,
    timing: EngineTiming,
}

impl PlaybackEngine {
    pub fn new(
        shows: Arc<dyn ShowService>,
        renderer: Arc<dyn RendererClient>,
        display: Arc<dyn Transmitter>,
        state: PlaybackState,
        timing: EngineTiming,
    ) -> Self {
        Self {
            shows,
            renderer,
            display,
            state,
            timing,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Play shows for the life of the process
    pub async fn run(&self) {
        info!("Playback engine started");
        loop {
            self.step().await;
        }
    }

    /// One pass: make sure the queue has work, then play its head
    pub async fn step(&self) -> PlaybackStep {
        if !self.fill_queue().await {
            tokio::time::sleep(self.timing.empty_queue_retry).await;
            return PlaybackStep::Idle;
        }

        let Some(show_id) = self.state.queue.pop_front() else {
            return PlaybackStep::Idle;
        };

        // A flag raised between shows is already honoured: its id sits at
        // the head of the queue and is what we just popped.
        if self.state.preemption.take() {
            debug!(show_id, "Cleared preemption raised between shows");
        }

        let outcome = self.play_show(show_id).await;
        if !matches!(outcome, ShowOutcome::Preempted { .. }) {
            tokio::time::sleep(self.timing.show_pacing).await;
        }

        PlaybackStep::Played { show_id, outcome }
    }

    async fn fill_queue(&self) -> bool {
        if !self.state.queue.is_empty() {
            return true;
        }

        match self.shows.list_show_ids().await {
            Ok(ids) if ids.is_empty() => {
                info!(
                    "No shows found, sleeping for {:?} before asking again",
                    self.timing.empty_queue_retry
                );
                false
            }
            Ok(ids) => {
                info!("Fetched {} shows", ids.len());
                self.state.queue.extend(ids);
                true
            }
            Err(e) => {
                warn!("Could not fetch show list: {}", e);
                false
            }
        }
    }

    async fn fetch_show(&self, show_id: ShowId) -> Option<ShowRecord> {
        match self.shows.get_show(show_id).await {
            Ok(show) => Some(show),
            Err(e) => {
                warn!(show_id, "Skipping show: {}", e);
                None
            }
        }
    }

    async fn play_show(&self, show_id: ShowId) -> ShowOutcome {
        let Some(show) = self.fetch_show(show_id).await else {
            return ShowOutcome::Skipped;
        };
        info!(show_id, show_type = %show.show_type, "Playing show");

        let mut frames = self.renderer.stream(show.show_type, show.payload);
        let mut preempted = false;
        while let Some(raw) = frames.next().await {
            self.transmit(&raw);
            if self.state.preemption.take() {
                preempted = true;
                break;
            }
        }

        if !preempted {
            return ShowOutcome::Completed;
        }

        // Whatever the interrupted renderer had left is discarded
        drop(frames);
        let by = self.play_priority_show().await;
        ShowOutcome::Preempted { by }
    }

    async fn play_priority_show(&self) -> Option<ShowId> {
        let Some(show_id) = self.state.queue.pop_front() else {
            warn!("Preemption raised with an empty queue");
            return None;
        };
        info!(show_id, "Immediately jumping to show");

        let Some(show) = self.fetch_show(show_id).await else {
            return Some(show_id);
        };

        // No preemption checks in here: a priority show cannot be interrupted
        let mut frames = self.renderer.stream(show.show_type, show.payload);
        while let Some(raw) = frames.next().await {
            self.transmit(&raw);
        }

        Some(show_id)
    }

    fn transmit(&self, raw: &[u8]) {
        match Frame::decode(raw, DISPLAY_WIDTH, DISPLAY_HEIGHT) {
            Ok(frame) => self.display.send(&frame),
            Err(e) => warn!("Dropping malformed frame from renderer: {}", e),
        }
    }
}
