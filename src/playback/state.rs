use crate::shows::ShowId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pending show ids
///
/// FIFO for normal playback; preemptions jump the line with `push_front`.
#[derive(Debug, Default)]
pub struct ShowQueue {
    ids: Mutex<VecDeque<ShowId>>,
}

impl ShowQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&self, id: ShowId) {
        self.ids.lock().push_back(id);
    }

    pub fn push_front(&self, id: ShowId) {
        self.ids.lock().push_front(id);
    }

    /// Append a batch, keeping any priority ids already queued in front
    pub fn extend(&self, ids: impl IntoIterator<Item = ShowId>) {
        self.ids.lock().extend(ids);
    }

    pub fn pop_front(&self) -> Option<ShowId> {
        self.ids.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<ShowId> {
        self.ids.lock().iter().copied().collect()
    }
}

/// Edge-triggered "look at the queue now" signal
#[derive(Debug, Default)]
pub struct PreemptionFlag {
    raised: AtomicBool,
}

impl PreemptionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Read and clear in one step
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// State shared between the playback engine and the event listener
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub queue: Arc<ShowQueue>,
    pub preemption: Arc<PreemptionFlag>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `id` at the head of the queue and signal the engine
    ///
    /// The id is queued before the flag goes up, so an engine that sees the
    /// flag always finds the id.
    pub fn preempt_with(&self, id: ShowId) {
        self.queue.push_front(id);
        self.preemption.raise();
    }
}
