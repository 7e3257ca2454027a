use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};
use uuid::Uuid;

/// Default per-subscriber backlog before the oldest frame is dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Encoded frame as it goes out on a subscriber stream
pub type EncodedFrame = Arc<str>;

/// Bounded single-consumer queue that drops the oldest item when full
#[derive(Debug)]
pub struct FrameQueue {
    items: Mutex<VecDeque<EncodedFrame>>,
    capacity: usize,
    ready: Notify,
    dropped: AtomicU64,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            ready: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue without blocking; returns false if an old frame had to go
    pub fn push(&self, frame: EncodedFrame) -> bool {
        let mut overflowed = false;
        {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                items.pop_front();
                overflowed = true;
            }
            items.push_back(frame);
        }

        if overflowed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
        !overflowed
    }

    pub fn try_pop(&self) -> Option<EncodedFrame> {
        self.items.lock().pop_front()
    }

    /// Wait for the next frame
    pub async fn pop(&self) -> EncodedFrame {
        loop {
            if let Some(frame) = self.try_pop() {
                return frame;
            }
            // notify_one stores a permit, so a push between the check and
            // this await is not missed
            self.ready.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Live subscriber queues, one per open `/render` stream
#[derive(Clone)]
pub struct SubscriberRegistry {
    queues: Arc<RwLock<HashMap<Uuid, Arc<FrameQueue>>>>,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            queue_capacity,
        }
    }

    /// Register a fresh queue; it is removed again when the handle drops
    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let queue = Arc::new(FrameQueue::new(self.queue_capacity));
        self.queues.write().insert(id, queue.clone());
        info!(subscriber = %id, "Subscriber registered");

        Subscription {
            id,
            queue,
            registry: self.clone(),
        }
    }

    fn unsubscribe(&self, id: &Uuid) {
        if self.queues.write().remove(id).is_some() {
            info!(subscriber = %id, "Subscriber removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.queues.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.read().is_empty()
    }

    /// Push a frame onto every registered queue, returning how many got it
    pub fn broadcast(&self, frame: EncodedFrame) -> usize {
        let queues = self.queues.read();
        for (id, queue) in queues.iter() {
            if !queue.push(frame.clone()) {
                debug!(subscriber = %id, dropped = queue.dropped(), "Subscriber lagging, dropped oldest frame");
            }
        }
        queues.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one registered subscriber
pub struct Subscription {
    id: Uuid,
    queue: Arc<FrameQueue>,
    registry: SubscriberRegistry,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn next_frame(&self) -> EncodedFrame {
        self.queue.pop().await
    }

    pub fn try_next_frame(&self) -> Option<EncodedFrame> {
        self.queue.try_pop()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.id);
    }
}
