use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use studio_core::ProgressEvent;

/// Queue depth used when the settings do not ask for another one.
pub const DEFAULT_CAPACITY: usize = 4;

#[derive(Debug)]
struct Queue {
    events: VecDeque<ProgressEvent>,
    capacity: usize,
    closed: bool,
    dropped: u64,
}

#[derive(Debug)]
struct Shared {
    queue: Mutex<Queue>,
}

impl Shared {
    // A poisoned lock only means the other side panicked mid-push; the queue is still consistent.
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bounded single-producer/single-consumer progress transport.
///
/// The producer never blocks: when the queue is full the oldest event is
/// discarded so the newest one always reaches the consumer (latest-wins).
pub struct ProgressChannel;

impl ProgressChannel {
    /// Creates a channel holding at most `capacity` events (minimum 1).
    pub fn bounded(capacity: usize) -> (ProgressSender, ProgressReceiver) {
        let capacity = capacity.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                events: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
                dropped: 0,
            }),
        });
        (
            ProgressSender {
                shared: shared.clone(),
            },
            ProgressReceiver { shared },
        )
    }
}

/// Producer end, owned by the worker thread.
#[derive(Debug)]
pub struct ProgressSender {
    shared: Arc<Shared>,
}

impl ProgressSender {
    /// Queues an event without blocking. Returns `false` once the channel is closed.
    pub fn try_push(&self, event: ProgressEvent) -> bool {
        let mut queue = self.shared.lock();
        if queue.closed {
            return false;
        }
        if queue.events.len() >= queue.capacity {
            queue.events.pop_front();
            queue.dropped += 1;
        }
        queue.events.push_back(event);
        true
    }

    /// Marks end-of-stream. Already queued events stay readable.
    pub fn close(&self) {
        self.shared.lock().closed = true;
    }

    /// Events discarded so far because the consumer lagged behind.
    pub fn dropped(&self) -> u64 {
        self.shared.lock().dropped
    }
}

impl Drop for ProgressSender {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelRecv {
    Event(ProgressEvent),
    Empty,
    /// Closed and fully drained.
    Closed,
}

/// Result of draining everything queued in one go.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drained {
    pub latest: Option<ProgressEvent>,
    /// Events superseded by `latest` within this drain.
    pub coalesced: usize,
    /// The producer closed the channel and nothing is left to read.
    pub closed: bool,
}

/// Consumer end, owned by the UI-thread monitor.
#[derive(Debug)]
pub struct ProgressReceiver {
    shared: Arc<Shared>,
}

impl ProgressReceiver {
    pub fn try_pop(&self) -> ChannelRecv {
        let mut queue = self.shared.lock();
        match queue.events.pop_front() {
            Some(event) => ChannelRecv::Event(event),
            None if queue.closed => ChannelRecv::Closed,
            None => ChannelRecv::Empty,
        }
    }

    pub fn drain_latest(&self) -> Drained {
        let mut queue = self.shared.lock();
        let count = queue.events.len();
        let latest = queue.events.drain(..).last();
        Drained {
            latest,
            coalesced: count.saturating_sub(1),
            closed: queue.closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        let queue = self.shared.lock();
        queue.closed && queue.events.is_empty()
    }
}
