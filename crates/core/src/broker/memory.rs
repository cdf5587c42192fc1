//! In-process broker with AMQP-style delivery semantics.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use super::error::BrokerError;
use super::traits::{Acker, Broker, Channel};
use super::types::{Delivery, DeliveryStream, Envelope};

/// Prefix of broker-allocated reply queue names.
const REPLY_QUEUE_PREFIX: &str = "amq.gen-";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding one of these locks leaves the data consistent.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
struct QueuedMessage {
    envelope: Envelope,
    redelivered: bool,
}

struct MemoryQueue {
    messages: Mutex<VecDeque<QueuedMessage>>,
    notify: Notify,
    deleted: AtomicBool,
}

impl MemoryQueue {
    fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            deleted: AtomicBool::new(false),
        }
    }

    fn push(&self, message: QueuedMessage) {
        lock(&self.messages).push_back(message);
        self.notify.notify_one();
    }

    fn requeue(&self, mut message: QueuedMessage) {
        if self.deleted.load(Ordering::SeqCst) {
            return;
        }
        message.redelivered = true;
        lock(&self.messages).push_front(message);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<QueuedMessage> {
        lock(&self.messages).pop_front()
    }

    fn depth(&self) -> usize {
        lock(&self.messages).len()
    }

    fn delete(&self) {
        self.deleted.store(true, Ordering::SeqCst);
        lock(&self.messages).clear();
        self.notify.notify_waiters();
    }
}

#[derive(Default)]
struct BrokerState {
    queues: Mutex<HashMap<String, Arc<MemoryQueue>>>,
    published: Mutex<HashMap<String, u64>>,
    channels_opened: AtomicU64,
}

impl BrokerState {
    fn queue(&self, name: &str) -> Option<Arc<MemoryQueue>> {
        lock(&self.queues).get(name).cloned()
    }
}

/// In-process broker.
///
/// Mirrors what the gateway and workers rely on from a real broker:
/// - competing consumers on named work queues
/// - broker-named reply queues deleted with their owning channel
/// - unacknowledged deliveries requeued when their channel closes
/// - publishes to a missing queue silently dropped
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<BrokerState>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publishes addressed to `destination`, delivered or not.
    pub fn published_count(&self, destination: &str) -> u64 {
        lock(&self.state.published)
            .get(destination)
            .copied()
            .unwrap_or(0)
    }

    /// Number of publishes across all destinations.
    pub fn total_published(&self) -> u64 {
        lock(&self.state.published).values().sum()
    }

    /// Messages waiting in a queue (not counting unacknowledged ones).
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.state.queue(queue).map(|q| q.depth()).unwrap_or(0)
    }

    /// Whether a queue currently exists.
    pub fn queue_exists(&self, queue: &str) -> bool {
        self.state.queue(queue).is_some()
    }

    /// Total channels opened over the broker's lifetime.
    pub fn channels_opened(&self) -> u64 {
        self.state.channels_opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open_channel(&self) -> Result<Box<dyn Channel>, BrokerError> {
        let id = self.state.channels_opened.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Box::new(MemoryChannel {
            state: Arc::new(ChannelState {
                id,
                broker: Arc::clone(&self.state),
                closed: AtomicBool::new(false),
                next_tag: AtomicU64::new(1),
                unacked: Mutex::new(HashMap::new()),
                owned_queues: Mutex::new(Vec::new()),
                consumed: Mutex::new(Vec::new()),
            }),
        }))
    }
}

enum Take {
    Message(u64, QueuedMessage),
    Empty,
    Closed,
}

struct ChannelState {
    id: u64,
    broker: Arc<BrokerState>,
    closed: AtomicBool,
    next_tag: AtomicU64,
    unacked: Mutex<HashMap<u64, (Arc<MemoryQueue>, QueuedMessage)>>,
    owned_queues: Mutex<Vec<String>>,
    consumed: Mutex<Vec<Arc<MemoryQueue>>>,
}

impl ChannelState {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn take(&self, queue: &Arc<MemoryQueue>) -> Take {
        // `closed` only flips under the unacked lock, so a message taken here
        // is either tracked for requeue or never leaves the queue.
        let mut unacked = lock(&self.unacked);
        if self.is_closed() || queue.deleted.load(Ordering::SeqCst) {
            return Take::Closed;
        }
        match queue.pop() {
            Some(message) => {
                let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
                unacked.insert(tag, (Arc::clone(queue), message.clone()));
                Take::Message(tag, message)
            }
            None => Take::Empty,
        }
    }

    fn settle(&self, tag: u64) -> Option<(Arc<MemoryQueue>, QueuedMessage)> {
        lock(&self.unacked).remove(&tag)
    }

    fn shutdown(&self) {
        let pending: Vec<_> = {
            let mut unacked = lock(&self.unacked);
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            unacked.drain().map(|(_, entry)| entry).collect()
        };

        if !pending.is_empty() {
            debug!(
                "Channel {} closed with {} unacknowledged deliveries, requeueing",
                self.id,
                pending.len()
            );
        }
        for (queue, message) in pending {
            queue.requeue(message);
        }

        let owned: Vec<String> = lock(&self.owned_queues).drain(..).collect();
        for name in owned {
            if let Some(queue) = lock(&self.broker.queues).remove(&name) {
                queue.delete();
            }
        }

        for queue in lock(&self.consumed).drain(..) {
            queue.notify.notify_waiters();
        }
    }
}

/// A channel on a `MemoryBroker`.
pub struct MemoryChannel {
    state: Arc<ChannelState>,
}

impl MemoryChannel {
    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.state.is_closed() {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn declare_work_queue(&self, name: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        lock(&self.state.broker.queues)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryQueue::new()));
        Ok(())
    }

    async fn declare_reply_queue(&self) -> Result<String, BrokerError> {
        self.ensure_open()?;
        let name = format!("{}{}", REPLY_QUEUE_PREFIX, Uuid::new_v4().simple());
        lock(&self.state.broker.queues).insert(name.clone(), Arc::new(MemoryQueue::new()));
        lock(&self.state.owned_queues).push(name.clone());
        Ok(name)
    }

    async fn publish(&self, destination: &str, envelope: Envelope) -> Result<(), BrokerError> {
        self.ensure_open()?;
        *lock(&self.state.broker.published)
            .entry(destination.to_string())
            .or_insert(0) += 1;

        match self.state.broker.queue(destination) {
            Some(queue) => queue.push(QueuedMessage {
                envelope,
                redelivered: false,
            }),
            None => debug!("No queue {}, dropping unroutable message", destination),
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        self.ensure_open()?;
        let target = self
            .state
            .broker
            .queue(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        lock(&self.state.consumed).push(Arc::clone(&target));

        let state = Arc::clone(&self.state);
        let stream = futures::stream::unfold((state, target), |(state, queue)| async move {
            loop {
                // Created before checking so a wakeup between the check and
                // the await is not lost.
                let notified = queue.notify.notified();
                match state.take(&queue) {
                    Take::Message(tag, message) => {
                        drop(notified);
                        let acker = MemoryAcker {
                            state: Arc::clone(&state),
                            tag,
                        };
                        let delivery =
                            Delivery::new(message.envelope, message.redelivered, Box::new(acker));
                        return Some((Ok(delivery), (state, queue)));
                    }
                    Take::Closed => {
                        drop(notified);
                        // Pass a wakeup we may have swallowed on to the next consumer.
                        if queue.depth() > 0 {
                            queue.notify.notify_one();
                        }
                        return None;
                    }
                    Take::Empty => notified.await,
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.state.shutdown();
        Ok(())
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.state.shutdown();
    }
}

struct MemoryAcker {
    state: Arc<ChannelState>,
    tag: u64,
}

#[async_trait]
impl Acker for MemoryAcker {
    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        self.state
            .settle(self.tag)
            .map(|_| ())
            .ok_or_else(|| BrokerError::Ack(format!("unknown delivery tag {}", self.tag)))
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), BrokerError> {
        let (queue, message) = self
            .state
            .settle(self.tag)
            .ok_or_else(|| BrokerError::Ack(format!("unknown delivery tag {}", self.tag)))?;
        if requeue {
            queue.requeue(message);
        }
        Ok(())
    }
}
