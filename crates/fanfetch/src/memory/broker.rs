use crate::{BoxError, Fetched, Message, MessageSource, Route, SourceConnector};
use bytes::Bytes;
use core::time::Duration;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tokio::{
    sync::Notify,
    time::{Instant, timeout_at},
};

/// How long a poll waits for new messages before returning an empty batch.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Upper bound on the number of messages returned by a single poll.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Errors raised by [`MemoryBroker`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("Topic `{0}` is closed")]
    TopicClosed(String),
}

/// An in-process broker with one FIFO queue per topic.
///
/// Topics are created on first use. Every route connected to the same topic
/// competes for the same queue, like consumers sharing a group. Closing a topic
/// lets its sources drain what is left and then report
/// [`Fetched::EndOfStream`].
///
/// Clones share the same topics.
#[derive(Clone, Debug)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    topics: RwLock<HashMap<Arc<str>, Arc<Topic>>>,
    poll_timeout: Duration,
    max_batch_size: usize,
}

#[derive(Debug)]
struct Topic {
    name: Arc<str>,
    queue: Mutex<VecDeque<Message>>,
    next_offset: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl Topic {
    fn new(name: Arc<str>) -> Self {
        Self {
            name,
            queue: Mutex::new(VecDeque::new()),
            next_offset: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    fn take_batch(&self, max: usize) -> Vec<Message> {
        let mut queue = self.queue.lock();
        let n = queue.len().min(max);
        queue.drain(..n).collect()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_TIMEOUT, DEFAULT_MAX_BATCH_SIZE)
    }
}

impl MemoryBroker {
    /// Creates a broker whose sources wait at most `poll_timeout` for
    /// messages and return at most `max_batch_size` messages per poll.
    ///
    /// A `max_batch_size` of zero is treated as one.
    pub fn new(poll_timeout: Duration, max_batch_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: RwLock::new(HashMap::new()),
                poll_timeout,
                max_batch_size: max_batch_size.max(1),
            }),
        }
    }

    fn topic(&self, name: &str) -> Arc<Topic> {
        if let Some(topic) = self.inner.topics.read().get(name) {
            return Arc::clone(topic);
        }

        let mut topics = self.inner.topics.write();
        let topic = topics
            .entry(Arc::from(name))
            .or_insert_with_key(|name| Arc::new(Topic::new(Arc::clone(name))));
        Arc::clone(topic)
    }

    /// Appends a message to `topic` and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::TopicClosed`] if the topic was closed.
    pub fn publish(
        &self,
        topic: &str,
        key: Option<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Result<u64, MemoryError> {
        let topic = self.topic(topic);
        if topic.is_closed() {
            return Err(MemoryError::TopicClosed(topic.name.to_string()));
        }

        let offset = {
            let mut queue = topic.queue.lock();
            let offset = topic.next_offset.fetch_add(1, Ordering::Relaxed);
            queue.push_back(Message {
                topic: Arc::clone(&topic.name),
                partition: 0,
                offset,
                key,
                payload: payload.into(),
            });
            offset
        };
        topic.notify.notify_waiters();

        Ok(offset)
    }

    /// Marks `topic` as finished. Pending messages are still delivered.
    pub fn close(&self, topic: &str) {
        self.topic(topic).close();
    }

    /// Closes every known topic.
    pub fn close_all(&self) {
        for topic in self.inner.topics.read().values() {
            topic.close();
        }
    }

    /// Number of messages waiting in `topic`.
    pub fn pending(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .get(topic)
            .map_or(0, |topic| topic.queue.lock().len())
    }
}

impl SourceConnector for MemoryBroker {
    fn connect(&self, route: &Route) -> Result<Box<dyn MessageSource>, BoxError> {
        Ok(Box::new(MemorySource {
            topic: self.topic(route.topic()),
            poll_timeout: self.inner.poll_timeout,
            max_batch_size: self.inner.max_batch_size,
        }))
    }
}

/// A [`MessageSource`] reading one topic of a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemorySource {
    topic: Arc<Topic>,
    poll_timeout: Duration,
    max_batch_size: usize,
}

impl MessageSource for MemorySource {
    fn poll(&mut self) -> BoxFuture<'_, Result<Fetched, BoxError>> {
        Box::pin(async move {
            let deadline = Instant::now() + self.poll_timeout;
            loop {
                // Register interest before checking the queue so a publish in
                // between is not missed.
                let notified = self.topic.notify.notified();

                let batch = self.topic.take_batch(self.max_batch_size);
                if !batch.is_empty() {
                    return Ok(Fetched::Batch(batch));
                }
                if self.topic.is_closed() {
                    return Ok(Fetched::EndOfStream);
                }
                if timeout_at(deadline, notified).await.is_err() {
                    return Ok(Fetched::Batch(Vec::new()));
                }
            }
        })
    }
}
