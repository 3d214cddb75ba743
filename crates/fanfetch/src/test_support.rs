//! Collaborator doubles shared by the unit tests.

use crate::{
    AppController, AppState, BoxError, Consumer, ConsumerFactory, Error, Fetched, Message,
    MessageSource, Monitor, Route, RouteRegistry, SourceConnector, memory::MemoryBroker,
};
use core::time::Duration;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use portable_atomic::{AtomicUsize, Ordering};
use std::{collections::HashSet, sync::Arc};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
#[error("registry unavailable")]
pub struct RegistryDown;

pub struct FailingRegistry;

impl RouteRegistry for FailingRegistry {
    fn all_routes(&self) -> Result<Vec<Route>, BoxError> {
        Err(Box::new(RegistryDown))
    }
}

/// Controller that counts `stop` calls on top of a real [`AppState`].
#[derive(Default)]
pub struct CountingController {
    state: AppState,
    stops: AtomicUsize,
}

impl CountingController {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AppController for CountingController {
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.state.stop();
    }

    fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown_token()
    }
}

/// Monitor that records `(source, error message)` pairs.
#[derive(Default)]
pub struct RecordingMonitor {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingMonitor {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

impl Monitor for RecordingMonitor {
    fn notice_error(&self, source: &str, error: &Error) {
        self.calls
            .lock()
            .push((source.to_string(), error.to_string()));
    }
}

#[derive(Debug, thiserror::Error)]
#[error("cannot process `{0}`")]
pub struct PoisonMessage(pub String);

/// Consumer factory that records every consumed message.
///
/// A consumer is built per message. Payloads listed in `poison` fail with
/// [`PoisonMessage`]; payloads listed in `panic_on` panic.
#[derive(Clone, Default)]
pub struct Collector {
    inner: Arc<CollectorInner>,
}

#[derive(Default)]
struct CollectorInner {
    built: AtomicUsize,
    seen: Mutex<Vec<Message>>,
    poison: Mutex<HashSet<String>>,
    panic_on: Mutex<HashSet<String>>,
}

impl Collector {
    pub fn poison(&self, payload: &str) {
        self.inner.poison.lock().insert(payload.to_string());
    }

    pub fn panic_on(&self, payload: &str) {
        self.inner.panic_on.lock().insert(payload.to_string());
    }

    pub fn built(&self) -> usize {
        self.inner.built.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Message> {
        self.inner.seen.lock().clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.seen()
            .iter()
            .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
            .collect()
    }
}

impl ConsumerFactory for Collector {
    fn build(&self) -> Result<Box<dyn Consumer>, BoxError> {
        self.inner.built.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        Ok(Box::new(move |message: Message| -> Result<(), BoxError> {
            let payload = String::from_utf8_lossy(&message.payload).into_owned();
            if inner.panic_on.lock().contains(&payload) {
                panic!("consumer exploded on {payload}");
            }
            if inner.poison.lock().contains(&payload) {
                return Err(Box::new(PoisonMessage(payload)));
            }
            inner.seen.lock().push(message);
            Ok(())
        }))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("source for `{0}` failed")]
pub struct SourceFailed(pub String);

/// Connector over a [`MemoryBroker`] that tracks live sources and can inject
/// connect or poll failures per topic.
#[derive(Clone)]
pub struct TrackingConnector {
    broker: MemoryBroker,
    live: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
    fail_connect: Arc<Mutex<HashSet<String>>>,
    fail_poll: Arc<Mutex<HashSet<String>>>,
}

impl TrackingConnector {
    pub fn new(broker: MemoryBroker) -> Self {
        Self {
            broker,
            live: Arc::default(),
            connects: Arc::default(),
            fail_connect: Arc::default(),
            fail_poll: Arc::default(),
        }
    }

    pub fn fail_connect(&self, topic: &str) {
        self.fail_connect.lock().insert(topic.to_string());
    }

    pub fn fail_poll(&self, topic: &str) {
        self.fail_poll.lock().insert(topic.to_string());
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Waits until every source handed out has been dropped.
    pub async fn wait_all_dropped(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.live() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sources were not released");
    }
}

impl SourceConnector for TrackingConnector {
    fn connect(&self, route: &Route) -> Result<Box<dyn MessageSource>, BoxError> {
        if self.fail_connect.lock().contains(route.topic()) {
            return Err(Box::new(SourceFailed(route.topic().to_string())));
        }

        let inner = self.broker.connect(route)?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedSource {
            topic: route.topic().to_string(),
            inner,
            live: Arc::clone(&self.live),
            fail_poll: self.fail_poll.lock().contains(route.topic()),
        }))
    }
}

struct TrackedSource {
    topic: String,
    inner: Box<dyn MessageSource>,
    live: Arc<AtomicUsize>,
    fail_poll: bool,
}

impl MessageSource for TrackedSource {
    fn poll(&mut self) -> BoxFuture<'_, Result<Fetched, BoxError>> {
        if self.fail_poll {
            let err: BoxError = Box::new(SourceFailed(self.topic.clone()));
            return Box::pin(async move { Err(err) });
        }
        self.inner.poll()
    }
}

impl Drop for TrackedSource {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn topics(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("topic-{i}")).collect()
}

pub fn short_poll_broker() -> MemoryBroker {
    MemoryBroker::new(Duration::from_millis(10), 16)
}
