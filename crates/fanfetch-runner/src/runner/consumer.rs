use super::telemetry::{increment_dispatch_failures, increment_messages_consumed};
use fanfetch::{BoxError, Consumer, ConsumerFactory, Error, Message, Monitor, TracingMonitor};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Builds consumers that log every message they receive.
///
/// Clones share one consumed-message counter.
#[derive(Clone, Debug, Default)]
pub struct LoggingConsumers {
    consumed: Arc<AtomicU64>,
}

impl LoggingConsumers {
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }
}

impl ConsumerFactory for LoggingConsumers {
    fn build(&self) -> Result<Box<dyn Consumer>, BoxError> {
        Ok(Box::new(LoggingConsumer {
            consumed: Arc::clone(&self.consumed),
        }))
    }
}

struct LoggingConsumer {
    consumed: Arc<AtomicU64>,
}

impl Consumer for LoggingConsumer {
    fn consume(&mut self, message: Message) -> Result<(), BoxError> {
        tracing::info!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            key = ?message.key.as_deref().map(String::from_utf8_lossy),
            "{}",
            String::from_utf8_lossy(&message.payload)
        );
        increment_messages_consumed(&message.topic);
        self.consumed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// [`TracingMonitor`] plus a failure counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeteredMonitor;

impl Monitor for MeteredMonitor {
    fn notice_error(&self, source: &str, error: &Error) {
        increment_dispatch_failures(source);
        TracingMonitor.notice_error(source, error);
    }
}
