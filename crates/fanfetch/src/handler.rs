use crate::{ConsumerFactory, Error, Message, Result};
use core::fmt;
use std::sync::Arc;

/// The callable every worker group hands its messages to.
///
/// Each invocation builds a brand new [`Consumer`](crate::Consumer) from the
/// factory and delegates the message to it exactly once. The handler itself is
/// cheap to clone and is shared by every group of a dispatch call.
#[derive(Clone)]
pub struct MessageHandler {
    factory: Arc<dyn ConsumerFactory>,
}

impl MessageHandler {
    pub fn new(factory: Arc<dyn ConsumerFactory>) -> Self {
        Self { factory }
    }

    /// Consumes `message` with a freshly built consumer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consume`] if the consumer cannot be built or fails to
    /// consume the message. The collaborator's error is kept as the source.
    pub fn call(&self, message: Message) -> Result<()> {
        let topic = message.topic.clone();
        let offset = message.offset;
        let consume_error = |source| Error::Consume {
            topic: topic.to_string(),
            offset,
            source,
        };

        let mut consumer = self.factory.build().map_err(consume_error)?;
        consumer.consume(message).map_err(consume_error)
    }
}

impl fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandler").finish_non_exhaustive()
    }
}
