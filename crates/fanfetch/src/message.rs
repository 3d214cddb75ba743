use bytes::Bytes;
use std::sync::Arc;

/// A single record pulled from a topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub topic: Arc<str>,
    pub partition: u32,
    pub offset: u64,
    pub key: Option<Bytes>,
    pub payload: Bytes,
}

impl Message {
    pub fn new(topic: impl Into<Arc<str>>, offset: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            partition: 0,
            offset,
            key: None,
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_partition(mut self, partition: u32) -> Self {
        self.partition = partition;
        self
    }
}

/// Outcome of one pull from a [`MessageSource`](crate::MessageSource).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetched {
    /// Messages available right now. May be empty when the source timed out
    /// waiting for new records.
    Batch(Vec<Message>),
    /// The source will never produce another message.
    EndOfStream,
}

impl Fetched {
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}
