//! Error types for the fetch dispatcher.
//!
//! [`Error`] is the single category every dispatch call fails with. It covers
//! configuration problems detected before any work starts, the route coverage
//! invariant, failures raised by collaborators (registry, broker connection,
//! fetch, consumer) and worker tasks that died without reporting a result.
//!
//! Collaborator errors are carried as [`BoxError`] so that the original type
//! and message survive end-to-end and can be recovered with
//! [`std::error::Error::source`] and `downcast_ref`.

/// Boxed error produced by an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All failures a dispatch call can surface.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The concurrency ceiling or a required collaborator is invalid or
    /// missing.
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// Partitioning did not cover the route set exactly once.
    #[error("Partition invariant violated: expected {expected} routes, covered {actual}")]
    Partition { expected: usize, actual: usize },

    /// The route registry could not produce a route snapshot.
    #[error("Route registry error: {0}")]
    Registry(#[source] BoxError),

    /// A worker group could not open a message source for a route.
    #[error("Failed to connect route `{topic}`: {source}")]
    Connect {
        topic: String,
        #[source]
        source: BoxError,
    },

    /// Pulling from a message source failed.
    #[error("Failed to fetch from `{topic}`: {source}")]
    Fetch {
        topic: String,
        #[source]
        source: BoxError,
    },

    /// Building the consumer or consuming a message failed.
    #[error("Failed to consume `{topic}`@{offset}: {source}")]
    Consume {
        topic: String,
        offset: u64,
        #[source]
        source: BoxError,
    },

    /// A worker group task panicked.
    #[error("Worker group {group} panicked: {message}")]
    WorkerPanicked { group: usize, message: String },

    /// A worker group task was aborted before producing a result.
    #[error("Worker group {group} was aborted")]
    WorkerAborted { group: usize },

    /// A dispatch call was made after the application was stopped.
    #[error("Application is stopped")]
    ApplicationStopped,
}

impl Error {
    /// Returns `true` for failures raised while a worker group was running.
    pub const fn is_worker_failure(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Fetch { .. }
                | Self::Consume { .. }
                | Self::WorkerPanicked { .. }
                | Self::WorkerAborted { .. }
        )
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, thiserror::Error)]
    #[error("broker went away")]
    struct BrokerDown;

    #[test]
    fn preserves_collaborator_error() {
        let err = Error::Fetch {
            topic: "orders".to_string(),
            source: Box::new(BrokerDown),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch from `orders`: broker went away"
        );
        let source = err.source().expect("source is kept");
        assert!(source.downcast_ref::<BrokerDown>().is_some());
        assert!(err.is_worker_failure());
    }

    #[test]
    fn classifies_dispatch_failures() {
        assert!(!Error::configuration("zero").is_worker_failure());
        assert!(!Error::Registry(Box::new(BrokerDown)).is_worker_failure());
        assert!(Error::WorkerAborted { group: 3 }.is_worker_failure());
    }
}
