//! Collaborator contracts consumed by the dispatcher.
//!
//! The dispatcher owns none of the moving parts of a consumer application. It
//! reads routes from a [`RouteRegistry`], the concurrency ceiling from
//! [`Settings`], opens [`MessageSource`]s through a [`SourceConnector`], builds
//! [`Consumer`]s from a [`ConsumerFactory`], and on failure talks to an
//! [`AppController`] and a [`Monitor`].

use crate::{BoxError, Error, Fetched, Message, Route};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Source of the subscribed route set.
pub trait RouteRegistry: Send + Sync {
    /// Returns a snapshot of every route in registration order.
    ///
    /// Called exactly once per dispatch call.
    fn all_routes(&self) -> Result<Vec<Route>, BoxError>;
}

/// Runtime settings read by the dispatcher.
pub trait Settings: Send + Sync {
    /// Target number of routes per worker group. Must be positive.
    fn max_concurrency(&self) -> usize;
}

/// Process-wide application lifecycle.
pub trait AppController: Send + Sync {
    /// Moves the application to the stopped state. Must be idempotent.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// Root token cancelled by [`stop`](Self::stop). Worker groups run under
    /// child tokens of it.
    fn shutdown_token(&self) -> CancellationToken;
}

/// Error reporting sink.
pub trait Monitor: Send + Sync {
    /// Records `error` raised by the component identified by `source`.
    ///
    /// Implementations must not panic.
    fn notice_error(&self, source: &str, error: &Error);
}

/// A pull-based stream of messages for a single route.
pub trait MessageSource: Send {
    /// Pulls the next batch of available messages.
    ///
    /// Implementations may wait for a bounded amount of time and return an
    /// empty batch when nothing arrived, or [`Fetched::EndOfStream`] once the
    /// stream is exhausted.
    fn poll(&mut self) -> BoxFuture<'_, Result<Fetched, BoxError>>;
}

/// Opens message sources for routes.
pub trait SourceConnector: Send + Sync {
    fn connect(&self, route: &Route) -> Result<Box<dyn MessageSource>, BoxError>;
}

/// Per-message business logic.
pub trait Consumer {
    fn consume(&mut self, message: Message) -> Result<(), BoxError>;
}

impl<F> Consumer for F
where
    F: FnMut(Message) -> Result<(), BoxError>,
{
    fn consume(&mut self, message: Message) -> Result<(), BoxError> {
        self(message)
    }
}

/// Builds a fresh [`Consumer`]. Construction may have side effects and may
/// fail.
pub trait ConsumerFactory: Send + Sync {
    fn build(&self) -> Result<Box<dyn Consumer>, BoxError>;
}

impl<F> ConsumerFactory for F
where
    F: Fn() -> Result<Box<dyn Consumer>, BoxError> + Send + Sync,
{
    fn build(&self) -> Result<Box<dyn Consumer>, BoxError> {
        self()
    }
}
