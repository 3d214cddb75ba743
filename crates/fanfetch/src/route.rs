//! Routes and route partitioning.
//!
//! A [`Route`] describes one subscribed topic together with the consumer group
//! and handler that process it. The dispatcher never mutates routes; it takes a
//! snapshot from the registry on every dispatch call and slices it into
//! [`RoutePartition`]s with [`partition_routes`].

use crate::{Error, Result};
use core::{fmt, ops::Deref};
use std::sync::Arc;

/// Consumer group assigned to routes that do not name one.
pub const DEFAULT_GROUP: &str = "fanfetch";

/// A subscribed topic plus its processing configuration.
///
/// Cloning is cheap: all fields are reference counted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    topic: Arc<str>,
    #[cfg_attr(feature = "serde", serde(default = "default_group"))]
    group: Arc<str>,
    #[cfg_attr(feature = "serde", serde(default))]
    handler: Option<Arc<str>>,
}

#[cfg(feature = "serde")]
fn default_group() -> Arc<str> {
    Arc::from(DEFAULT_GROUP)
}

impl Route {
    /// Creates a route for `topic` in the [`DEFAULT_GROUP`], handled by a
    /// handler named after the topic.
    pub fn new(topic: impl Into<Arc<str>>) -> Self {
        Self {
            topic: topic.into(),
            group: Arc::from(DEFAULT_GROUP),
            handler: None,
        }
    }

    /// Sets the consumer group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<Arc<str>>) -> Self {
        self.group = group.into();
        self
    }

    /// Sets the handler name.
    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<Arc<str>>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// The handler name, falling back to the topic.
    pub fn handler(&self) -> &str {
        self.handler.as_deref().unwrap_or(&self.topic)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.topic)
    }
}

/// A contiguous, ordered slice of the route set owned by one worker group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePartition {
    index: usize,
    routes: Vec<Route>,
}

impl RoutePartition {
    /// Zero-based position of this partition within its dispatch call.
    pub const fn index(&self) -> usize {
        self.index
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

impl Deref for RoutePartition {
    type Target = [Route];

    fn deref(&self) -> &Self::Target {
        &self.routes
    }
}

/// Splits `routes` into `level` contiguous slices whose sizes differ by at most
/// one.
///
/// The first `routes.len() % level` partitions receive one extra route, so the
/// result is deterministic for a given input order. Concatenating the
/// partitions in order reproduces `routes`. An empty route set yields `level`
/// empty partitions.
///
/// # Errors
///
/// Returns [`Error::Partition`] if `level` is zero or if the produced
/// partitions do not cover every route exactly once.
///
/// # Example
/// ```
/// use fanfetch::{Route, partition_routes};
///
/// let routes: Vec<_> = (0..5).map(|i| Route::new(format!("t{i}"))).collect();
/// let parts = partition_routes(routes, 2).unwrap();
///
/// assert_eq!(parts[0].len(), 3);
/// assert_eq!(parts[1].len(), 2);
/// assert_eq!(parts[1][0].topic(), "t3");
/// ```
pub fn partition_routes(routes: Vec<Route>, level: usize) -> Result<Vec<RoutePartition>> {
    let expected = routes.len();
    if level == 0 {
        return Err(Error::Partition {
            expected,
            actual: 0,
        });
    }

    let base = expected / level;
    let extra = expected % level;

    let mut remaining = routes.into_iter();
    let partitions: Vec<_> = (0..level)
        .map(|index| {
            let size = base + usize::from(index < extra);
            RoutePartition {
                index,
                routes: remaining.by_ref().take(size).collect(),
            }
        })
        .collect();

    let actual: usize = partitions.iter().map(|p| p.len()).sum();
    if actual != expected || remaining.next().is_some() {
        return Err(Error::Partition { expected, actual });
    }

    Ok(partitions)
}
