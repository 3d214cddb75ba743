use crate::{BoxError, Route, RouteRegistry};
use parking_lot::RwLock;

/// A [`RouteRegistry`] over an in-memory route list.
///
/// The list can be swapped between dispatch calls with
/// [`replace`](Self::replace); each dispatch reads a consistent snapshot.
#[derive(Debug, Default)]
pub struct StaticRoutes {
    routes: RwLock<Vec<Route>>,
}

impl StaticRoutes {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: RwLock::new(routes),
        }
    }

    /// Builds one default route per topic.
    pub fn from_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            topics
                .into_iter()
                .map(|topic| Route::new(topic.as_ref()))
                .collect(),
        )
    }

    /// Replaces the route list, returning the previous one.
    pub fn replace(&self, routes: Vec<Route>) -> Vec<Route> {
        core::mem::replace(&mut *self.routes.write(), routes)
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

impl RouteRegistry for StaticRoutes {
    fn all_routes(&self) -> Result<Vec<Route>, BoxError> {
        Ok(self.routes.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_and_replaces() {
        let registry = StaticRoutes::from_topics(["a", "b"]);
        assert_eq!(registry.len(), 2);

        let snapshot = registry.all_routes().unwrap();
        let previous = registry.replace(vec![Route::new("c")]);

        assert_eq!(snapshot, previous);
        assert_eq!(registry.all_routes().unwrap(), [Route::new("c")]);
    }
}
