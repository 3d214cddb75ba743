use crate::Settings;

/// Default number of routes per worker group.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// Static dispatcher settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Routes per worker group. See [`concurrency_level`](crate::concurrency_level).
    pub max_concurrency: usize,
}

impl DispatcherConfig {
    pub const fn new(max_concurrency: usize) -> Self {
        Self { max_concurrency }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl Settings for DispatcherConfig {
    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}
