use super::Dispatcher;
use crate::{
    AppController, AppState, ConsumerFactory, DispatcherConfig, Error, Monitor, Result,
    RouteRegistry, Settings, SourceConnector, TracingMonitor,
};
use std::sync::Arc;

/// Assembles a [`Dispatcher`] from its collaborators.
///
/// The registry, connector and consumer factory are required. Settings default
/// to [`DispatcherConfig::default`], the controller to a fresh [`AppState`]
/// and the monitor to [`TracingMonitor`].
#[derive(Default)]
pub struct DispatcherBuilder {
    registry: Option<Arc<dyn RouteRegistry>>,
    settings: Option<Arc<dyn Settings>>,
    connector: Option<Arc<dyn SourceConnector>>,
    consumers: Option<Arc<dyn ConsumerFactory>>,
    controller: Option<Arc<dyn AppController>>,
    monitor: Option<Arc<dyn Monitor>>,
}

impl DispatcherBuilder {
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn RouteRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Arc<dyn Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn SourceConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub fn consumers(mut self, consumers: Arc<dyn ConsumerFactory>) -> Self {
        self.consumers = Some(consumers);
        self
    }

    #[must_use]
    pub fn controller(mut self, controller: Arc<dyn AppController>) -> Self {
        self.controller = Some(controller);
        self
    }

    #[must_use]
    pub fn monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first missing required
    /// collaborator.
    pub fn build(self) -> Result<Dispatcher> {
        Ok(Dispatcher {
            registry: self
                .registry
                .ok_or_else(|| Error::configuration("missing route registry"))?,
            connector: self
                .connector
                .ok_or_else(|| Error::configuration("missing source connector"))?,
            consumers: self
                .consumers
                .ok_or_else(|| Error::configuration("missing consumer factory"))?,
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(DispatcherConfig::default())),
            controller: self
                .controller
                .unwrap_or_else(|| Arc::new(AppState::new())),
            monitor: self.monitor.unwrap_or_else(|| Arc::new(TracingMonitor)),
        })
    }
}
