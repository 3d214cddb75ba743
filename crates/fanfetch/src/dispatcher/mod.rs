//! Fan-out/fan-in dispatcher over worker groups.
//!
//! [`Dispatcher`] turns the registry's route snapshot into a bounded number of
//! [`WorkerGroup`]s, starts the same fetch method on all of them, and waits for
//! every [`PendingResult`](crate::PendingResult) with first-failure
//! short-circuiting.
//!
//! ## Failure policy
//!
//! Any error on the dispatch path, whether it comes from the registry, the
//! configuration, partitioning or a worker group, is fatal to the whole fetch
//! operation:
//!
//! 1. the application is stopped through the [`AppController`],
//! 2. the error is reported to the [`Monitor`] under [`Dispatcher::IDENTITY`],
//! 3. the original error is returned to the caller.
//!
//! Every constructed group is terminated before the call returns, whatever the
//! outcome.

mod builder;


pub use builder::DispatcherBuilder;

use crate::{
    AppController, ConsumerFactory, Error, FetchMode, MessageHandler, Monitor, Result,
    RoutePartition, RouteRegistry, Settings, SourceConnector, WorkerGroup, concurrency_level,
    partition_routes,
};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Slices routes into worker groups and drives them to completion.
pub struct Dispatcher {
    registry: Arc<dyn RouteRegistry>,
    settings: Arc<dyn Settings>,
    connector: Arc<dyn SourceConnector>,
    consumers: Arc<dyn ConsumerFactory>,
    controller: Arc<dyn AppController>,
    monitor: Arc<dyn Monitor>,
}

impl Dispatcher {
    /// Component identity reported to the [`Monitor`].
    pub const IDENTITY: &'static str = "fanfetch::Dispatcher";

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn controller(&self) -> &Arc<dyn AppController> {
        &self.controller
    }

    /// Runs exactly one fetch-and-consume pass on every worker group.
    ///
    /// # Errors
    ///
    /// Returns the first error observed. The application is stopped and the
    /// error reported before it is returned. [`Error::ApplicationStopped`] from
    /// a call made after the application stopped skips both steps.
    pub async fn run_once(&self) -> Result<()> {
        self.dispatch(FetchMode::Once).await
    }

    /// Runs the continuous fetch loop on every worker group.
    ///
    /// Returns `Ok(())` once the controller's shutdown token is cancelled or
    /// every source has reached end-of-stream.
    ///
    /// # Errors
    ///
    /// Returns the first error observed, after stopping the application and
    /// reporting the error. [`Error::ApplicationStopped`] from a call made
    /// after the application stopped skips both steps.
    pub async fn run_forever(&self) -> Result<()> {
        self.dispatch(FetchMode::Forever).await
    }

    /// Number of worker groups for `route_count` routes under the configured
    /// ceiling. See [`concurrency_level`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the ceiling is zero.
    pub fn compute_concurrency_level(&self, route_count: usize) -> Result<usize> {
        concurrency_level(route_count, self.settings.max_concurrency())
    }

    /// Builds the handler shared by every group of one dispatch call.
    pub fn message_handler(&self) -> MessageHandler {
        MessageHandler::new(Arc::clone(&self.consumers))
    }

    /// Creates one [`WorkerGroup`] per partition, all sharing a single
    /// [`MessageHandler`]. Each group runs under its own child of `token`.
    pub fn build_worker_groups(
        &self,
        partitions: Vec<RoutePartition>,
        token: &CancellationToken,
    ) -> Vec<WorkerGroup> {
        let handler = self.message_handler();
        partitions
            .into_iter()
            .map(|partition| {
                WorkerGroup::new(
                    partition,
                    Arc::clone(&self.connector),
                    handler.clone(),
                    token.child_token(),
                )
            })
            .collect()
    }

    /// Shared routine behind [`run_once`](Self::run_once) and
    /// [`run_forever`](Self::run_forever).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ApplicationStopped`] without side effects if the
    /// application was already stopped. Any other error is returned after the
    /// stop and notify sequence.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub async fn dispatch(&self, mode: FetchMode) -> Result<()> {
        if self.controller.is_stopped() {
            return Err(Error::ApplicationStopped);
        }

        match self.consume_with(mode).await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Dispatch finished");
                Ok(())
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Dispatch failed, stopping application: {err}");
                self.controller.stop();
                self.monitor.notice_error(Self::IDENTITY, &err);
                Err(err)
            }
        }
    }

    async fn consume_with(&self, mode: FetchMode) -> Result<()> {
        let token = self.controller.shutdown_token().child_token();
        // Dropping the groups (including when this future is dropped) aborts
        // their tasks.
        let mut groups = self.worker_groups(&token)?;

        let pending: Vec<_> = groups.iter_mut().map(|group| group.run(mode)).collect();
        let outcome = try_join_all(pending).await.map(|_| ());

        for group in &mut groups {
            group.terminate();
        }
        token.cancel();

        outcome
    }

    fn worker_groups(&self, token: &CancellationToken) -> Result<Vec<WorkerGroup>> {
        let routes = self.registry.all_routes().map_err(Error::Registry)?;
        let total = routes.len();
        let level = self.compute_concurrency_level(total)?;
        let partitions = partition_routes(routes, level)?;

        #[cfg(feature = "tracing")]
        tracing::info!("Dispatching {total} routes across {level} worker groups");

        let groups = self.build_worker_groups(partitions, token);
        debug_assert_eq!(groups.len(), level);
        Ok(groups)
    }
}
