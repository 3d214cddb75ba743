use super::{FetchMode, PendingResult};
use crate::{
    Error, Fetched, MessageHandler, MessageSource, Result, Route, RoutePartition, SourceConnector,
};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// An independent execution unit owning one [`RoutePartition`].
///
/// Every call to [`fetch`](Self::fetch) or [`fetch_loop`](Self::fetch_loop)
/// spawns a Tokio task that connects one [`MessageSource`] per owned route and
/// hands each pulled message to the shared [`MessageHandler`]. The caller gets
/// a [`PendingResult`] back immediately.
///
/// Groups are bound to a single dispatch call. [`terminate`](Self::terminate)
/// cancels the group's token and aborts its task; it also runs on drop.
///
/// Spawning requires a running Tokio runtime.
pub struct WorkerGroup {
    partition: RoutePartition,
    connector: Arc<dyn SourceConnector>,
    handler: MessageHandler,
    token: CancellationToken,
    task: Option<AbortHandle>,
    terminated: bool,
}

impl WorkerGroup {
    pub fn new(
        partition: RoutePartition,
        connector: Arc<dyn SourceConnector>,
        handler: MessageHandler,
        token: CancellationToken,
    ) -> Self {
        Self {
            partition,
            connector,
            handler,
            token,
            task: None,
            terminated: false,
        }
    }

    /// Index of the partition this group owns.
    pub const fn id(&self) -> usize {
        self.partition.index()
    }

    pub fn routes(&self) -> &[Route] {
        self.partition.routes()
    }

    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Starts a single fetch-and-consume pass over every owned route.
    pub fn fetch(&mut self) -> PendingResult {
        self.run(FetchMode::Once)
    }

    /// Starts a continuous fetch loop.
    ///
    /// The loop ends with `Ok(())` when the group's token is cancelled or when
    /// every owned source reports end-of-stream. A group without routes waits
    /// for cancellation.
    pub fn fetch_loop(&mut self) -> PendingResult {
        self.run(FetchMode::Forever)
    }

    /// Starts the fetch method selected by `mode`.
    ///
    /// A terminated group does not spawn anything; its result resolves to
    /// [`Error::WorkerAborted`].
    pub fn run(&mut self, mode: FetchMode) -> PendingResult {
        let group = self.id();
        if self.terminated {
            return PendingResult::ready(group, Err(Error::WorkerAborted { group }));
        }

        let fut = run_group(
            group,
            self.partition.routes().to_vec(),
            Arc::clone(&self.connector),
            self.handler.clone(),
            self.token.clone(),
            mode,
        );
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            fut.instrument(tracing::debug_span!("worker_group", group, ?mode))
        };

        let handle = tokio::spawn(fut);
        if let Some(previous) = self.task.replace(handle.abort_handle()) {
            previous.abort();
        }

        PendingResult::running(group, handle)
    }

    /// Stops the group. Idempotent, and safe on a group that never started.
    pub fn terminate(&mut self) {
        // Abort before cancelling so an idle task is dropped rather than woken.
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.token.cancel();
        if !self.terminated {
            #[cfg(feature = "tracing")]
            tracing::trace!("Worker group {} terminated", self.id());
            self.terminated = true;
        }
    }
}

impl Drop for WorkerGroup {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// One connected route inside a running group.
struct Listener {
    route: Route,
    source: Box<dyn MessageSource>,
    exhausted: bool,
}

/// Outcome of a single pass over a group's listeners.
enum Pass {
    Consumed(usize),
    Cancelled,
}

async fn run_group(
    _group: usize,
    routes: Vec<Route>,
    connector: Arc<dyn SourceConnector>,
    handler: MessageHandler,
    token: CancellationToken,
    mode: FetchMode,
) -> Result<()> {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker group {_group} started with {} routes", routes.len());

    let mut listeners = routes
        .into_iter()
        .map(|route| -> Result<Listener> {
            let source = connector.connect(&route).map_err(|source| Error::Connect {
                topic: route.topic().to_string(),
                source,
            })?;
            Ok(Listener {
                route,
                source,
                exhausted: false,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    match mode {
        FetchMode::Once => {
            fetch_pass(&mut listeners, &handler, &token).await?;
        }
        FetchMode::Forever => {
            if listeners.is_empty() {
                token.cancelled().await;
            }

            while !listeners.iter().all(|l| l.exhausted) {
                match fetch_pass(&mut listeners, &handler, &token).await? {
                    Pass::Cancelled => break,
                    // Nothing arrived anywhere; give other groups a turn before
                    // polling again.
                    Pass::Consumed(0) => tokio::task::yield_now().await,
                    Pass::Consumed(_) => {}
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker group {_group} stopped");
    Ok(())
}

async fn fetch_pass(
    listeners: &mut [Listener],
    handler: &MessageHandler,
    token: &CancellationToken,
) -> Result<Pass> {
    let mut consumed = 0;

    for listener in listeners.iter_mut().filter(|l| !l.exhausted) {
        let fetched = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(Pass::Cancelled),
            fetched = listener.source.poll() => fetched.map_err(|source| Error::Fetch {
                topic: listener.route.topic().to_string(),
                source,
            })?,
        };

        match fetched {
            Fetched::Batch(messages) => {
                for message in messages {
                    handler.call(message)?;
                    consumed += 1;
                }
            }
            Fetched::EndOfStream => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Route {} reached end of stream", listener.route);
                listener.exhausted = true;
            }
        }
    }

    Ok(Pass::Consumed(consumed))
}
