use crate::{Error, Result};
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::task::{JoinError, JoinHandle};

/// Handle to one worker group's in-flight fetch.
///
/// Resolves to the group's result. Panics and aborts of the underlying task
/// are mapped to [`Error::WorkerPanicked`] and [`Error::WorkerAborted`] so
/// every failure surfaces through the same `Result`.
#[derive(Debug)]
pub struct PendingResult {
    group: usize,
    state: State,
}

#[derive(Debug)]
enum State {
    Running(JoinHandle<Result<()>>),
    Ready(Option<Result<()>>),
}

impl PendingResult {
    pub(crate) fn running(group: usize, handle: JoinHandle<Result<()>>) -> Self {
        Self {
            group,
            state: State::Running(handle),
        }
    }

    pub(crate) fn ready(group: usize, result: Result<()>) -> Self {
        Self {
            group,
            state: State::Ready(Some(result)),
        }
    }

    /// Index of the worker group this result belongs to.
    pub const fn group(&self) -> usize {
        self.group
    }

    /// Returns `true` once the result can be taken without waiting.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Running(handle) => handle.is_finished(),
            State::Ready(result) => result.is_some(),
        }
    }
}

impl Future for PendingResult {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Running(handle) => match Pin::new(handle).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(err)) => Poll::Ready(Err(join_failure(this.group, err))),
            },
            State::Ready(result) => Poll::Ready(
                result
                    .take()
                    .unwrap_or(Err(Error::WorkerAborted { group: this.group })),
            ),
        }
    }
}

fn join_failure(group: usize, err: JoinError) -> Error {
    if !err.is_panic() {
        return Error::WorkerAborted { group };
    }

    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    Error::WorkerPanicked { group, message }
}
