// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Result handle for a scheduled unit of work.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;

/// Outcome delivered to a [`TaskHandle`].
pub type TaskResult<T, E> = Result<T, TaskError<E>>;

/// Future resolving once the named unit settles.
///
/// Resolves with the work's own result or with a synthesized error:
/// [`TaskError::DependencyFailed`] when the unit was skipped,
/// [`TaskError::Panicked`] when the work panicked, and
/// [`TaskError::Terminated`] when the scheduler dropped it. Dropping the
/// handle does not cancel the work.
#[derive(Debug)]
pub struct TaskHandle<T, E> {
    name: String,
    rx: oneshot::Receiver<TaskResult<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) fn new(name: String, rx: oneshot::Receiver<TaskResult<T, E>>) -> Self {
        Self { name, rx }
    }

    /// Name of the unit this handle tracks.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = TaskResult<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::Terminated(this.name.clone()))),
            Poll::Pending => Poll::Pending,
        }
    }
}
