// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Background task spawning with cooperative cancellation.

use crate::CancellationToken;
use std::future::Future;
use tokio::task::JoinHandle;

/// Handle to a spawned background task that is cancelled when dropped.
///
/// The spawned future receives a [`CancellationToken`] it is expected to watch.
/// Cancelling the handle (explicitly or by dropping it) signals the token; the
/// future stops at its next cancellation checkpoint.
///
/// # Example
///
/// ```rust
/// use cascade_core::CascadeTask;
///
/// # #[tokio::main]
/// # async fn main() {
/// let task = CascadeTask::spawn(|cancel| async move {
///     cancel.cancelled().await;
/// });
///
/// // Task cancels on drop
/// drop(task);
/// # }
/// ```
#[derive(Debug)]
pub struct CascadeTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CascadeTask {
    /// Spawn `f` on the current tokio runtime with a fresh cancellation token.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_token(CancellationToken::new(), f)
    }

    /// Spawn `f` with a caller-provided token, so several tasks can share one
    /// cancellation signal.
    pub fn spawn_with_token<F, Fut>(cancel: CancellationToken, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(f(cancel.clone()));
        Self { cancel, handle }
    }

    /// Signal the task to stop. Does not wait for it to finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `true` once the spawned future has run to completion.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// The token handed to the spawned future.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for CascadeTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
