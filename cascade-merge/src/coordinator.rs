// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single terminal outcome of a merge session and the teardown it triggers.
//!
//! The first `report_error` or `report_consumer_cancel` wins; it moves the session from
//! [`Phase::Active`] through [`Phase::Terminating`] (cancellation is dispatched to every
//! source that has not finished) to [`Phase::Terminated`]. Later reports are no-ops.

use crate::panic::panic_message;
use cascade_core::{debug, error, warn, CancellationToken, CancelledOwned, CascadeError, Result};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Something the coordinator can stop.
pub trait Cancellable: Send + Sync {
    /// Priority position of the source.
    fn index(&self) -> usize;

    /// Requests the source to stop producing.
    ///
    /// # Errors
    ///
    /// Returns an error when the source's own cancellation primitive failed. The
    /// coordinator logs it and moves on.
    fn cancel(&self) -> Result<()>;
}

/// Lifecycle of a merge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No terminal outcome yet
    Active,
    /// Outcome recorded, cancellation being dispatched
    Terminating,
    /// Cancellation dispatched to every source, or all sources completed
    Terminated,
}

struct CoordinatorState {
    phase: Phase,
    winning_error: Option<CascadeError>,
    consumer_cancelled: bool,
    done: BTreeSet<usize>,
    sources: Vec<Arc<dyn Cancellable>>,
}

struct Shared {
    label: String,
    state: Mutex<CoordinatorState>,
    terminated: CancellationToken,
}

/// Shared terminal state of one merge session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct CancellationCoordinator {
    shared: Arc<Shared>,
}

impl CancellationCoordinator {
    /// Creates a coordinator in the [`Phase::Active`] phase. `label` only appears in
    /// log messages.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                label: label.into(),
                state: Mutex::new(CoordinatorState {
                    phase: Phase::Active,
                    winning_error: None,
                    consumer_cancelled: false,
                    done: BTreeSet::new(),
                    sources: Vec::new(),
                }),
                terminated: CancellationToken::new(),
            }),
        }
    }

    /// Adds a source to the set cancelled on termination.
    ///
    /// A source registered after termination is cancelled right away.
    pub fn register(&self, source: Arc<dyn Cancellable>) {
        let late = {
            let mut state = self.shared.state.lock();
            if state.phase == Phase::Active {
                state.sources.push(source);
                None
            } else {
                Some(source)
            }
        };

        if let Some(source) = late {
            cancel_quietly(&self.shared.label, source.as_ref());
        }
    }

    /// Records `error` as the session outcome unless an outcome already exists.
    ///
    /// Returns `true` for the call that won; it cancels every unfinished source.
    pub fn report_error(&self, index: usize, error: CascadeError) -> bool {
        let won = self.terminate(|state| state.winning_error = Some(error));
        if won {
            debug!(
                "merge '{}': source {} reported the winning error",
                self.shared.label, index
            );
        } else {
            debug!(
                "merge '{}': error from source {} ignored, session already terminated",
                self.shared.label, index
            );
        }
        won
    }

    /// Records a consumer-initiated stop unless an outcome already exists.
    ///
    /// Returns `true` for the call that won; it cancels every unfinished source.
    pub fn report_consumer_cancel(&self) -> bool {
        let won = self.terminate(|state| state.consumer_cancelled = true);
        if won {
            debug!("merge '{}': cancelled by consumer", self.shared.label);
        }
        won
    }

    /// Records that the source at `index` reached its terminal state.
    pub fn report_done(&self, index: usize) {
        let mut state = self.shared.state.lock();
        if !state.done.insert(index) {
            warn!(
                "merge '{}': source {} reported done twice",
                self.shared.label, index
            );
        }
    }

    /// Marks a session whose every source completed as terminated, without an outcome.
    pub fn report_completed(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.phase != Phase::Active {
                return;
            }
            state.phase = Phase::Terminated;
            state.sources.clear();
        }
        debug!("merge '{}': completed", self.shared.label);
        self.shared.terminated.cancel();
    }

    fn terminate(&self, record: impl FnOnce(&mut CoordinatorState)) -> bool {
        let targets = {
            let mut state = self.shared.state.lock();
            if state.phase != Phase::Active {
                return false;
            }
            record(&mut *state);
            state.phase = Phase::Terminating;
            let done = std::mem::take(&mut state.done);
            let targets: Vec<_> = std::mem::take(&mut state.sources)
                .into_iter()
                .filter(|source| !done.contains(&source.index()))
                .collect();
            state.done = done;
            targets
        };

        // Outside the lock: cancel hooks may call back into the session
        for source in &targets {
            cancel_quietly(&self.shared.label, source.as_ref());
        }

        self.shared.state.lock().phase = Phase::Terminated;
        self.shared.terminated.cancel();
        true
    }

    /// Returns `true` once an outcome was recorded or the session completed.
    pub fn is_terminated(&self) -> bool {
        self.phase() != Phase::Active
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    /// The winning error, if the session ended with one.
    pub fn winning_error(&self) -> Option<CascadeError> {
        self.shared.state.lock().winning_error.clone()
    }

    /// The recorded outcome: the winning error, [`CascadeError::Cancelled`] after a
    /// consumer stop, or `None` while active or after a normal completion.
    pub fn outcome(&self) -> Option<CascadeError> {
        let state = self.shared.state.lock();
        match &state.winning_error {
            Some(error) => Some(error.clone()),
            None if state.consumer_cancelled => Some(CascadeError::Cancelled),
            None => None,
        }
    }

    /// Returns `true` if the source at `index` reported its terminal state.
    pub fn is_done(&self, index: usize) -> bool {
        self.shared.state.lock().done.contains(&index)
    }

    /// Number of sources that reported their terminal state.
    pub fn done_count(&self) -> usize {
        self.shared.state.lock().done.len()
    }

    /// Resolves once the session left [`Phase::Active`].
    pub fn terminated(&self) -> CancelledOwned {
        self.shared.terminated.clone().cancelled_owned()
    }

    /// Label used in log messages.
    pub fn label(&self) -> &str {
        &self.shared.label
    }
}

impl fmt::Debug for CancellationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("CancellationCoordinator")
            .field("label", &self.shared.label)
            .field("phase", &state.phase)
            .field("winning_error", &state.winning_error)
            .field("consumer_cancelled", &state.consumer_cancelled)
            .field("done", &state.done)
            .finish_non_exhaustive()
    }
}

/// Cancels `source`, logging and swallowing any error or panic it raises.
pub(crate) fn cancel_quietly(label: &str, source: &dyn Cancellable) {
    match catch_unwind(AssertUnwindSafe(|| source.cancel())) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => warn!(
            "merge '{}': cancelling source {} failed: {}",
            label,
            source.index(),
            error
        ),
        Err(payload) => error!(
            "merge '{}': cancelling source {} panicked: {}",
            label,
            source.index(),
            panic_message(payload.as_ref())
        ),
    }
}
