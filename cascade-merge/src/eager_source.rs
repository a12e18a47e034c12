// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::coordinator::{cancel_quietly, Cancellable, CancellationCoordinator};
use crate::panic::panic_message;
use crate::priority_merge::MergePolicy;
use crate::source::{CancelHook, Producer, PushHandle, Source};
use cascade_core::{
    debug, warn, CancellationToken, CascadeError, CascadeTask, Result, StreamItem,
};
use cascade_queue::UnboundedQueue;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Cancellation state of one source, shared with the coordinator.
pub(crate) struct SourceControl {
    index: usize,
    token: CancellationToken,
    hook: Mutex<Option<CancelHook>>,
}

impl Cancellable for SourceControl {
    fn index(&self) -> usize {
        self.index
    }

    fn cancel(&self) -> Result<()> {
        if !self.token.cancel() {
            return Ok(());
        }
        debug!("eager_source {}: cancelled", self.index);

        let hook = self.hook.lock().take();
        hook.map_or(Ok(()), |hook| hook())
    }
}

/// Write side of a source: its queue plus the session it reports to.
pub(crate) struct SourceSink<T> {
    index: usize,
    queue: UnboundedQueue<T>,
    control: Arc<SourceControl>,
    coordinator: CancellationCoordinator,
    policy: MergePolicy,
}

impl<T> SourceSink<T> {
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.control.token
    }

    pub(crate) fn push(&self, value: T) -> bool {
        if self.control.token.is_cancelled() {
            return false;
        }
        self.queue.push(value)
    }

    pub(crate) fn complete(&self) {
        match self.queue.complete() {
            Ok(()) => {
                debug!("eager_source {}: completed", self.index);
                self.coordinator.report_done(self.index);
            }
            Err(error) => warn!("eager_source {}: {}", self.index, error),
        }
    }

    pub(crate) fn complete_if_open(&self) {
        if !self.queue.is_terminated() {
            self.complete();
        }
    }

    pub(crate) fn fail(&self, error: CascadeError) {
        if let Err(rejected) = self.queue.fail(error.clone()) {
            warn!("eager_source {}: {}", self.index, rejected);
            return;
        }
        debug!("eager_source {}: failed with {}", self.index, error);
        self.coordinator.report_done(self.index);

        if self.policy == MergePolicy::ShortCircuit && !self.control.token.is_cancelled() {
            self.coordinator.report_error(self.index, error);
        }
    }
}

impl<T> Clone for SourceSink<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            queue: self.queue.clone(),
            control: Arc::clone(&self.control),
            coordinator: self.coordinator.clone(),
            policy: self.policy,
        }
    }
}

/// One source of a merge session, drained into its own queue from the moment it is
/// created, whether or not anything reads the queue yet.
pub struct EagerSource<T> {
    index: usize,
    queue: UnboundedQueue<T>,
    control: Arc<SourceControl>,
    label: String,
    _task: CascadeTask,
}

impl<T: Send + 'static> EagerSource<T> {
    /// Starts draining `source` on a background task and registers it with
    /// `coordinator`.
    ///
    /// The drain begins on the next scheduling tick, never inside this call.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn(
        index: usize,
        source: Source<T>,
        coordinator: &CancellationCoordinator,
        policy: MergePolicy,
    ) -> Self {
        let queue = UnboundedQueue::new();
        let (producer, hook) = match source {
            Source::Pull(pull) => (Drain::Pull(pull.stream), pull.on_cancel),
            Source::Push(push) => (Drain::Push(push.producer), None),
        };
        let control = Arc::new(SourceControl {
            index,
            token: CancellationToken::new(),
            hook: Mutex::new(hook),
        });
        coordinator.register(control.clone());

        let sink = SourceSink {
            index,
            queue: queue.clone(),
            control: control.clone(),
            coordinator: coordinator.clone(),
            policy,
        };

        let task = CascadeTask::spawn_with_token(control.token.clone(), move |cancel| async move {
            debug!("eager_source {}: started", index);
            match producer {
                Drain::Pull(stream) => drain_stream(stream, sink, cancel).await,
                Drain::Push(producer) => run_producer(producer, sink, cancel).await,
            }
        });

        Self {
            index,
            queue,
            control,
            label: coordinator.label().to_string(),
            _task: task,
        }
    }
}

impl<T> EagerSource<T> {
    /// Priority position of this source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The queue this source drains into.
    pub fn queue(&self) -> &UnboundedQueue<T> {
        &self.queue
    }

    /// Stops the source: runs its cancel hook once and discards anything it produces
    /// afterwards. Failures of the hook are logged, never returned.
    pub fn cancel(&self) {
        cancel_quietly(&self.label, self.control.as_ref());
    }

    /// Returns `true` once the source was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.control.token.is_cancelled()
    }

    /// Returns `true` once the source reached its terminal state.
    pub fn is_finished(&self) -> bool {
        self.queue.is_terminated()
    }
}

impl<T> fmt::Debug for EagerSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerSource")
            .field("index", &self.index)
            .field("queue", &self.queue)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Values drained between two forced yields to the scheduler.
const YIELD_EVERY: usize = 32;

enum Drain<T> {
    Pull(BoxStream<'static, StreamItem<T>>),
    Push(Producer<T>),
}

async fn drain_stream<T>(
    mut stream: BoxStream<'static, StreamItem<T>>,
    sink: SourceSink<T>,
    cancel: CancellationToken,
) {
    let mut drained = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = AssertUnwindSafe(stream.next()).catch_unwind() => next,
        };

        match next {
            Ok(Some(StreamItem::Value(value))) => {
                sink.push(value);
                drained += 1;
                // An always-ready stream must still let the consumer and the cancel check run
                if drained % YIELD_EVERY == 0 {
                    tokio::task::yield_now().await;
                }
            }
            Ok(Some(StreamItem::Error(error))) => {
                sink.fail(error);
                return;
            }
            Ok(None) => {
                sink.complete();
                return;
            }
            Err(payload) => {
                sink.fail(CascadeError::source_panic(
                    sink.index,
                    panic_message(payload.as_ref()),
                ));
                return;
            }
        }
    }

    // Cancelled: release the stream, then unblock any reader still waiting on the queue
    drop(stream);
    sink.complete_if_open();
}

async fn run_producer<T: Send + 'static>(
    producer: Producer<T>,
    sink: SourceSink<T>,
    cancel: CancellationToken,
) {
    let handle = PushHandle::new(sink.clone());

    match producer {
        Producer::Callback(callback) => {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(move || callback(handle))) {
                sink.fail(CascadeError::source_panic(
                    sink.index,
                    panic_message(payload.as_ref()),
                ));
            }
        }
        Producer::Task(factory) => {
            let mut run = AssertUnwindSafe(factory(handle)).catch_unwind();
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                outcome = &mut run => {
                    if let Err(payload) = outcome {
                        // Fail before `run` drops the producer's handle
                        sink.fail(CascadeError::source_panic(
                            sink.index,
                            panic_message(payload.as_ref()),
                        ));
                    }
                }
            }
            drop(run);
        }
    }

    if cancel.is_cancelled() {
        sink.complete_if_open();
    }
}
