// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The two shapes a merge input can take.
//!
//! A [`Source`] is either *pull*-based (a `Stream` the engine polls) or *push*-based (a
//! producer the engine calls once with a [`PushHandle`]). Both are normalized into the
//! same value / error / completion events by the eager drain loop.

use crate::eager_source::SourceSink;
use cascade_core::{CancellationToken, CancelledOwned, CascadeError, Result, StreamItem};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Hook invoked at most once when a pull source is cancelled.
pub type CancelHook = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

type Callback<T> = Box<dyn FnOnce(PushHandle<T>) + Send + 'static>;
type TaskFactory<T> = Box<dyn FnOnce(PushHandle<T>) -> BoxFuture<'static, ()> + Send + 'static>;

/// One input of a priority merge.
pub enum Source<T> {
    /// A stream the engine pulls from
    Pull(PullSource<T>),
    /// A producer that pushes into the engine
    Push(PushSource<T>),
}

/// Pull-shaped source: a stream of [`StreamItem`]s and an optional cancel hook.
pub struct PullSource<T> {
    pub(crate) stream: BoxStream<'static, StreamItem<T>>,
    pub(crate) on_cancel: Option<CancelHook>,
}

/// Push-shaped source: a producer invoked once with a [`PushHandle`].
pub struct PushSource<T> {
    pub(crate) producer: Producer<T>,
}

pub(crate) enum Producer<T> {
    Callback(Callback<T>),
    Task(TaskFactory<T>),
}

impl<T: Send + 'static> Source<T> {
    /// A pull source over a stream of [`StreamItem`]s.
    ///
    /// The stream ends the source when it returns `None`; a `StreamItem::Error` ends it
    /// with that error. Dropping the stream is how the source is cancelled.
    pub fn pull<S>(stream: S) -> Self
    where
        S: Stream<Item = StreamItem<T>> + Send + 'static,
    {
        Self::Pull(PullSource {
            stream: stream.boxed(),
            on_cancel: None,
        })
    }

    /// A pull source with an explicit cancellation primitive.
    ///
    /// `on_cancel` runs at most once, when the merge cancels this source before it
    /// finished. An error or panic raised by the hook is logged and swallowed.
    pub fn pull_with_cancel<S, F>(stream: S, on_cancel: F) -> Self
    where
        S: Stream<Item = StreamItem<T>> + Send + 'static,
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self::Pull(PullSource {
            stream: stream.boxed(),
            on_cancel: Some(Box::new(on_cancel)),
        })
    }

    /// A pull source over a stream of plain values.
    pub fn values<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::pull(stream.map(StreamItem::Value))
    }

    /// A pull source over a stream of `Result`s; the first `Err` ends the source.
    pub fn try_pull<S, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::pull(stream.map(|item| item.map_err(CascadeError::user_error).into()))
    }

    /// A push source driven by a synchronous callback.
    ///
    /// The callback runs once, on the source's own task, and typically hands the
    /// [`PushHandle`] to whatever produces values (a spawned task, a listener, ...).
    /// The source completes when `stop` is called or every handle clone is dropped.
    pub fn push<F>(producer: F) -> Self
    where
        F: FnOnce(PushHandle<T>) + Send + 'static,
    {
        Self::Push(PushSource {
            producer: Producer::Callback(Box::new(producer)),
        })
    }

    /// A push source driven by an async producer.
    ///
    /// The returned future runs on the source's task and is dropped when the source
    /// is cancelled.
    pub fn push_async<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(PushHandle<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Push(PushSource {
            producer: Producer::Task(Box::new(move |handle| producer(handle).boxed())),
        })
    }
}

impl<T> Source<T> {
    /// Returns `true` for push-shaped sources.
    pub const fn is_push(&self) -> bool {
        matches!(self, Self::Push(_))
    }

    /// Returns `true` for pull-shaped sources.
    pub const fn is_pull(&self) -> bool {
        matches!(self, Self::Pull(_))
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull(pull) => f
                .debug_struct("Source::Pull")
                .field("has_cancel_hook", &pull.on_cancel.is_some())
                .finish(),
            Self::Push(push) => f
                .debug_struct("Source::Push")
                .field(
                    "producer",
                    &match push.producer {
                        Producer::Callback(_) => "callback",
                        Producer::Task(_) => "task",
                    },
                )
                .finish(),
        }
    }
}

struct PushInner<T> {
    sink: SourceSink<T>,
}

impl<T> Drop for PushInner<T> {
    fn drop(&mut self) {
        // A panicking producer is failed by its drain task instead
        if !std::thread::panicking() {
            self.sink.complete_if_open();
        }
    }
}

/// The `push` / `stop` pair handed to a push source's producer.
///
/// Cheap to clone; all clones feed the same source. Once the last clone is dropped
/// without `stop` or `fail`, the source completes.
pub struct PushHandle<T> {
    inner: Arc<PushInner<T>>,
}

impl<T> PushHandle<T> {
    pub(crate) fn new(sink: SourceSink<T>) -> Self {
        Self {
            inner: Arc::new(PushInner { sink }),
        }
    }

    /// Emits a value. Returns `false` if it was discarded because the source was
    /// cancelled or already stopped.
    pub fn push(&self, value: T) -> bool {
        self.inner.sink.push(value)
    }

    /// Completes the source.
    pub fn stop(&self) {
        self.inner.sink.complete();
    }

    /// Ends the source with `error`.
    pub fn fail(&self, error: CascadeError) {
        self.inner.sink.fail(error);
    }

    /// Completes the source, or fails it when `error` is present.
    pub fn stop_with(&self, error: Option<CascadeError>) {
        match error {
            Some(error) => self.fail(error),
            None => self.stop(),
        }
    }

    /// Priority position of the source this handle feeds.
    pub fn index(&self) -> usize {
        self.inner.sink.index()
    }

    /// Returns `true` once the source was cancelled; further pushes are discarded.
    pub fn is_cancelled(&self) -> bool {
        self.inner.sink.token().is_cancelled()
    }

    /// Resolves when the source is cancelled.
    pub fn cancelled(&self) -> CancelledOwned {
        self.token().cancelled_owned()
    }

    fn token(&self) -> CancellationToken {
        self.inner.sink.token().clone()
    }
}

impl<T> Clone for PushHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for PushHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushHandle")
            .field("index", &self.index())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
