// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::builder::MergeBuilder;
use crate::coordinator::CancellationCoordinator;
use crate::eager_source::EagerSource;
use crate::source::{PushHandle, Source};
use cascade_core::{debug, CancelledOwned, CascadeError, Result, StreamItem};
use event_listener::EventListener;
use futures::Stream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// When a source's error reaches the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Errors wait for their source's turn; earlier sources are drained first.
    /// The natural policy for pull sources.
    #[default]
    Deferred,
    /// The first error from any source cancels the session and is delivered next.
    /// Required when push channels take part.
    ShortCircuit,
}

impl MergePolicy {
    /// `ShortCircuit` if any source is push-shaped, `Deferred` otherwise.
    pub fn for_sources<T>(sources: &[Source<T>]) -> Self {
        if sources.iter().any(Source::is_push) {
            Self::ShortCircuit
        } else {
            Self::Deferred
        }
    }
}

/// Concatenates several concurrently running sources in priority order.
///
/// Every source starts draining into its own queue as soon as the merge is built.
/// The merged stream yields all of source 0's values, then all of source 1's, and so
/// on, however the sources interleave in time. It ends with:
///
/// - `None` after the last source completed,
/// - a single `StreamItem::Error` followed by `None` when a source failed, or
/// - `None` after a [`CancelHandle::cancel`].
///
/// Dropping the merge before it finished cancels every source that is still running.
///
/// # Example
///
/// ```
/// use cascade_merge::{PriorityMerge, Source};
/// use cascade_core::StreamItem;
/// use futures::{stream, StreamExt};
///
/// # #[tokio::main]
/// # async fn main() {
/// let merge = PriorityMerge::new(vec![
///     Source::values(stream::iter(vec![1, 2])),
///     Source::values(stream::iter(vec![3])),
/// ])
/// .unwrap();
///
/// let items: Vec<_> = merge.collect().await;
/// assert_eq!(
///     items,
///     vec![StreamItem::Value(1), StreamItem::Value(2), StreamItem::Value(3)]
/// );
/// # }
/// ```
pub struct PriorityMerge<T> {
    sources: Vec<EagerSource<T>>,
    current: usize,
    listener: Option<EventListener>,
    coordinator: CancellationCoordinator,
    terminated: CancelledOwned,
    policy: MergePolicy,
    finished: bool,
}

impl<T: Send + 'static> PriorityMerge<T> {
    /// Starts a merge over `sources`, picking the policy with
    /// [`MergePolicy::for_sources`].
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::EmptySourceList`] if `sources` is empty.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn new(sources: Vec<Source<T>>) -> Result<Self> {
        let policy = MergePolicy::for_sources(&sources);
        Self::with_policy(sources, policy)
    }

    /// Starts a merge over `sources` with an explicit policy.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::EmptySourceList`] if `sources` is empty.
    pub fn with_policy(sources: Vec<Source<T>>, policy: MergePolicy) -> Result<Self> {
        Self::start(sources, policy, "priority_merge".to_string())
    }

    /// Starts a [`MergePolicy::Deferred`] merge over pull streams.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::EmptySourceList`] if `streams` is empty.
    pub fn from_streams<S>(streams: Vec<S>) -> Result<Self>
    where
        S: Stream<Item = StreamItem<T>> + Send + 'static,
    {
        Self::with_policy(
            streams.into_iter().map(Source::pull).collect(),
            MergePolicy::Deferred,
        )
    }

    /// Starts a [`MergePolicy::ShortCircuit`] merge over push producers.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::EmptySourceList`] if `producers` is empty.
    pub fn from_channels<F>(producers: Vec<F>) -> Result<Self>
    where
        F: FnOnce(PushHandle<T>) + Send + 'static,
    {
        Self::with_policy(
            producers.into_iter().map(Source::push).collect(),
            MergePolicy::ShortCircuit,
        )
    }

    /// A builder for merges that need a label or an explicit policy.
    pub fn builder() -> MergeBuilder<T> {
        MergeBuilder::new()
    }

    pub(crate) fn start(sources: Vec<Source<T>>, policy: MergePolicy, label: String) -> Result<Self> {
        if sources.is_empty() {
            return Err(CascadeError::EmptySourceList);
        }

        let coordinator = CancellationCoordinator::new(label);
        debug!(
            "merge '{}': starting {} sources with {:?} policy",
            coordinator.label(),
            sources.len(),
            policy
        );

        let sources = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| EagerSource::spawn(index, source, &coordinator, policy))
            .collect();

        Ok(Self {
            sources,
            current: 0,
            listener: None,
            terminated: coordinator.terminated(),
            coordinator,
            policy,
            finished: false,
        })
    }
}

impl<T> PriorityMerge<T> {
    /// A handle that stops this merge from elsewhere, e.g. when a deadline expires.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            coordinator: self.coordinator.clone(),
        }
    }

    /// The error policy in effect.
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Always `false`: a merge cannot be built without sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Index of the source currently being forwarded.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The sources, in priority order.
    pub fn sources(&self) -> &[EagerSource<T>] {
        &self.sources
    }

    /// Returns `true` once the merged stream has ended.
    pub fn is_terminated(&self) -> bool {
        self.finished
    }

    /// The session's coordinator.
    pub fn coordinator(&self) -> &CancellationCoordinator {
        &self.coordinator
    }
}

impl<T> Stream for PriorityMerge<T> {
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = Pin::into_inner(self);
        if this.finished {
            return Poll::Ready(None);
        }

        // Registers for wake-up on termination; the outcome itself is read below
        let _ = Pin::new(&mut this.terminated).poll(cx);

        loop {
            // A consumer stop discards whatever is still buffered
            if let Some(CascadeError::Cancelled) = this.coordinator.outcome() {
                this.finished = true;
                return Poll::Ready(None);
            }

            let source = &this.sources[this.current];
            match source.queue().poll_next_item(&mut this.listener, cx) {
                Poll::Ready(Ok(Some(value))) => return Poll::Ready(Some(StreamItem::Value(value))),
                Poll::Ready(Ok(None)) => {
                    this.current += 1;
                    this.listener = None;
                    if this.current == this.sources.len() {
                        this.finished = true;
                        this.coordinator.report_completed();
                        return Poll::Ready(None);
                    }
                    // A later source's short-circuit error takes over from the next source
                    if let Some(error) = this.take_winning_error() {
                        return Poll::Ready(Some(StreamItem::Error(error)));
                    }
                }
                Poll::Ready(Err(error)) => {
                    this.coordinator.report_error(this.current, error.clone());
                    this.finished = true;
                    let error = this.coordinator.winning_error().unwrap_or(error);
                    return Poll::Ready(Some(StreamItem::Error(error)));
                }
                Poll::Pending => {
                    // Values already queued by the current source go first
                    return match this.take_winning_error() {
                        Some(error) => Poll::Ready(Some(StreamItem::Error(error))),
                        None => Poll::Pending,
                    };
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let buffered = self.sources[self.current..]
            .iter()
            .map(|source| source.queue().len())
            .sum();
        (buffered, None)
    }
}

impl<T> PriorityMerge<T> {
    fn take_winning_error(&mut self) -> Option<CascadeError> {
        let error = self.coordinator.winning_error()?;
        self.finished = true;
        self.listener = None;
        Some(error)
    }
}

impl<T> Drop for PriorityMerge<T> {
    fn drop(&mut self) {
        if !self.finished {
            self.coordinator.report_consumer_cancel();
        }
    }
}

impl<T> fmt::Debug for PriorityMerge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityMerge")
            .field("sources", &self.sources)
            .field("current", &self.current)
            .field("policy", &self.policy)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Stops a [`PriorityMerge`] from outside its consumer.
///
/// Cancelling records a consumer stop (unless the session already ended), cancels
/// every running source and makes the merged stream end with `None`.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    coordinator: CancellationCoordinator,
}

impl CancelHandle {
    /// Returns `true` if this call ended the session.
    pub fn cancel(&self) -> bool {
        self.coordinator.report_consumer_cancel()
    }

    /// Returns `true` once the session ended, for any reason.
    pub fn is_terminated(&self) -> bool {
        self.coordinator.is_terminated()
    }
}

/// Extension trait for merging a vector of sources in priority order.
pub trait PriorityMergeExt {
    type Item;

    /// Merges the sources, element 0 having the highest priority.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::EmptySourceList`] for an empty vector.
    fn priority_merge(self) -> Result<PriorityMerge<Self::Item>>;
}

impl<T: Send + 'static> PriorityMergeExt for Vec<Source<T>> {
    type Item = T;

    fn priority_merge(self) -> Result<PriorityMerge<Self::Item>> {
        PriorityMerge::new(self)
    }
}
