// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::priority_merge::{MergePolicy, PriorityMerge};
use crate::source::{PushHandle, Source};
use cascade_core::{Result, StreamItem};
use futures::Stream;

/// Collects sources and settings for a [`PriorityMerge`].
///
/// Sources are added in priority order: the first one added is forwarded first.
///
/// ```
/// use cascade_merge::{MergePolicy, PriorityMerge};
/// use futures::stream;
///
/// # #[tokio::main]
/// # async fn main() -> cascade_core::Result<()> {
/// let merge = PriorityMerge::<u32>::builder()
///     .label("snapshot+updates")
///     .policy(MergePolicy::ShortCircuit)
///     .values(stream::iter(vec![1, 2]))
///     .push(|handle| {
///         handle.push(3);
///         handle.stop();
///     })
///     .build()?;
///
/// assert_eq!(merge.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MergeBuilder<T> {
    sources: Vec<Source<T>>,
    policy: Option<MergePolicy>,
    label: Option<String>,
}

impl<T: Send + 'static> MergeBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            sources: Vec::new(),
            policy: None,
            label: None,
        }
    }

    /// Overrides the policy otherwise derived from the source shapes.
    #[must_use]
    pub fn policy(mut self, policy: MergePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Name used in log messages for this session.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Appends a source with the next lower priority.
    #[must_use]
    pub fn source(mut self, source: Source<T>) -> Self {
        self.sources.push(source);
        self
    }

    /// Appends several sources, in order.
    #[must_use]
    pub fn sources(mut self, sources: impl IntoIterator<Item = Source<T>>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Appends a pull source over a stream of [`StreamItem`]s.
    #[must_use]
    pub fn pull<S>(self, stream: S) -> Self
    where
        S: Stream<Item = StreamItem<T>> + Send + 'static,
    {
        self.source(Source::pull(stream))
    }

    /// Appends a pull source over a stream of plain values.
    #[must_use]
    pub fn values<S>(self, stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        self.source(Source::values(stream))
    }

    /// Appends a push source driven by a callback.
    #[must_use]
    pub fn push<F>(self, producer: F) -> Self
    where
        F: FnOnce(PushHandle<T>) + Send + 'static,
    {
        self.source(Source::push(producer))
    }

    /// Starts the merge.
    ///
    /// # Errors
    ///
    /// Returns [`cascade_core::CascadeError::EmptySourceList`] if no source was added.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn build(self) -> Result<PriorityMerge<T>> {
        let policy = self
            .policy
            .unwrap_or_else(|| MergePolicy::for_sources(&self.sources));
        let label = self.label.unwrap_or_else(|| "priority_merge".to_string());
        PriorityMerge::start(self.sources, policy, label)
    }
}
