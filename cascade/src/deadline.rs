// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Deadline composition for merged streams.

use cascade_core::{CascadeError, StreamItem};
use cascade_merge::{CancelHandle, PriorityMerge};
use futures::Stream;
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{sleep_until, Instant, Sleep};

/// Bounds the total running time of a merge.
pub trait DeadlineExt<T> {
    /// Ends the merge with a `CascadeError::Timeout` if it has not finished within
    /// `duration`.
    ///
    /// On expiry every running source is cancelled, exactly as if the consumer had
    /// stopped. Items delivered before the deadline are unaffected.
    ///
    /// ```rust
    /// use cascade::prelude::*;
    /// use futures::{stream, StreamExt};
    /// use std::time::Duration;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> cascade::Result<()> {
    /// let merge = vec![
    ///     Source::values(stream::iter(vec![1])),
    ///     Source::values(stream::pending::<u32>()),
    /// ]
    /// .priority_merge()?;
    ///
    /// let mut bounded = merge.with_deadline(Duration::from_millis(20));
    /// assert_eq!(bounded.next().await, Some(StreamItem::Value(1)));
    /// assert!(bounded.next().await.unwrap().is_error());
    /// assert!(bounded.next().await.is_none());
    /// # Ok(())
    /// # }
    /// ```
    fn with_deadline(self, duration: Duration) -> DeadlineStream<T>;
}

impl<T> DeadlineExt<T> for PriorityMerge<T> {
    fn with_deadline(self, duration: Duration) -> DeadlineStream<T> {
        DeadlineStream {
            handle: self.cancel_handle(),
            inner: self,
            duration,
            sleep: Box::pin(sleep_until(Instant::now() + duration)),
            is_done: false,
        }
    }
}

/// Stream returned by [`DeadlineExt::with_deadline`].
#[pin_project]
pub struct DeadlineStream<T> {
    #[pin]
    inner: PriorityMerge<T>,
    handle: CancelHandle,
    duration: Duration,
    sleep: Pin<Box<Sleep>>,
    is_done: bool,
}

impl<T> DeadlineStream<T> {
    /// The instant at which the merge is cut off.
    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }
}

impl<T> Stream for DeadlineStream<T> {
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.is_done {
            return Poll::Ready(None);
        }

        // The timer goes first so a buffered backlog cannot outlive the deadline
        if this.sleep.as_mut().poll(cx).is_ready() {
            *this.is_done = true;
            this.handle.cancel();
            return Poll::Ready(Some(StreamItem::Error(CascadeError::timeout_error(
                format!("merge did not finish within {:?}", this.duration),
            ))));
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(item)) => {
                *this.is_done = item.is_error();
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                *this.is_done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
