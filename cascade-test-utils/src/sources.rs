// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Timed sources for ordering and cancellation scenarios.

use cascade_core::{CascadeError, StreamItem};
use cascade_merge::Source;
use futures::{stream, Stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A stream that waits `delay` before yielding each scheduled item.
pub fn delayed_stream<T: Send + 'static>(
    schedule: Vec<(Duration, StreamItem<T>)>,
) -> impl Stream<Item = StreamItem<T>> + Send {
    stream::iter(schedule).then(|(delay, item)| async move {
        sleep(delay).await;
        item
    })
}

/// A pull source that waits `delay_ms` before each of `values`.
pub fn delayed_values<T: Send + 'static>(values: Vec<T>, delay_ms: u64) -> Source<T> {
    let delay = Duration::from_millis(delay_ms);
    Source::pull(delayed_stream(
        values
            .into_iter()
            .map(|value| (delay, StreamItem::Value(value)))
            .collect(),
    ))
}

/// A pull source that yields `values` with `delay_ms` between them, then fails
/// with `error` after one more delay.
pub fn failing_source<T: Send + 'static>(
    values: Vec<T>,
    delay_ms: u64,
    error: CascadeError,
) -> Source<T> {
    let delay = Duration::from_millis(delay_ms);
    let mut schedule: Vec<_> = values
        .into_iter()
        .map(|value| (delay, StreamItem::Value(value)))
        .collect();
    schedule.push((delay, StreamItem::Error(error)));
    Source::pull(delayed_stream(schedule))
}

/// A push source whose producer pushes `values` with `delay_ms` before each, then
/// stops.
pub fn delayed_push_source<T: Send + 'static>(values: Vec<T>, delay_ms: u64) -> Source<T> {
    Source::push_async(move |handle| async move {
        for value in values {
            sleep(Duration::from_millis(delay_ms)).await;
            handle.push(value);
        }
        handle.stop();
    })
}

/// A push source that pushes `values` with `delay_ms` before each, then fails with
/// `error` after one more delay.
pub fn failing_push_source<T: Send + 'static>(
    values: Vec<T>,
    delay_ms: u64,
    error: CascadeError,
) -> Source<T> {
    Source::push_async(move |handle| async move {
        for value in values {
            sleep(Duration::from_millis(delay_ms)).await;
            handle.push(value);
        }
        sleep(Duration::from_millis(delay_ms)).await;
        handle.fail(error);
    })
}

/// Wraps `stream` so every item pulled from it increments `counter`.
///
/// Lets a test observe how far a source was drained before the consumer reads it.
pub fn counted<S>(stream: S, counter: Arc<AtomicUsize>) -> impl Stream<Item = S::Item> + Send
where
    S: Stream + Send,
{
    stream.inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}
