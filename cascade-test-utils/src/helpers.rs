// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_core::{CascadeError, StreamItem};
use futures::stream::StreamExt;
use futures::Stream;
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::sleep;

pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    tokio::select! {
        _item = stream.next() => {
            panic!("Unexpected item emitted, expected no output.");
        }
        () = sleep(Duration::from_millis(timeout_ms)) => {}
    }
}

/// Pulls the next item and asserts it is `StreamItem::Value(expected)`.
pub async fn next_value<S, T>(stream: &mut S, expected: T)
where
    S: Stream<Item = StreamItem<T>> + Unpin,
    T: PartialEq + Debug,
{
    match stream.next().await {
        Some(StreamItem::Value(value)) => assert_eq!(value, expected),
        other => panic!("expected value {expected:?}, got {other:?}"),
    }
}

/// Drains `stream`, returning every value and the terminal error, if any.
///
/// # Panics
///
/// Panics if a value follows an error.
pub async fn collect_values<S, T>(stream: S) -> (Vec<T>, Option<CascadeError>)
where
    S: Stream<Item = StreamItem<T>>,
{
    let mut stream = Box::pin(stream);
    let mut values = Vec::new();
    let mut error = None;

    while let Some(item) = stream.next().await {
        match item {
            StreamItem::Value(value) => {
                assert!(error.is_none(), "value emitted after the terminal error");
                values.push(value);
            }
            StreamItem::Error(e) => {
                assert!(error.is_none(), "more than one error emitted");
                error = Some(e);
            }
        }
    }

    (values, error)
}
