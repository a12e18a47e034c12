// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_core::{CascadeError, StreamItem};
use cascade_merge::{Phase, PriorityMerge, PushHandle, Source};
use cascade_test_utils::{
    assert_no_element_emitted, delayed_stream, delayed_values, next_value, CancelProbe,
};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn test_breaking_out_of_the_loop_stops_the_merge() {
    // Arrange
    let a = Source::pull(delayed_stream(vec![
        (ms(1), StreamItem::Value(1)),
        (ms(100), StreamItem::Value(2)),
    ]));
    let b = delayed_values(vec![3, 4, 5], 10);
    let mut merge = PriorityMerge::new(vec![a, b]).unwrap();
    let handle = merge.cancel_handle();

    // Act
    let mut observed = Vec::new();
    while let Some(item) = merge.next().await {
        let value = item.unwrap();
        if value == 4 {
            break;
        }
        observed.push(value);
    }
    drop(merge);

    // Assert
    assert_eq!(observed, vec![1, 2, 3]);
    assert!(handle.is_terminated());
}

#[tokio::test(start_paused = true)]
async fn test_breaking_out_cancels_sources_still_running() {
    // Arrange
    let probe_a = CancelProbe::new();
    let probe_b = CancelProbe::new();
    let a = Source::pull_with_cancel(
        delayed_stream(vec![(ms(1), StreamItem::Value(1)), (ms(100), StreamItem::Value(2))]),
        probe_a.hook(),
    );
    let live_feed = delayed_stream(vec![
        (ms(10), StreamItem::Value(3)),
        (ms(10), StreamItem::Value(4)),
        (ms(10), StreamItem::Value(5)),
    ])
    .chain(stream::pending::<StreamItem<i32>>());
    let b = Source::pull_with_cancel(live_feed, probe_b.hook());
    let mut merge = PriorityMerge::new(vec![a, b]).unwrap();

    // Act
    let mut observed = Vec::new();
    while let Some(StreamItem::Value(value)) = merge.next().await {
        if value == 4 {
            break;
        }
        observed.push(value);
    }
    drop(merge);

    // Assert
    assert_eq!(observed, vec![1, 2, 3]);
    assert_eq!(probe_a.calls(), 0, "completed sources are not cancelled");
    assert_eq!(probe_b.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_every_unfinished_source() {
    // Arrange
    let probes: Vec<_> = (0..3).map(|_| CancelProbe::new()).collect();
    let sources: Vec<_> = probes
        .iter()
        .map(|probe| Source::pull_with_cancel(stream::pending::<StreamItem<u8>>(), probe.hook()))
        .collect();
    let merge = PriorityMerge::new(sources).unwrap();
    let coordinator = merge.coordinator().clone();

    // Act
    drop(merge);

    // Assert
    for probe in &probes {
        assert_eq!(probe.calls(), 1);
    }
    assert_eq!(coordinator.phase(), Phase::Terminated);
    assert!(matches!(coordinator.outcome(), Some(CascadeError::Cancelled)));
}

#[tokio::test]
async fn test_drop_after_completion_cancels_nothing() {
    // Arrange
    let probe = CancelProbe::new();
    let merge = PriorityMerge::new(vec![Source::pull_with_cancel(
        stream::iter(vec![StreamItem::Value(1)]),
        probe.hook(),
    )])
    .unwrap();
    let coordinator = merge.coordinator().clone();

    // Act
    let items: Vec<_> = merge.collect().await;

    // Assert
    assert_eq!(items, vec![StreamItem::Value(1)]);
    assert_eq!(probe.calls(), 0);
    assert_eq!(coordinator.phase(), Phase::Terminated);
    assert!(coordinator.outcome().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_handle_ends_the_stream() {
    // Arrange
    let probe = CancelProbe::new();
    let mut merge = PriorityMerge::new(vec![
        Source::values(stream::iter(vec![1])),
        Source::pull_with_cancel(stream::pending::<StreamItem<i32>>(), probe.hook()),
    ])
    .unwrap();
    let handle = merge.cancel_handle();
    next_value(&mut merge, 1).await;

    // Act
    tokio::spawn(async move {
        sleep(ms(20)).await;
        assert!(handle.cancel());
        assert!(!handle.cancel());
    });

    // Assert
    assert!(merge.next().await.is_none());
    assert!(merge.is_terminated());
    assert_eq!(probe.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_buffered_items() {
    // Arrange
    let mut merge = PriorityMerge::new(vec![
        delayed_values(vec![1], 500),
        Source::values(stream::iter(vec![2, 3])),
    ])
    .unwrap();
    sleep(ms(10)).await;

    // Act
    merge.cancel_handle().cancel();

    // Assert
    assert!(merge.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failing_and_panicking_hooks_do_not_stop_fan_out() {
    // Arrange
    let failing = CancelProbe::new();
    let panicking = CancelProbe::new();
    let healthy = CancelProbe::new();
    let merge = PriorityMerge::new(vec![
        Source::pull_with_cancel(stream::pending::<StreamItem<u8>>(), failing.failing_hook()),
        Source::pull_with_cancel(stream::pending::<StreamItem<u8>>(), panicking.panicking_hook()),
        Source::pull_with_cancel(stream::pending::<StreamItem<u8>>(), healthy.hook()),
    ])
    .unwrap();
    sleep(ms(5)).await;

    // Act
    drop(merge);

    // Assert
    assert_eq!(failing.calls(), 1);
    assert_eq!(panicking.calls(), 1);
    assert_eq!(healthy.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_push_source_discards_pushes() {
    // Arrange
    let (park_tx, park_rx) = tokio::sync::oneshot::channel::<PushHandle<u8>>();
    let merge = PriorityMerge::new(vec![Source::push(move |handle: PushHandle<u8>| {
        let _ = park_tx.send(handle);
    })])
    .unwrap();
    let handle = park_rx.await.unwrap();
    assert!(!handle.is_cancelled());

    // Act
    drop(merge);

    // Assert
    assert!(handle.is_cancelled());
    assert!(!handle.push(1));
}

#[tokio::test(start_paused = true)]
async fn test_async_producer_is_dropped_on_cancel() {
    // Arrange
    let finished = Arc::new(AtomicBool::new(false));
    let finished_clone = finished.clone();
    let mut merge = PriorityMerge::new(vec![Source::push_async(
        move |handle: PushHandle<u32>| async move {
            handle.push(1);
            sleep(ms(1_000)).await;
            finished_clone.store(true, Ordering::SeqCst);
        },
    )])
    .unwrap();
    next_value(&mut merge, 1).await;

    // Act
    merge.cancel_handle().cancel();
    sleep(ms(2_000)).await;

    // Assert
    assert!(!finished.load(Ordering::SeqCst));
    assert!(merge.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_idle_merge_emits_nothing() {
    let mut merge =
        PriorityMerge::new(vec![Source::values(stream::pending::<u8>())]).unwrap();

    assert_no_element_emitted(&mut merge, 100).await;
}
