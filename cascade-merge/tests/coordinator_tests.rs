// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_core::{CascadeError, Result};
use cascade_merge::{Cancellable, CancellationCoordinator, Phase};
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct RecordingSource {
    index: usize,
    cancels: AtomicUsize,
    panics: bool,
}

impl RecordingSource {
    fn new(index: usize) -> Arc<Self> {
        Arc::new(Self {
            index,
            ..Self::default()
        })
    }

    fn panicking(index: usize) -> Arc<Self> {
        Arc::new(Self {
            index,
            panics: true,
            ..Self::default()
        })
    }

    fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl Cancellable for RecordingSource {
    fn index(&self) -> usize {
        self.index
    }

    fn cancel(&self) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("source {} refused to stop", self.index);
        }
        Ok(())
    }
}

fn coordinator_with(sources: &[Arc<RecordingSource>]) -> CancellationCoordinator {
    let coordinator = CancellationCoordinator::new("test");
    for source in sources {
        coordinator.register(source.clone());
    }
    coordinator
}

#[test]
fn test_new_coordinator_is_active() {
    let coordinator = CancellationCoordinator::new("test");

    assert_eq!(coordinator.phase(), Phase::Active);
    assert!(!coordinator.is_terminated());
    assert!(coordinator.outcome().is_none());
    assert_eq!(coordinator.label(), "test");
}

#[test]
fn test_first_error_wins_and_cancels_once() {
    // Arrange
    let sources = [RecordingSource::new(0), RecordingSource::new(1)];
    let coordinator = coordinator_with(&sources);

    // Act
    let first = coordinator.report_error(1, CascadeError::source_error(1, "first"));
    let second = coordinator.report_error(0, CascadeError::source_error(0, "second"));
    let cancel = coordinator.report_consumer_cancel();

    // Assert
    assert!(first);
    assert!(!second);
    assert!(!cancel);
    assert_eq!(
        coordinator.winning_error().unwrap().to_string(),
        "Source 1 failed: first"
    );
    assert_eq!(coordinator.phase(), Phase::Terminated);
    assert!(sources.iter().all(|source| source.cancels() == 1));
}

#[test]
fn test_consumer_cancel_records_cancelled_outcome() {
    let sources = [RecordingSource::new(0)];
    let coordinator = coordinator_with(&sources);

    assert!(coordinator.report_consumer_cancel());
    assert!(!coordinator.report_error(0, CascadeError::source_error(0, "too late")));

    assert!(matches!(coordinator.outcome(), Some(CascadeError::Cancelled)));
    assert!(coordinator.winning_error().is_none());
    assert_eq!(sources[0].cancels(), 1);
}

#[test]
fn test_finished_sources_are_not_cancelled() {
    // Arrange
    let sources = [
        RecordingSource::new(0),
        RecordingSource::new(1),
        RecordingSource::new(2),
    ];
    let coordinator = coordinator_with(&sources);
    coordinator.report_done(0);
    coordinator.report_done(2);

    // Act
    coordinator.report_consumer_cancel();

    // Assert
    assert_eq!(sources[0].cancels(), 0);
    assert_eq!(sources[1].cancels(), 1);
    assert_eq!(sources[2].cancels(), 0);
    assert_eq!(coordinator.done_count(), 2);
    assert!(coordinator.is_done(2));
    assert!(!coordinator.is_done(1));
}

#[test]
fn test_panicking_source_does_not_block_fan_out() {
    let sources = [
        RecordingSource::panicking(0),
        RecordingSource::new(1),
        RecordingSource::panicking(2),
    ];
    let coordinator = coordinator_with(&sources);

    assert!(coordinator.report_error(0, CascadeError::source_error(0, "boom")));

    assert!(sources.iter().all(|source| source.cancels() == 1));
    assert_eq!(coordinator.phase(), Phase::Terminated);
}

#[test]
fn test_late_registration_is_cancelled_immediately() {
    // Arrange
    let coordinator = CancellationCoordinator::new("test");
    coordinator.report_consumer_cancel();
    let late = RecordingSource::new(4);

    // Act
    coordinator.register(late.clone());

    // Assert
    assert_eq!(late.cancels(), 1);
}

#[test]
fn test_completion_terminates_without_outcome() {
    // Arrange
    let sources = [RecordingSource::new(0)];
    let coordinator = coordinator_with(&sources);
    coordinator.report_done(0);

    // Act
    coordinator.report_completed();

    // Assert
    assert_eq!(coordinator.phase(), Phase::Terminated);
    assert!(coordinator.outcome().is_none());
    assert!(!coordinator.report_error(0, CascadeError::source_error(0, "after")));
    assert!(coordinator.winning_error().is_none());
    assert_eq!(sources[0].cancels(), 0);
}

#[test]
fn test_duplicate_done_report_is_counted_once() {
    let coordinator = CancellationCoordinator::new("test");

    coordinator.report_done(3);
    coordinator.report_done(3);

    assert_eq!(coordinator.done_count(), 1);
}

#[test]
fn test_terminated_future_resolves_on_termination() {
    // Arrange
    let coordinator = CancellationCoordinator::new("test");
    let mut terminated = coordinator.terminated();
    assert!((&mut terminated).now_or_never().is_none());

    // Act
    coordinator.report_error(0, CascadeError::timeout_error("slow"));

    // Assert
    assert!(terminated.now_or_never().is_some());
    assert!(coordinator.terminated().now_or_never().is_some());
}

#[test]
fn test_clones_share_the_session() {
    let coordinator = CancellationCoordinator::new("test");
    let clone = coordinator.clone();

    clone.report_consumer_cancel();

    assert!(coordinator.is_terminated());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_have_a_single_winner() {
    // Arrange
    let sources: Vec<_> = (0..8).map(RecordingSource::new).collect();
    let coordinator = coordinator_with(&sources);

    // Act
    let handles: Vec<_> = (0..8)
        .map(|index| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator.report_error(index, CascadeError::source_error(index, "race"))
            })
        })
        .collect();
    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }

    // Assert
    assert_eq!(winners, 1);
    assert!(sources.iter().all(|source| source.cancels() == 1));
}
