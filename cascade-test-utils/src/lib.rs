// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities and fixtures for the Cascade merge engine.
//!
//! Designed for use in tests and benchmarks only.
//!
//! - [`sources`]: timed pull and push sources, failing sources, production counters
//! - [`probe`]: [`CancelProbe`] records cancel-hook invocations
//! - [`helpers`]: assertion and collection helpers
//!
//! ```rust
//! use cascade_test_utils::{collect_values, delayed_values};
//! use cascade_merge::PriorityMerge;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let merge = PriorityMerge::new(vec![
//!     delayed_values(vec![1], 50),
//!     delayed_values(vec![2, 3], 10),
//! ])
//! .unwrap();
//!
//! let (values, error) = collect_values(merge).await;
//! assert_eq!(values, vec![1, 2, 3]);
//! assert!(error.is_none());
//! # }
//! ```

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod helpers;
pub mod probe;
pub mod sources;

use cascade_core::StreamItem;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub use helpers::{assert_no_element_emitted, collect_values, next_value};
pub use probe::CancelProbe;
pub use sources::{
    counted, delayed_push_source, delayed_stream, delayed_values, failing_push_source,
    failing_source,
};

/// Creates a test channel that wraps every sent value in `StreamItem::Value`.
///
/// ```rust
/// use cascade_test_utils::test_channel;
/// use cascade_merge::Source;
///
/// let (tx, stream) = test_channel::<u32>();
/// let source = Source::pull(stream);
/// tx.send(1).unwrap();
/// # drop(source);
/// ```
pub fn test_channel<T: Send + 'static>() -> (
    mpsc::UnboundedSender<T>,
    impl Stream<Item = StreamItem<T>> + Send,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = UnboundedReceiverStream::new(rx).map(StreamItem::Value);
    (tx, stream)
}

/// Creates a test channel that accepts `StreamItem<T>`, so tests can send errors.
pub fn test_channel_with_errors<T: Send + 'static>() -> (
    mpsc::UnboundedSender<StreamItem<T>>,
    impl Stream<Item = StreamItem<T>> + Send,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = UnboundedReceiverStream::new(rx);
    (tx, stream)
}
