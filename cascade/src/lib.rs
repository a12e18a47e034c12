// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Cascade
//!
//! Merge several independent async sources into one stream ordered by source
//! priority, while every source runs and buffers from the start.
//!
//! A typical use is a subscription that combines an initial snapshot query with a
//! live update feed: updates arriving while the snapshot is still loading are kept,
//! and delivered right after the snapshot.
//!
//! ## Quick Start
//!
//! ```rust
//! use cascade::prelude::*;
//! use futures::{stream, StreamExt};
//!
//! # #[tokio::main]
//! # async fn main() -> cascade::Result<()> {
//! let snapshot = Source::values(stream::iter(vec!["row 1", "row 2"]));
//! let updates = Source::push(|handle: PushHandle<&'static str>| {
//!     handle.push("update 1");
//!     handle.stop();
//! });
//!
//! let merged = vec![snapshot, updates].priority_merge()?;
//! let items: Vec<_> = merged.filter_map(|item| async move { item.ok() }).collect().await;
//!
//! assert_eq!(items, vec!["row 1", "row 2", "update 1"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Deadlines
//!
//! The merge has no timeout of its own. [`DeadlineExt::with_deadline`] races it against
//! a timer and cancels every source when the timer wins.

#![allow(clippy::multiple_crate_versions)]
pub mod deadline;

pub use cascade_core::{CancellationToken, CascadeError, Result, StreamItem};
pub use cascade_merge::{
    CancelHandle, CancellationCoordinator, EagerSource, MergeBuilder, MergePolicy, Phase,
    PriorityMerge, PriorityMergeExt, PushHandle, Source,
};
pub use cascade_queue::UnboundedQueue;
pub use deadline::{DeadlineExt, DeadlineStream};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::deadline::DeadlineExt;
    pub use cascade_core::{CascadeError, StreamItem};
    pub use cascade_merge::{MergePolicy, PriorityMerge, PriorityMergeExt, PushHandle, Source};
}
