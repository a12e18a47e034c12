// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Priority-ordered merge of concurrently running sources.
//!
//! Sources start immediately and buffer into their own queues; the merged stream
//! forwards them strictly one after another in declared order.
//!
//! - [`Source`]: pull (`Stream`) or push (producer + [`PushHandle`]) input
//! - [`EagerSource`]: a source drained on its own task from creation
//! - [`CancellationCoordinator`]: first-outcome-wins teardown of a session
//! - [`PriorityMerge`]: the consumer-facing stream
//!
//! Two error policies exist, see [`MergePolicy`].

#![allow(clippy::multiple_crate_versions)]
mod builder;
mod coordinator;
mod eager_source;
mod panic;
mod priority_merge;
mod source;

pub use builder::MergeBuilder;
pub use coordinator::{Cancellable, CancellationCoordinator, Phase};
pub use eager_source::EagerSource;
pub use priority_merge::{CancelHandle, MergePolicy, PriorityMerge, PriorityMergeExt};
pub use source::{CancelHook, PullSource, PushHandle, PushSource, Source};
