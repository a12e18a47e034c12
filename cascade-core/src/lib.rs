// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core types shared by the Cascade merge engine.
//!
//! - [`StreamItem`]: the value-or-error item every source and merged stream carries
//! - [`CascadeError`]: the root error type
//! - [`CancellationToken`]: cloneable cancellation flag with async waiting
//! - [`CascadeTask`]: spawned background work that cancels itself on drop
//!
//! Logging goes through the exported `debug!`, `warn!` and `error!` macros, which
//! forward to `tracing` when the `tracing` feature is enabled and compile to
//! nothing otherwise.

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod cancellation_token;
pub mod cascade_task;
pub mod error;
mod logging;
pub mod stream_item;

pub use self::cancellation_token::{Cancelled, CancelledOwned, CancellationToken};
pub use self::cascade_task::CascadeTask;
pub use self::error::{CascadeError, IntoCascadeError, Result, ResultExt};
pub use self::stream_item::StreamItem;

#[cfg(feature = "tracing")]
#[doc(hidden)]
pub use tracing;
