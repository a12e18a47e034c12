// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Unbounded event queue between one source's drain loop and the merge that reads it.
//!
//! The producer side (`push`, `complete`, `fail`) is synchronous and never waits, so a
//! slow consumer can never stall a source. The consumer side waits asynchronously for
//! the next value or the terminal state.

#![allow(clippy::multiple_crate_versions)]
mod unbounded_queue;

pub use unbounded_queue::{QueueStream, TerminalState, UnboundedQueue};
