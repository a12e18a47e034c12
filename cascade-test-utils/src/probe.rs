// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_core::{CascadeError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts how often the cancel hooks it hands out were invoked.
#[derive(Debug, Clone, Default)]
pub struct CancelProbe {
    calls: Arc<AtomicUsize>,
}

impl CancelProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cancel hook that records its invocation and succeeds.
    pub fn hook(&self) -> impl FnOnce() -> Result<()> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// A cancel hook that records its invocation and then fails.
    pub fn failing_hook(&self) -> impl FnOnce() -> Result<()> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CascadeError::source_error(0, "cancel hook failed"))
        }
    }

    /// A cancel hook that records its invocation and then panics.
    pub fn panicking_hook(&self) -> impl FnOnce() -> Result<()> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            panic!("cancel hook panicked");
        }
    }

    /// Number of recorded invocations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_cancelled(&self) -> bool {
        self.calls() > 0
    }
}
