// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for the Cascade merge engine
//!
//! A merge session surfaces at most one terminal error to its consumer. Every failure
//! that can occur along the way, from a source raising an error to a queue being
//! terminated twice, is described by a variant of [`CascadeError`].
//!
//! # Examples
//!
//! ```
//! use cascade_core::{CascadeError, Result};
//!
//! fn pull_next() -> Result<u32> {
//!     Err(CascadeError::source_error(0, "connection reset"))
//! }
//!
//! assert!(pull_next().is_err());
//! ```

/// Root error type for all Cascade operations
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    /// A source raised an error while being drained
    #[error("Source {index} failed: {context}")]
    SourceError {
        /// Priority position of the failing source
        index: usize,
        /// Description of the failure
        context: String,
    },

    /// A source panicked while being polled or while running its producer
    #[error("Source {index} panicked: {context}")]
    SourcePanic {
        /// Priority position of the panicking source
        index: usize,
        /// Panic payload, when it was a string
        context: String,
    },

    /// Custom error from user code
    ///
    /// This wraps errors produced by user-provided sources and hooks.
    #[error("User error: {0}")]
    UserError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A queue received a second terminal signal
    ///
    /// The second signal is discarded; the first terminal state stays in place.
    #[error("Double termination: {context}")]
    DoubleTermination {
        /// Which terminal signal was rejected
        context: String,
    },

    /// A merge was constructed without any source
    #[error("Priority merge requires at least one source")]
    EmptySourceList,

    /// A deadline expired before the merged stream finished
    #[error("Timeout error: {context}")]
    Timeout {
        /// Context about the timeout (e.g. duration)
        context: String,
    },

    /// The consumer stopped consuming before the merge finished
    ///
    /// This is an outcome rather than a failure and is never emitted as a stream item.
    #[error("Merge cancelled by consumer")]
    Cancelled,
}

impl CascadeError {
    /// Create a source error for the source at `index`
    pub fn source_error(index: usize, context: impl Into<String>) -> Self {
        Self::SourceError {
            index,
            context: context.into(),
        }
    }

    /// Create a panic error for the source at `index`
    pub fn source_panic(index: usize, context: impl Into<String>) -> Self {
        Self::SourcePanic {
            index,
            context: context.into(),
        }
    }

    /// Create a double termination error
    pub fn double_termination(context: impl Into<String>) -> Self {
        Self::DoubleTermination {
            context: context.into(),
        }
    }

    /// Create a timeout error with the given context
    pub fn timeout_error(context: impl Into<String>) -> Self {
        Self::Timeout {
            context: context.into(),
        }
    }

    /// Wrap a user error
    pub fn user_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::UserError(Box::new(error))
    }

    /// Returns `true` for the consumer-cancellation sentinel.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` for errors that describe misuse of the engine rather than a
    /// failing source.
    #[must_use]
    pub const fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::DoubleTermination { .. } | Self::EmptySourceList
        )
    }
}

/// Specialized Result type for Cascade operations
///
/// # Examples
///
/// ```
/// use cascade_core::Result;
///
/// fn process() -> Result<String> {
///     Ok("processed".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, CascadeError>;

/// Extension trait for converting errors into `CascadeError`
///
/// Implemented for every `std::error::Error + Send + Sync + 'static`.
pub trait IntoCascadeError {
    /// Convert this error into a `CascadeError` attributed to the source at `index`
    fn into_source_error(self, index: usize) -> CascadeError;

    /// Convert this error into a `CascadeError` without attribution
    fn into_cascade(self) -> CascadeError;
}

impl<E: std::error::Error + Send + Sync + 'static> IntoCascadeError for E {
    fn into_source_error(self, index: usize) -> CascadeError {
        CascadeError::source_error(index, self.to_string())
    }

    fn into_cascade(self) -> CascadeError {
        CascadeError::user_error(self)
    }
}

/// Helper trait for adding context to `Result`s
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// # Errors
    /// Returns `Err(CascadeError)` if the underlying result is `Err`.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure (lazy evaluation)
    ///
    /// # Errors
    /// Returns `Err(CascadeError)` if the underlying result is `Err`.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CascadeError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            CascadeError::UserError(inner) => CascadeError::UserError(
                format!("{}: {inner}", f()).into(),
            ),
            CascadeError::SourceError { index, context } => CascadeError::SourceError {
                index,
                context: format!("{}: {context}", f()),
            },
            other => other,
        })
    }
}

impl Clone for CascadeError {
    fn clone(&self) -> Self {
        match self {
            Self::SourceError { index, context } => Self::SourceError {
                index: *index,
                context: context.clone(),
            },
            Self::SourcePanic { index, context } => Self::SourcePanic {
                index: *index,
                context: context.clone(),
            },
            // The boxed error cannot be cloned, keep its message
            Self::UserError(e) => Self::UserError(e.to_string().into()),
            Self::DoubleTermination { context } => Self::DoubleTermination {
                context: context.clone(),
            },
            Self::EmptySourceList => Self::EmptySourceList,
            Self::Timeout { context } => Self::Timeout {
                context: context.clone(),
            },
            Self::Cancelled => Self::Cancelled,
        }
    }
}
