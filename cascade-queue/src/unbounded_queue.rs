// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_core::{warn, CascadeError, Result, StreamItem};
use event_listener::{Event, EventListener};
use futures::future::poll_fn;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Terminal state of an [`UnboundedQueue`], as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Still accepting values
    Open,
    /// Completed normally
    Completed,
    /// Failed with an error
    Errored,
}

enum Terminal {
    Open,
    Completed,
    // `None` once the error has been handed to the consumer
    Errored(Option<CascadeError>),
}

impl Terminal {
    const fn state(&self) -> TerminalState {
        match self {
            Self::Open => TerminalState::Open,
            Self::Completed => TerminalState::Completed,
            Self::Errored(_) => TerminalState::Errored,
        }
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    terminal: Terminal,
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    event: Event,
}

/// FIFO of pending values plus a one-shot terminal state.
///
/// Cloning yields another handle to the same queue. The intended topology is one
/// writer (a source's drain loop) and one reader (the merge).
///
/// # Example
///
/// ```
/// use cascade_queue::UnboundedQueue;
///
/// # #[tokio::main]
/// # async fn main() {
/// let queue = UnboundedQueue::new();
/// queue.push(1);
/// queue.push(2);
/// queue.complete().unwrap();
///
/// assert_eq!(queue.wait_for_next().await.unwrap(), Some(1));
/// assert_eq!(queue.wait_for_next().await.unwrap(), Some(2));
/// assert_eq!(queue.wait_for_next().await.unwrap(), None);
/// # }
/// ```
pub struct UnboundedQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> UnboundedQueue<T> {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    terminal: Terminal::Open,
                }),
                event: Event::new(),
            }),
        }
    }

    /// Appends a value and wakes a pending reader.
    ///
    /// Never blocks. A value pushed after the terminal state was set is discarded;
    /// the return value tells whether the value was queued.
    pub fn push(&self, value: T) -> bool {
        {
            let mut state = self.shared.state.lock();
            if !matches!(state.terminal, Terminal::Open) {
                warn!("unbounded_queue: push after terminal state, value discarded");
                return false;
            }
            state.items.push_back(value);
        }
        self.shared.event.notify(usize::MAX);
        true
    }

    /// Marks the queue as completed.
    ///
    /// Values already queued are still delivered before the completion is observed.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::DoubleTermination`] if a terminal state was already
    /// recorded. The existing state is kept.
    pub fn complete(&self) -> Result<()> {
        self.terminate(Terminal::Completed, "complete")
    }

    /// Marks the queue as failed with `error`.
    ///
    /// The error is surfaced to the reader after every value queued before it.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::DoubleTermination`] if a terminal state was already
    /// recorded. The existing state is kept and `error` is dropped.
    pub fn fail(&self, error: CascadeError) -> Result<()> {
        self.terminate(Terminal::Errored(Some(error)), "fail")
    }

    fn terminate(&self, terminal: Terminal, signal: &str) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            let previous = state.terminal.state();
            if previous != TerminalState::Open {
                warn!(
                    "unbounded_queue: {}() ignored, queue already {:?}",
                    signal, previous
                );
                return Err(CascadeError::double_termination(format!(
                    "{signal}() on a queue already {previous:?}"
                )));
            }
            state.terminal = terminal;
        }
        self.shared.event.notify(usize::MAX);
        Ok(())
    }

    /// Waits for the next value.
    ///
    /// - `Ok(Some(value))` for the next queued value
    /// - `Ok(None)` once the queue completed and is drained
    /// - `Err(error)` once the queue failed and every earlier value was delivered
    ///
    /// After the error has been returned, further calls yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the error the queue was failed with.
    pub async fn wait_for_next(&self) -> Result<Option<T>> {
        let mut listener = None;
        poll_fn(|cx| self.poll_next_item(&mut listener, cx)).await
    }

    /// Poll form of [`wait_for_next`](Self::wait_for_next).
    ///
    /// `listener` holds the wake-up registration between polls; start with `None`
    /// and keep passing the same slot.
    pub fn poll_next_item(
        &self,
        listener: &mut Option<EventListener>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<T>>> {
        loop {
            {
                let mut state = self.shared.state.lock();
                if let Some(value) = state.items.pop_front() {
                    *listener = None;
                    return Poll::Ready(Ok(Some(value)));
                }
                match &mut state.terminal {
                    Terminal::Open => {}
                    Terminal::Completed => {
                        *listener = None;
                        return Poll::Ready(Ok(None));
                    }
                    Terminal::Errored(error) => {
                        *listener = None;
                        return Poll::Ready(error.take().map_or(Ok(None), Err));
                    }
                }
            }

            match listener {
                Some(l) => {
                    if Pin::new(l).poll(cx).is_pending() {
                        return Poll::Pending;
                    }
                    *listener = None;
                }
                None => {
                    // The state is re-checked on the next iteration, after registering
                    *listener = Some(self.shared.event.listen());
                }
            }
        }
    }

    /// Number of values waiting to be read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    /// Returns `true` if no value is waiting to be read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().items.is_empty()
    }

    /// Returns `true` once `complete` or `fail` succeeded.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminal_state() != TerminalState::Open
    }

    /// The current terminal state.
    #[must_use]
    pub fn terminal_state(&self) -> TerminalState {
        self.shared.state.lock().terminal.state()
    }

    /// Turns this handle into a stream of [`StreamItem`]s that ends after the
    /// completion or after yielding the error.
    #[must_use]
    pub fn into_stream(self) -> QueueStream<T> {
        QueueStream {
            queue: self,
            listener: None,
            done: false,
        }
    }
}

impl<T> Default for UnboundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for UnboundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for UnboundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("UnboundedQueue")
            .field("len", &state.items.len())
            .field("terminal", &state.terminal.state())
            .finish()
    }
}

/// Stream view of an [`UnboundedQueue`], created by [`UnboundedQueue::into_stream`].
pub struct QueueStream<T> {
    queue: UnboundedQueue<T>,
    listener: Option<EventListener>,
    done: bool,
}

impl<T> Stream for QueueStream<T> {
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.queue.poll_next_item(&mut this.listener, cx) {
            Poll::Ready(Ok(Some(value))) => Poll::Ready(Some(StreamItem::Value(value))),
            Poll::Ready(Ok(None)) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Err(error)) => {
                this.done = true;
                Poll::Ready(Some(StreamItem::Error(error)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
