//! Cooperative operations that suspend at bus boundaries.
//!
//! Every driver operation is a small state machine. Whatever it needs across a
//! suspension (step counter, partial results) lives in the operation value, so
//! it can be polled from a main loop, awaited from an executor, or driven to
//! completion in place with [`Resumable::run_blocking`].
//!
//! Operations mutably borrow the device they act on. The borrow checker
//! therefore refuses a second operation on the same device while one is still
//! alive, which keeps the shared transaction buffer single-flight.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

/// Outcome of a single [`Resumable::poll`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress<T, E> {
    /// Waiting on an outstanding bus transfer.
    Running,
    /// Completed with a value.
    Done(T),
    /// Completed with an error.
    Failed(E),
}

impl<T, E> Progress<T, E> {
    /// Returns `true` when the operation is still waiting.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Lifecycle of a resumable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Created or restarted, not yet polled.
    NotStarted,
    /// Polled at least once and waiting on the bus.
    Running,
    /// Terminal: produced a value.
    Done,
    /// Terminal: produced an error.
    Failed,
}

impl State {
    /// Returns `true` for [`State::Done`] and [`State::Failed`].
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Runs one step unless already terminal, then records where it left off.
    ///
    /// `finished` is returned instead of stepping when the operation has
    /// already completed and was not restarted.
    pub(crate) fn resume<T, E>(
        &mut self,
        finished: E,
        step: impl FnOnce() -> Progress<T, E>,
    ) -> Progress<T, E> {
        if self.is_terminal() {
            return Progress::Failed(finished);
        }

        let progress = step();
        *self = match progress {
            Progress::Running => Self::Running,
            Progress::Done(_) => Self::Done,
            Progress::Failed(_) => Self::Failed,
        };
        progress
    }
}

/// A computation that advances in non-blocking steps.
pub trait Resumable {
    /// Value produced on success.
    type Output;
    /// Error produced on failure.
    type Error;

    /// Rewinds the operation to its entry point.
    fn start(&mut self);

    /// Advances the operation as far as it can go without blocking.
    ///
    /// Polling after `Done` or `Failed` without calling [`Resumable::start`]
    /// yields `Failed` with the driver's `Finished` error.
    fn poll(&mut self) -> Progress<Self::Output, Self::Error>;

    /// Current lifecycle state.
    fn state(&self) -> State;

    /// Polls until completion, calling `idle` whenever the bus is still busy.
    ///
    /// Must not be called from inside another operation's step: on a single
    /// thread nothing else can make progress while this spins.
    fn run_blocking_with<F>(&mut self, mut idle: F) -> Result<Self::Output, Self::Error>
    where
        F: FnMut(),
    {
        loop {
            match self.poll() {
                Progress::Running => idle(),
                Progress::Done(value) => return Ok(value),
                Progress::Failed(err) => return Err(err),
            }
        }
    }

    /// Polls until completion, spinning between polls.
    fn run_blocking(&mut self) -> Result<Self::Output, Self::Error> {
        self.run_blocking_with(core::hint::spin_loop)
    }
}

/// Adapts a [`Resumable`] operation to [`Future`].
///
/// The bus interface has no completion callback, so a pending poll wakes the
/// task right away and the executor polls again on its next pass.
#[must_use = "futures do nothing unless polled"]
pub struct ResumableFuture<R> {
    operation: R,
}

impl<R> ResumableFuture<R> {
    pub(crate) fn new(operation: R) -> Self {
        Self { operation }
    }
}

impl<R> Future for ResumableFuture<R>
where
    R: Resumable + Unpin,
{
    type Output = Result<R::Output, R::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut().operation.poll() {
            Progress::Running => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Progress::Done(value) => Poll::Ready(Ok(value)),
            Progress::Failed(err) => Poll::Ready(Err(err)),
        }
    }
}
