use std::{fmt, io, time::Duration};

use thiserror::Error;

/// What to do after a failed fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after waiting `delay`.
    Retry { delay: Duration },
    /// Give up and surface the error.
    Abort,
}

impl RetryDecision {
    pub fn immediately() -> Self {
        Self::Retry { delay: Duration::ZERO }
    }

    pub fn after(delay: Duration) -> Self {
        Self::Retry { delay }
    }
}

/// Marks a connector failure as transient, so the standard decoration may retry it.
///
/// Connectors wrap failures that can succeed on a later attempt (timeouts, dropped
/// connections, throttling). Every other error is surfaced after the first attempt.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct RecoverableError(#[from] anyhow::Error);

impl RecoverableError {
    /// Wrap `error` so that it is retried.
    pub fn wrap(error: impl Into<anyhow::Error>) -> anyhow::Error {
        anyhow::Error::new(Self(error.into()))
    }

    /// Whether `error`, or any context layered over it, was marked recoverable.
    pub fn is_recoverable(error: &anyhow::Error) -> bool {
        error.downcast_ref::<Self>().is_some()
    }

    /// I/O error kinds worth another attempt.
    pub fn is_transient_io(kind: io::ErrorKind) -> bool {
        matches!(
            kind,
            io::ErrorKind::Interrupted
                | io::ErrorKind::TimedOut
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
        )
    }
}

/// Hook consulted by the connector decoration after a failed fetch attempt.
///
/// Only recoverable failures (see [`RecoverableError`]) reach the handler, and it is not
/// consulted after the last allowed attempt since no retry could follow.
///
/// Backoff policy lives entirely in implementations; the decoration only waits for the
/// delay it is given. Handlers may keep state across attempts, so each import works on
/// its own duplicate.
pub trait FetchExceptionHandler: HandlerClone + Send + Sync + fmt::Debug {
    /// Decide whether the failed attempt number `attempt` (starting at 1) is retried.
    ///
    /// Called at most `max_fetch_attempts - 1` times per fetch.
    fn handle(&mut self, error: &anyhow::Error, attempt: u64) -> RetryDecision;
}

/// Duplication for boxed handlers. Implemented for every `Clone` handler.
pub trait HandlerClone {
    fn clone_handler(&self) -> Box<dyn FetchExceptionHandler>;
}

impl<T> HandlerClone for T
where
    T: FetchExceptionHandler + Clone + 'static,
{
    fn clone_handler(&self) -> Box<dyn FetchExceptionHandler> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn FetchExceptionHandler> {
    fn clone(&self) -> Self {
        (**self).clone_handler()
    }
}
