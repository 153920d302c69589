//! Single-shot completion handle returned by bridge operations.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{BridgeError, Result};

/// Sender half kept by the bridge for a pending operation.
pub(crate) type Resolver<T> = oneshot::Sender<Result<T>>;

/// Future resolved at most once by the bridge.
///
/// Bridge operations do their work eagerly when called and hand back a
/// `Completion`; awaiting it only waits for the renderer's answer. A
/// completion whose resolver is dropped without an answer yields
/// [`BridgeError::BridgeClosed`].
#[must_use = "a completion does nothing unless awaited"]
pub struct Completion<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Ready(Option<Result<T>>),
    Waiting(oneshot::Receiver<Result<T>>),
}

impl<T> Completion<T> {
    pub(crate) fn ready(value: T) -> Self {
        Self {
            inner: Inner::Ready(Some(Ok(value))),
        }
    }

    pub(crate) fn failed(error: BridgeError) -> Self {
        Self {
            inner: Inner::Ready(Some(Err(error))),
        }
    }

    /// Create a pending completion together with its resolver.
    pub(crate) fn pending() -> (Resolver<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            Self {
                inner: Inner::Waiting(rx),
            },
        )
    }

    /// True if the completion was settled when it was created (a fast-path
    /// success or an immediate rejection).
    pub fn is_immediate(&self) -> bool {
        matches!(self.inner, Inner::Ready(_))
    }
}

// The payload is moved out, never pinned.
impl<T> Unpin for Completion<T> {}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(BridgeError::BridgeClosed)))
            }
            Inner::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(BridgeError::BridgeClosed))),
        }
    }
}

impl<T> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.inner {
            Inner::Ready(_) => "ready",
            Inner::Waiting(_) => "waiting",
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}
