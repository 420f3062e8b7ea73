use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::error::{Result, SessionError};

/// # Completion
///
/// The caller-side handle paired with a [`Task`](super::Task): a future that
/// resolves once the batch processor has delivered the task's terminal
/// result.
pub(crate) struct Completion<B> {
    /// The underlying channel receiver
    receiver: oneshot::Receiver<Result<Vec<B>>>,
}

impl<B> Completion<B> {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<Vec<B>>>) -> Self {
        Self { receiver }
    }
}

impl<B> Future for Completion<B> {
    type Output = Result<Vec<B>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The processor guarantees a send on every exit path, so a closed
            // channel means its worker died before completing the batch.
            Poll::Ready(Err(_)) => Poll::Ready(Err(SessionError::Internal(
                "batch processor dropped the task before completing it".to_string(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
