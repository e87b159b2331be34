//! Progress reporting for polled tasks

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::TaskStatus;

/// Receives every status the poller reads, and can ask it to stop
///
/// `report` is called synchronously between polls and must not block.
/// `is_cancelled` is checked before each wait; returning true ends the
/// poll loop with [`ApiError::TaskCancelled`](crate::ApiError::TaskCancelled).
pub trait ProgressSink: Send + Sync {
    fn report(&self, status: &TaskStatus);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that ignores progress and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _status: &TaskStatus) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&TaskStatus) + Send + Sync,
{
    fn report(&self, status: &TaskStatus) {
        self(status)
    }
}

/// Forwards statuses over a channel; cancelled through a token
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<TaskStatus>,
    cancel: CancellationToken,
}

impl ChannelProgress {
    /// Create a sink and the receiver for its statuses
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskStatus>) {
        Self::with_token(CancellationToken::new())
    }

    /// Create a sink tied to an existing cancellation token
    pub fn with_token(cancel: CancellationToken) -> (Self, mpsc::UnboundedReceiver<TaskStatus>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, cancel }, rx)
    }

    /// Token that stops the poll loop when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, status: &TaskStatus) {
        // A dropped receiver just means nobody is watching
        let _ = self.tx.send(status.clone());
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
