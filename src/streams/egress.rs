// Egress channels
//
// One channel per downstream recipient (outbound destination or local
// subscriber). Single producer (the publisher session), single consumer
// (the bridge task). The queue carries complete wire-level chunks.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

/// Capacity of an egress channel, in blobs
pub const EGRESS_CHANNEL_CAPACITY: usize = 100;

/// Error returned by the non-blocking enqueue
#[derive(Debug, PartialEq, Eq)]
pub enum EgressSendError {
    /// The queue is full (slow consumer)
    Full,

    /// The consumer is gone
    Closed,
}

/// Producer half of an egress channel
pub struct EgressSender {
    /// Channel id (session id of the recipient, or a destination index)
    pub id: u64,

    sender: mpsc::Sender<Arc<Vec<u8>>>,
    exit: watch::Sender<bool>,
}

/// Consumer half of an egress channel
pub struct EgressReceiver {
    receiver: mpsc::Receiver<Arc<Vec<u8>>>,
    exit: watch::Receiver<bool>,
}

/// Creates an egress channel pair
///
/// # Arguments
///
/// * `id` - Channel id, used for logging and removal bookkeeping
pub fn egress_channel(id: u64) -> (EgressSender, EgressReceiver) {
    let (sender, receiver) = mpsc::channel(EGRESS_CHANNEL_CAPACITY);
    let (exit_sender, exit_receiver) = watch::channel(false);

    (
        EgressSender {
            id,
            sender,
            exit: exit_sender,
        },
        EgressReceiver {
            receiver,
            exit: exit_receiver,
        },
    )
}

impl EgressSender {
    /// Enqueues a blob without blocking
    pub fn try_send(&self, blob: Arc<Vec<u8>>) -> Result<(), EgressSendError> {
        self.sender.try_send(blob).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EgressSendError::Full,
            mpsc::error::TrySendError::Closed(_) => EgressSendError::Closed,
        })
    }

    /// Signals the consumer to stop, ahead of any queued blobs
    pub fn signal_exit(&self) {
        let _ = self.exit.send(true);
    }
}

/// Resolves when the exit flag turns true.
/// If the sender is dropped without signalling, pends forever and lets
/// the queue drain to its natural end.
async fn wait_exit(exit: &mut watch::Receiver<bool>) {
    if exit.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl EgressReceiver {
    /// Receives the next blob.
    /// Returns None once the exit signal is posted or the producer is gone;
    /// the exit signal takes priority over queued blobs.
    pub async fn recv(&mut self) -> Option<Arc<Vec<u8>>> {
        tokio::select! {
            biased;
            _ = wait_exit(&mut self.exit) => None,
            blob = self.receiver.recv() => blob,
        }
    }
}

// Tests
