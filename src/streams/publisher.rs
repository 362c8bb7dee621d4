// Publisher session state shared with subscribers

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{EgressSendError, EgressSender};

/// Cached initialization frames of a published stream,
/// copied out once at play time
pub struct StreamInitFrames {
    /// Raw payload of the first @setDataFrame message
    pub metadata: Option<Arc<Vec<u8>>>,

    /// Raw payload of the first audio message (AAC sequence header)
    pub first_audio: Option<Arc<Vec<u8>>>,

    /// Raw payload of the first video message (AVC sequence header)
    pub first_video: Option<Arc<Vec<u8>>>,
}

/// Mutable part of the publisher session
struct PublisherSessionInner {
    /// Cached metadata payload
    metadata: Option<Arc<Vec<u8>>>,

    /// Cached first audio payload
    first_audio: Option<Arc<Vec<u8>>>,

    /// Cached first video payload
    first_video: Option<Arc<Vec<u8>>>,

    /// Channels receiving every chunk
    active_egress: Vec<EgressSender>,

    /// Subscribers enrolled but waiting for a keyframe boundary
    waiting_egress: Vec<EgressSender>,
}

/// Per-stream state shared between a publishing connection
/// and its destinations / subscribers
pub struct PublisherSession {
    /// Stream key (registry key)
    pub stream_key: String,

    /// App name from the connect command
    pub app_name: String,

    /// Session id of the publishing connection
    pub session_id: u64,

    inner: Mutex<PublisherSessionInner>,
}

impl PublisherSession {
    /// Creates a publisher session
    ///
    /// # Arguments
    ///
    /// * `stream_key` - The stream key
    /// * `app_name` - App name from the connect command
    /// * `session_id` - Session id of the publishing connection
    pub fn new(stream_key: &str, app_name: &str, session_id: u64) -> PublisherSession {
        PublisherSession {
            stream_key: stream_key.to_string(),
            app_name: app_name.to_string(),
            session_id,
            inner: Mutex::new(PublisherSessionInner {
                metadata: None,
                first_audio: None,
                first_video: None,
                active_egress: Vec::new(),
                waiting_egress: Vec::new(),
            }),
        }
    }

    /// Stores the metadata payload, first write wins.
    /// Returns true if the payload was stored.
    pub async fn set_metadata(&self, payload: Arc<Vec<u8>>) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.metadata.is_some() {
            return false;
        }

        inner.metadata = Some(payload);

        true
    }

    /// Stores the first audio payload, first write wins.
    /// Returns true if the payload was stored.
    pub async fn set_first_audio(&self, payload: Arc<Vec<u8>>) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.first_audio.is_some() {
            return false;
        }

        inner.first_audio = Some(payload);

        true
    }

    /// Stores the first video payload, first write wins.
    /// Returns true if the payload was stored.
    pub async fn set_first_video(&self, payload: Arc<Vec<u8>>) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.first_video.is_some() {
            return false;
        }

        inner.first_video = Some(payload);

        true
    }

    /// Copies out the cached initialization frames (play time)
    pub async fn get_init_frames(&self) -> StreamInitFrames {
        let inner = self.inner.lock().await;

        StreamInitFrames {
            metadata: inner.metadata.clone(),
            first_audio: inner.first_audio.clone(),
            first_video: inner.first_video.clone(),
        }
    }

    /// Enrolls a channel that receives every chunk from now on
    pub async fn add_active_egress(&self, sender: EgressSender) {
        let mut inner = self.inner.lock().await;

        inner.active_egress.push(sender);
    }

    /// Enrolls a subscriber channel that waits for the next keyframe
    pub async fn add_waiting_egress(&self, sender: EgressSender) {
        let mut inner = self.inner.lock().await;

        inner.waiting_egress.push(sender);
    }

    /// Returns true if any subscriber is waiting for a keyframe
    pub async fn has_waiting_egress(&self) -> bool {
        let inner = self.inner.lock().await;

        !inner.waiting_egress.is_empty()
    }

    /// Forwards a wire-level chunk to every active channel.
    ///
    /// The enqueue never blocks: a channel with a full queue is closed
    /// and dropped so one slow consumer cannot stall the publisher.
    ///
    /// Returns the ids of the channels dropped due to overflow.
    pub async fn broadcast_chunk(&self, blob: Arc<Vec<u8>>) -> Vec<u64> {
        let mut inner = self.inner.lock().await;

        let mut dropped: Vec<u64> = Vec::new();

        inner.active_egress.retain(|channel| {
            match channel.try_send(blob.clone()) {
                Ok(()) => true,
                Err(EgressSendError::Full) => {
                    channel.signal_exit();
                    dropped.push(channel.id);
                    false
                }
                Err(EgressSendError::Closed) => false,
            }
        });

        dropped
    }

    /// Promotes every waiting subscriber into the active set.
    ///
    /// The promoting keyframe, already re-chunked by the caller, is
    /// enqueued as the first data payload of each promoted channel.
    ///
    /// Returns the number of promoted channels.
    pub async fn promote_waiting_egress(&self, keyframe_chunks: Arc<Vec<u8>>) -> usize {
        let mut inner = self.inner.lock().await;

        let waiting = std::mem::take(&mut inner.waiting_egress);
        let mut promoted: usize = 0;

        for channel in waiting {
            match channel.try_send(keyframe_chunks.clone()) {
                Ok(()) => {
                    inner.active_egress.push(channel);
                    promoted += 1;
                }
                Err(_) => {
                    channel.signal_exit();
                }
            }
        }

        promoted
    }

    /// Signals exit on every channel and clears the sets (publisher teardown)
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;

        for channel in inner.active_egress.drain(..) {
            channel.signal_exit();
        }

        for channel in inner.waiting_egress.drain(..) {
            channel.signal_exit();
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::{egress_channel, EGRESS_CHANNEL_CAPACITY};

    #[tokio::test]
    async fn test_slow_subscriber_does_not_stall_others() {
        let publisher = PublisherSession::new("abc", "live", 1);

        let (slow_sender, _slow_receiver) = egress_channel(10);
        let (fast_sender, mut fast_receiver) = egress_channel(11);

        publisher.add_active_egress(slow_sender).await;
        publisher.add_active_egress(fast_sender).await;

        // The slow channel is never drained. After its queue reaches
        // capacity it must be dropped, while the fast one keeps receiving.
        let mut dropped: Vec<u64> = Vec::new();

        for i in 0..(EGRESS_CHANNEL_CAPACITY + 10) {
            let blob = Arc::new(vec![(i & 0xFF) as u8]);

            dropped.extend(publisher.broadcast_chunk(blob).await);

            // Drain the fast channel as we go
            assert!(fast_receiver.recv().await.is_some());
        }

        assert_eq!(dropped, vec![10]);
    }

    #[tokio::test]
    async fn test_waiting_promotion_receives_keyframe_first() {
        let publisher = PublisherSession::new("abc", "live", 1);

        let (waiting_sender, mut waiting_receiver) = egress_channel(20);

        publisher.add_waiting_egress(waiting_sender).await;

        // Chunks broadcast before the keyframe never reach the waiting channel
        publisher.broadcast_chunk(Arc::new(vec![0x01])).await;

        let keyframe = Arc::new(vec![0x17, 0x01]);
        let promoted = publisher.promote_waiting_egress(keyframe.clone()).await;

        assert_eq!(promoted, 1);
        assert!(!publisher.has_waiting_egress().await);

        publisher.broadcast_chunk(Arc::new(vec![0x02])).await;

        assert_eq!(*waiting_receiver.recv().await.unwrap(), *keyframe);
        assert_eq!(*waiting_receiver.recv().await.unwrap(), vec![0x02]);
    }

    #[tokio::test]
    async fn test_shutdown_signals_every_channel() {
        let publisher = PublisherSession::new("abc", "live", 1);

        let (active_sender, mut active_receiver) = egress_channel(1);
        let (waiting_sender, mut waiting_receiver) = egress_channel(2);

        publisher.add_active_egress(active_sender).await;
        publisher.add_waiting_egress(waiting_sender).await;

        publisher.shutdown().await;

        assert!(active_receiver.recv().await.is_none());
        assert!(waiting_receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_init_frames_first_write_wins() {
        let publisher = PublisherSession::new("abc", "live", 1);

        assert!(publisher.set_metadata(Arc::new(vec![1])).await);
        assert!(!publisher.set_metadata(Arc::new(vec![2])).await);

        let frames = publisher.get_init_frames().await;

        assert_eq!(*frames.metadata.unwrap(), vec![1]);
        assert!(frames.first_audio.is_none());
        assert!(frames.first_video.is_none());
    }
}
